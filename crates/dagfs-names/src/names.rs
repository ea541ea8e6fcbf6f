//! Name validation.
//!
//! Valid names:
//! - Must be non-empty and at most [`MAX_NAME_LEN`] bytes
//! - Must not contain `/`, whitespace, or control characters
//! - Must not be `.` or `..`

use crate::error::{NameError, NameResult};

/// Longest accepted name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

fn invalid(name: &str, reason: impl Into<String>) -> NameError {
    NameError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a name, returning `Ok(())` if it may be published or looked up.
///
/// # Examples
///
/// ```
/// use dagfs_names::validate_name;
///
/// assert!(validate_name("docs.example.com").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("a/b").is_err());
/// ```
pub fn validate_name(name: &str) -> NameResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid(
            name,
            format!("longer than {MAX_NAME_LEN} bytes"),
        ));
    }
    if name == "." || name == ".." {
        return Err(invalid(name, "must not be a relative path component"));
    }
    if let Some(ch) = name
        .chars()
        .find(|ch| *ch == '/' || ch.is_whitespace() || ch.is_control())
    {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}
