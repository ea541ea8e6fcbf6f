use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cid::Cid;
use crate::error::PathError;

/// Root namespace of a [`Path`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Immutable UnixFS content rooted at a [`Cid`].
    Ipfs,
    /// Immutable linked data rooted at a [`Cid`].
    Ipld,
    /// Mutable name that must be looked up before traversal.
    Ipns,
}

impl Namespace {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Ipfs => "ipfs",
            Self::Ipld => "ipld",
            Self::Ipns => "ipns",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "ipfs" => Some(Self::Ipfs),
            "ipld" => Some(Self::Ipld),
            "ipns" => Some(Self::Ipns),
            _ => None,
        }
    }

    /// Returns `true` for namespaces whose root needs a name lookup.
    pub fn is_mutable(self) -> bool {
        matches!(self, Self::Ipns)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// The first segment after the namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathRoot {
    Cid(Cid),
    Name(String),
}

impl fmt::Display for PathRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cid(cid) => write!(f, "{cid}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A namespaced path: `/<namespace>/<root>/<segment>/...`.
///
/// Content namespaces (`/ipfs`, `/ipld`) are rooted at a [`Cid`], the mutable
/// namespace (`/ipns`) at a name key. Every segment is non-empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    namespace: Namespace,
    root: PathRoot,
    segments: Vec<String>,
}

impl Path {
    /// Parse a path string.
    ///
    /// Accepts `/ipfs/<cid>/...`, `/ipld/<cid>/...`, `/ipns/<name>/...`, and a
    /// bare `<cid>/...` which is read as `/ipfs/<cid>/...`. A single trailing
    /// `/` is ignored.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        let trimmed = raw.strip_suffix('/').unwrap_or(raw);

        let (namespace, rest) = match trimmed.strip_prefix('/') {
            Some(rest) => {
                let (prefix, rest) = rest.split_once('/').unwrap_or((rest, ""));
                let namespace =
                    Namespace::from_prefix(prefix).ok_or_else(|| PathError::UnknownNamespace {
                        path: raw.to_string(),
                    })?;
                (namespace, rest)
            }
            None => {
                // Bare identifiers are only accepted when they parse as a CID.
                let first = trimmed.split('/').next().unwrap_or_default();
                if first.parse::<Cid>().is_err() {
                    return Err(PathError::UnknownNamespace {
                        path: raw.to_string(),
                    });
                }
                (Namespace::Ipfs, trimmed)
            }
        };

        let mut parts = rest.split('/');
        let root = match parts.next() {
            Some(root) if !root.is_empty() => root,
            _ => {
                return Err(PathError::MissingRoot {
                    path: raw.to_string(),
                })
            }
        };

        let mut segments = Vec::new();
        for (position, segment) in parts.enumerate() {
            if segment.is_empty() {
                return Err(PathError::EmptySegment {
                    path: raw.to_string(),
                    position,
                });
            }
            segments.push(segment.to_string());
        }

        let root = if namespace.is_mutable() {
            PathRoot::Name(root.to_string())
        } else {
            PathRoot::Cid(root.parse().map_err(|source| PathError::InvalidCid {
                path: raw.to_string(),
                source,
            })?)
        };

        Ok(Self {
            namespace,
            root,
            segments,
        })
    }

    /// `/ipfs/<cid>` with no segments.
    pub fn ipfs(cid: Cid) -> Self {
        Self::from_cid(Namespace::Ipfs, cid)
    }

    /// `/ipld/<cid>` with no segments.
    pub fn ipld(cid: Cid) -> Self {
        Self::from_cid(Namespace::Ipld, cid)
    }

    /// `/ipns/<name>` with no segments.
    pub fn ipns(name: impl Into<String>) -> Result<Self, PathError> {
        let name = name.into();
        validate_segment(&name)?;
        Ok(Self {
            namespace: Namespace::Ipns,
            root: PathRoot::Name(name),
            segments: Vec::new(),
        })
    }

    /// A content path rooted at `cid`. `Ipns` is mapped to `Ipfs`: a CID is
    /// never a mutable root.
    pub fn from_cid(namespace: Namespace, cid: Cid) -> Self {
        let namespace = match namespace {
            Namespace::Ipns => Namespace::Ipfs,
            other => other,
        };
        Self {
            namespace,
            root: PathRoot::Cid(cid),
            segments: Vec::new(),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn root(&self) -> &PathRoot {
        &self.root
    }

    /// The root CID for content namespaces.
    pub fn root_cid(&self) -> Option<Cid> {
        match &self.root {
            PathRoot::Cid(cid) => Some(*cid),
            PathRoot::Name(_) => None,
        }
    }

    /// The name key for the mutable namespace.
    pub fn name(&self) -> Option<&str> {
        match &self.root {
            PathRoot::Name(name) => Some(name),
            PathRoot::Cid(_) => None,
        }
    }

    /// Segments after the root.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_mutable(&self) -> bool {
        self.namespace.is_mutable()
    }

    /// Append one segment.
    pub fn join(&self, segment: impl Into<String>) -> Result<Self, PathError> {
        let segment = segment.into();
        validate_segment(&segment)?;
        let mut joined = self.clone();
        joined.segments.push(segment);
        Ok(joined)
    }

    /// Append several segments.
    pub fn join_all<I, S>(&self, segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        segments
            .into_iter()
            .try_fold(self.clone(), |path, segment| path.join(segment))
    }

    /// The same path with its segments replaced.
    pub fn with_segments(&self, segments: Vec<String>) -> Result<Self, PathError> {
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self {
            segments,
            ..self.clone()
        })
    }

    /// The path without its last segment, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.segments.pop();
        Some(parent)
    }
}

fn validate_segment(segment: &str) -> Result<(), PathError> {
    if segment.is_empty() || segment.contains('/') {
        return Err(PathError::InvalidSegment {
            segment: segment.to_string(),
        });
    }
    Ok(())
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.namespace, self.root)?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Path {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}

/// A path pinned down to a terminal [`Cid`].
///
/// `requested` is the path the caller asked for. `content` is the equivalent
/// content-rooted path after any name lookups; `consumed` counts the segments
/// of `content` that were traversed, so the remainder is always
/// `content.segments()[consumed..]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedPath {
    requested: Path,
    content: Path,
    cid: Cid,
    consumed: usize,
}

impl ResolvedPath {
    /// Build a resolved path. `consumed` is clamped to the number of
    /// segments in `content`.
    pub fn new(requested: Path, content: Path, cid: Cid, consumed: usize) -> Self {
        let consumed = consumed.min(content.segments.len());
        Self {
            requested,
            content,
            cid,
            consumed,
        }
    }

    /// A trivially resolved path: `/<namespace>/<cid>` with zero segments.
    pub fn from_cid(namespace: Namespace, cid: Cid) -> Self {
        let path = Path::from_cid(namespace, cid);
        Self::new(path.clone(), path, cid, 0)
    }

    /// The path originally asked for.
    pub fn requested(&self) -> &Path {
        &self.requested
    }

    /// The content-rooted equivalent of [`requested`](Self::requested).
    pub fn content(&self) -> &Path {
        &self.content
    }

    /// The terminal identifier.
    pub fn cid(&self) -> Cid {
        self.cid
    }

    /// The content root the traversal started from.
    pub fn root(&self) -> Cid {
        self.content
            .root_cid()
            .unwrap_or(self.cid)
    }

    /// Number of segments traversed.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Segments not traversed.
    pub fn remainder(&self) -> &[String] {
        &self.content.segments[self.consumed..]
    }

    /// `/ipfs/<terminal cid>`.
    pub fn to_terminal_path(&self) -> Path {
        Path::from_cid(self.content.namespace, self.cid)
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cid::{Codec, HashAlgorithm, DIGEST_LEN};
    use proptest::prelude::*;

    fn cid(byte: u8) -> Cid {
        Cid::new(Codec::DagPb, HashAlgorithm::Sha2_256, [byte; DIGEST_LEN])
    }

    #[test]
    fn parses_ipfs_path_with_segments() {
        let raw = format!("/ipfs/{}/a/b", cid(1));
        let path = Path::parse(&raw).unwrap();
        assert_eq!(path.namespace(), Namespace::Ipfs);
        assert_eq!(path.root_cid(), Some(cid(1)));
        assert_eq!(path.segments(), ["a", "b"]);
        assert_eq!(path.to_string(), raw);
    }

    #[test]
    fn parses_ipns_name() {
        let path = Path::parse("/ipns/example.com/docs").unwrap();
        assert!(path.is_mutable());
        assert_eq!(path.name(), Some("example.com"));
        assert_eq!(path.segments(), ["docs"]);
    }

    #[test]
    fn bare_cid_is_ipfs() {
        let raw = format!("{}/x", cid(2));
        let path = Path::parse(&raw).unwrap();
        assert_eq!(path.namespace(), Namespace::Ipfs);
        assert_eq!(path.segments(), ["x"]);
    }

    #[test]
    fn trailing_slash_is_tolerated() {
        let raw = format!("/ipld/{}/a/", cid(3));
        let path = Path::parse(&raw).unwrap();
        assert_eq!(path.segments(), ["a"]);
    }

    #[test]
    fn empty_string_fails() {
        assert_eq!(Path::parse(""), Err(PathError::Empty));
    }

    #[test]
    fn unknown_namespace_fails() {
        assert!(matches!(
            Path::parse("/foo/bar"),
            Err(PathError::UnknownNamespace { .. })
        ));
        assert!(matches!(
            Path::parse("not-a-cid"),
            Err(PathError::UnknownNamespace { .. })
        ));
        assert!(matches!(
            Path::parse("/"),
            Err(PathError::UnknownNamespace { .. })
        ));
    }

    #[test]
    fn missing_root_fails() {
        assert!(matches!(
            Path::parse("/ipfs"),
            Err(PathError::MissingRoot { .. })
        ));
        assert!(matches!(
            Path::parse("/ipns/"),
            Err(PathError::MissingRoot { .. })
        ));
    }

    #[test]
    fn empty_segment_fails() {
        let raw = format!("/ipfs/{}/a//b", cid(4));
        assert_eq!(
            Path::parse(&raw),
            Err(PathError::EmptySegment {
                path: raw.clone(),
                position: 1
            })
        );
    }

    #[test]
    fn invalid_content_root_fails() {
        assert!(matches!(
            Path::parse("/ipfs/QmNotBase16"),
            Err(PathError::InvalidCid { .. })
        ));
    }

    #[test]
    fn join_rejects_slashes() {
        let path = Path::ipfs(cid(5));
        assert!(path.join("a/b").is_err());
        assert!(path.join("").is_err());
        assert_eq!(path.join("a").unwrap().segments(), ["a"]);
    }

    #[test]
    fn parent_pops_last_segment() {
        let path = Path::ipfs(cid(5)).join_all(["a", "b"]).unwrap();
        assert_eq!(path.parent().unwrap().segments(), ["a"]);
        assert!(Path::ipfs(cid(5)).parent().is_none());
    }

    #[test]
    fn resolved_path_remainder() {
        let content = Path::ipfs(cid(6)).join_all(["a", "b", "c"]).unwrap();
        let resolved = ResolvedPath::new(content.clone(), content, cid(7), 2);
        assert_eq!(resolved.remainder(), ["c"]);
        assert_eq!(resolved.root(), cid(6));
        assert_eq!(resolved.cid(), cid(7));
    }

    #[test]
    fn trivially_resolved_path_has_no_segments() {
        let resolved = ResolvedPath::from_cid(Namespace::Ipld, cid(8));
        assert_eq!(resolved.consumed(), 0);
        assert!(resolved.remainder().is_empty());
        assert_eq!(resolved.content().namespace(), Namespace::Ipld);
        assert_eq!(resolved.cid(), cid(8));
    }

    proptest! {
        #[test]
        fn display_parses_back(segments in proptest::collection::vec("[a-zA-Z0-9._-]{1,12}", 0..6)) {
            let path = Path::ipfs(cid(9)).join_all(segments.clone()).unwrap();
            let reparsed = Path::parse(&path.to_string()).unwrap();
            prop_assert_eq!(reparsed.segments(), segments.as_slice());
            prop_assert_eq!(reparsed, path);
        }
    }
}
