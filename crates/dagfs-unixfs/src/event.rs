//! Progress reporting for imports.

use dagfs_store::Mtime;
use dagfs_types::ResolvedPath;
use serde::Serialize;

/// Emitted once for every sub-path whose node has been written.
///
/// Children always complete before their parent directory, so the event for
/// the import root is the last one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AddEvent {
    /// Path of the entry relative to the import root. The root itself is
    /// named after its identifier unless it was given a name.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<ResolvedPath>,
    /// File bytes below this entry.
    pub bytes: u64,
    /// Cumulative encoded size of the entry's subtree.
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<Mtime>,
}

/// Receives [`AddEvent`]s synchronously on the importing task.
pub trait ProgressSink {
    fn event(&mut self, event: AddEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(AddEvent),
{
    fn event(&mut self, event: AddEvent) {
        self(event)
    }
}
