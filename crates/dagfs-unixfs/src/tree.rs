//! The input side of an import: an in-memory description of a file tree.
//!
//! File contents are never loaded up front. A [`FileSource`] is opened only
//! when the builder reaches it, so a tree read from disk holds paths, not
//! bytes.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use dagfs_store::Mtime;
use tokio::io::AsyncRead;
use walkdir::WalkDir;

/// An owned async byte source.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

enum Origin {
    Bytes(Bytes),
    Reader(BoxedReader),
    Path(PathBuf),
}

/// The contents of one file plus the attributes recorded for it.
pub struct FileSource {
    origin: Origin,
    mode: Option<u32>,
    mtime: Option<Mtime>,
}

impl FileSource {
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Self::from_origin(Origin::Bytes(data.into()))
    }

    pub fn reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::from_origin(Origin::Reader(Box::new(reader)))
    }

    /// A local file, opened when the import reaches it.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::from_origin(Origin::Path(path.into()))
    }

    fn from_origin(origin: Origin) -> Self {
        Self {
            origin,
            mode: None,
            mtime: None,
        }
    }

    pub fn with_mode(mut self, mode: Option<u32>) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_mtime(mut self, mtime: Option<Mtime>) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn mode(&self) -> Option<u32> {
        self.mode
    }

    pub fn mtime(&self) -> Option<Mtime> {
        self.mtime
    }

    pub async fn open(self) -> io::Result<BoxedReader> {
        match self.origin {
            Origin::Bytes(data) => Ok(Box::new(io::Cursor::new(data))),
            Origin::Reader(reader) => Ok(reader),
            Origin::Path(path) => Ok(Box::new(tokio::fs::File::open(path).await?)),
        }
    }
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match &self.origin {
            Origin::Bytes(data) => format!("bytes({})", data.len()),
            Origin::Reader(_) => "reader".to_string(),
            Origin::Path(path) => format!("path({})", path.display()),
        };
        f.debug_struct("FileSource")
            .field("origin", &origin)
            .field("mode", &self.mode)
            .field("mtime", &self.mtime)
            .finish()
    }
}

/// A directory's entries, kept sorted by name.
#[derive(Debug, Default)]
pub struct DirectorySource {
    entries: BTreeMap<String, FileTree>,
    mode: Option<u32>,
    mtime: Option<Mtime>,
}

impl DirectorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry. Returns the entry previously under `name`.
    pub fn insert(&mut self, name: impl Into<String>, tree: FileTree) -> Option<FileTree> {
        self.entries.insert(name.into(), tree)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FileTree> {
        self.entries.get(name)
    }

    pub fn with_mode(mut self, mode: Option<u32>) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_mtime(mut self, mtime: Option<Mtime>) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn mode(&self) -> Option<u32> {
        self.mode
    }

    pub fn mtime(&self) -> Option<Mtime> {
        self.mtime
    }

    /// Entries in name order.
    pub fn into_entries(self) -> impl Iterator<Item = (String, FileTree)> {
        self.entries.into_iter()
    }
}

/// A file, directory or symlink to be imported.
#[derive(Debug)]
pub enum FileTree {
    File(FileSource),
    Directory(DirectorySource),
    /// A symlink, stored verbatim with this target.
    Symlink(String),
}

impl FileTree {
    /// A file holding `data`.
    pub fn file(data: impl Into<Bytes>) -> Self {
        Self::File(FileSource::bytes(data))
    }

    /// A file read from `reader`.
    pub fn reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::File(FileSource::reader(reader))
    }

    pub fn directory<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, FileTree)>,
        S: Into<String>,
    {
        let mut dir = DirectorySource::new();
        for (name, tree) in entries {
            dir.insert(name, tree);
        }
        Self::Directory(dir)
    }

    pub fn symlink(target: impl Into<String>) -> Self {
        Self::Symlink(target.into())
    }

    /// Describe the local tree at `path`.
    ///
    /// Symlinks are recorded as symlinks unless `follow_symlinks` is set, in
    /// which case their targets are imported in their place; a link cycle is
    /// then reported as an error. Mode bits (on Unix) and modification times
    /// are always recorded; the import options decide whether they are kept.
    pub fn from_path(path: &Path, follow_symlinks: bool) -> io::Result<Self> {
        if !follow_symlinks && std::fs::symlink_metadata(path)?.file_type().is_symlink() {
            return read_symlink(path);
        }

        let walker = WalkDir::new(path)
            .follow_links(follow_symlinks)
            .sort_by_file_name();

        // Directories still being filled, innermost last.
        let mut open: Vec<(String, DirectorySource)> = Vec::new();
        let mut root = None;

        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            while open.len() > entry.depth() {
                if let Some((name, dir)) = open.pop() {
                    attach(&mut open, &mut root, name, FileTree::Directory(dir));
                }
            }

            let name = entry_name(entry.file_name(), entry.path())?;
            let file_type = entry.file_type();
            if file_type.is_symlink() {
                attach(&mut open, &mut root, name, read_symlink(entry.path())?);
                continue;
            }

            let meta = entry.metadata().map_err(io::Error::from)?;
            let (mode, mtime) = attributes(&meta);
            if file_type.is_dir() {
                open.push((name, DirectorySource::new().with_mode(mode).with_mtime(mtime)));
            } else {
                let file = FileSource::path(entry.path())
                    .with_mode(mode)
                    .with_mtime(mtime);
                attach(&mut open, &mut root, name, FileTree::File(file));
            }
        }

        while let Some((name, dir)) = open.pop() {
            attach(&mut open, &mut root, name, FileTree::Directory(dir));
        }
        root.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "nothing to import"))
    }
}

fn attach(
    open: &mut [(String, DirectorySource)],
    root: &mut Option<FileTree>,
    name: String,
    tree: FileTree,
) {
    match open.last_mut() {
        Some((_, parent)) => {
            parent.insert(name, tree);
        }
        None => *root = Some(tree),
    }
}

fn entry_name(name: &std::ffi::OsStr, path: &Path) -> io::Result<String> {
    name.to_str().map(str::to_string).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("non-UTF-8 file name: {}", path.display()),
        )
    })
}

fn read_symlink(path: &Path) -> io::Result<FileTree> {
    let target = std::fs::read_link(path)?;
    let target = target.to_str().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("non-UTF-8 symlink target: {}", path.display()),
        )
    })?;
    Ok(FileTree::Symlink(target.to_string()))
}

#[cfg(unix)]
fn attributes(meta: &Metadata) -> (Option<u32>, Option<Mtime>) {
    use std::os::unix::fs::PermissionsExt;
    let mode = meta.permissions().mode() & 0o7777;
    (Some(mode), meta.modified().ok().map(Mtime::from_system_time))
}

#[cfg(not(unix))]
fn attributes(meta: &Metadata) -> (Option<u32>, Option<Mtime>) {
    (None, meta.modified().ok().map(Mtime::from_system_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn directory_entries_are_sorted() {
        let tree = FileTree::directory([
            ("zeta", FileTree::file("z")),
            ("alpha", FileTree::file("a")),
            ("mid", FileTree::symlink("alpha")),
        ]);
        let FileTree::Directory(dir) = tree else {
            panic!("expected a directory");
        };
        let names: Vec<String> = dir.into_entries().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn byte_source_opens() {
        let mut reader = FileSource::bytes("hello").open().await.unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn from_path_reads_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/inner.txt"), b"inner").unwrap();
        std::fs::write(dir.path().join("top.txt"), b"top").unwrap();

        let FileTree::Directory(root) = FileTree::from_path(dir.path(), false).unwrap() else {
            panic!("expected a directory");
        };
        assert_eq!(root.len(), 2);
        assert!(matches!(root.get("top.txt"), Some(FileTree::File(_))));
        let Some(FileTree::Directory(sub)) = root.get("sub") else {
            panic!("expected sub directory");
        };
        assert!(matches!(sub.get("inner.txt"), Some(FileTree::File(_))));
    }

    #[test]
    fn from_path_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("only.bin");
        std::fs::write(&file, b"data").unwrap();
        let tree = FileTree::from_path(&file, false).unwrap();
        let FileTree::File(source) = tree else {
            panic!("expected a file");
        };
        assert!(source.mtime().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_preserved_or_followed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("target.txt"), b"t").unwrap();
        std::os::unix::fs::symlink("target.txt", dir.path().join("link")).unwrap();

        let FileTree::Directory(kept) = FileTree::from_path(dir.path(), false).unwrap() else {
            panic!("expected a directory");
        };
        assert!(matches!(kept.get("link"), Some(FileTree::Symlink(t)) if t == "target.txt"));

        let FileTree::Directory(followed) = FileTree::from_path(dir.path(), true).unwrap() else {
            panic!("expected a directory");
        };
        assert!(matches!(followed.get("link"), Some(FileTree::File(_))));
    }
}
