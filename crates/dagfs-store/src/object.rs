use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dagfs_crypto::ContentHasher;
use dagfs_types::{Cid, Codec, HashAlgorithm};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// A named edge from one node to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Entry name. Empty for file chunk links.
    pub name: String,
    /// Identifier of the target node.
    pub cid: Cid,
    /// Cumulative encoded size of the target's whole subtree.
    pub size: u64,
}

impl Link {
    pub fn new(name: impl Into<String>, cid: Cid, size: u64) -> Self {
        Self {
            name: name.into(),
            cid,
            size,
        }
    }

    /// An unnamed link, as used between file chunks.
    pub fn unnamed(cid: Cid, size: u64) -> Self {
        Self::new(String::new(), cid, size)
    }
}

// ---------------------------------------------------------------------------
// DagNode
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct NodeBodyRef<'a> {
    links: &'a [Link],
    data: &'a [u8],
}

#[derive(Deserialize)]
struct NodeBody {
    links: Vec<Link>,
    data: Vec<u8>,
}

/// The unit of storage: a codec-tagged payload plus named links.
///
/// `raw` nodes are plain bytes and never carry links. Linked nodes encode
/// deterministically, so equal nodes always hash to the same [`Cid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DagNode {
    codec: Codec,
    algorithm: HashAlgorithm,
    links: Vec<Link>,
    data: Vec<u8>,
}

impl DagNode {
    /// A raw block holding `data` verbatim.
    pub fn raw(data: Vec<u8>, algorithm: HashAlgorithm) -> Self {
        Self {
            codec: Codec::Raw,
            algorithm,
            links: Vec::new(),
            data,
        }
    }

    /// A linked node with an opaque payload.
    pub fn linked(
        codec: Codec,
        links: Vec<Link>,
        data: Vec<u8>,
        algorithm: HashAlgorithm,
    ) -> StoreResult<Self> {
        if codec == Codec::Raw && !links.is_empty() {
            return Err(StoreError::InvalidNode("raw blocks cannot carry links".into()));
        }
        Ok(Self {
            codec,
            algorithm,
            links,
            data,
        })
    }

    /// A `dag-pb` node carrying a UnixFS payload.
    pub fn unixfs(
        links: Vec<Link>,
        unixfs: &UnixfsData,
        algorithm: HashAlgorithm,
    ) -> StoreResult<Self> {
        let data =
            bincode::serialize(unixfs).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Self::linked(Codec::DagPb, links, data, algorithm)
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Look up a link by exact name.
    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|link| link.name == name)
    }

    /// The same node with its links replaced.
    pub fn with_links(&self, links: Vec<Link>) -> StoreResult<Self> {
        Self::linked(self.codec, links, self.data.clone(), self.algorithm)
    }

    /// Encode to block bytes.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        match self.codec {
            Codec::Raw => Ok(self.data.clone()),
            Codec::DagPb | Codec::DagCbor => bincode::serialize(&NodeBodyRef {
                links: &self.links,
                data: &self.data,
            })
            .map_err(|e| StoreError::Serialization(e.to_string())),
        }
    }

    /// Decode block bytes addressed by `cid`. Does not verify the digest.
    pub fn decode(cid: &Cid, bytes: &[u8]) -> StoreResult<Self> {
        match cid.codec() {
            Codec::Raw => Ok(Self::raw(bytes.to_vec(), cid.algorithm())),
            codec @ (Codec::DagPb | Codec::DagCbor) => {
                let body: NodeBody =
                    bincode::deserialize(bytes).map_err(|e| StoreError::CorruptNode {
                        cid: *cid,
                        reason: e.to_string(),
                    })?;
                Ok(Self {
                    codec,
                    algorithm: cid.algorithm(),
                    links: body.links,
                    data: body.data,
                })
            }
        }
    }

    /// Compute the content-addressed identifier of this node.
    pub fn compute_cid(&self) -> StoreResult<Cid> {
        let bytes = self.encode()?;
        Ok(ContentHasher::new(self.algorithm).cid(self.codec, &bytes))
    }

    /// Encoded length plus the cumulative sizes of every link: the number of
    /// bytes needed to hold the whole subtree.
    pub fn cumulative_size(&self) -> StoreResult<u64> {
        let own = self.encode()?.len() as u64;
        Ok(self.links.iter().fold(own, |acc, link| acc + link.size))
    }

    /// Decode the UnixFS payload. `raw` blocks have none.
    pub fn unixfs_data(&self) -> StoreResult<Option<UnixfsData>> {
        match self.codec {
            Codec::Raw => Ok(None),
            Codec::DagPb => bincode::deserialize(&self.data)
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("unixfs payload: {e}"))),
            Codec::DagCbor => Ok(None),
        }
    }

    /// File-system kind of this node.
    pub fn kind(&self) -> StoreResult<UnixfsKind> {
        Ok(match self.unixfs_data()? {
            Some(data) => data.kind,
            None => UnixfsKind::Raw,
        })
    }
}

// ---------------------------------------------------------------------------
// UnixFS payload
// ---------------------------------------------------------------------------

/// What a UnixFS node represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnixfsKind {
    /// Opaque bytes with no UnixFS payload (raw blocks, generic linked data).
    Raw,
    Directory,
    /// A file root, an internal file node, or a non-raw leaf.
    File,
    Symlink,
}

impl std::fmt::Display for UnixfsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Directory => write!(f, "directory"),
            Self::File => write!(f, "file"),
            Self::Symlink => write!(f, "symlink"),
        }
    }
}

/// Modification time with nanosecond precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mtime {
    pub secs: i64,
    pub nanos: u32,
}

impl Mtime {
    pub fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Self::new(after.as_secs() as i64, after.subsec_nanos()),
            // Before the epoch: floor the seconds, keep nanos non-negative.
            Err(before) => {
                let before = before.duration();
                match before.subsec_nanos() {
                    0 => Self::new(-(before.as_secs() as i64), 0),
                    nanos => Self::new(-(before.as_secs() as i64) - 1, 1_000_000_000 - nanos),
                }
            }
        }
    }

    pub fn to_system_time(self) -> SystemTime {
        let nanos = Duration::from_nanos(u64::from(self.nanos));
        if self.secs >= 0 {
            UNIX_EPOCH + Duration::from_secs(self.secs as u64) + nanos
        } else {
            UNIX_EPOCH - Duration::from_secs(self.secs.unsigned_abs()) + nanos
        }
    }
}

/// File-system payload of a `dag-pb` node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnixfsData {
    pub kind: UnixfsKind,
    /// Inline file bytes, or the symlink target.
    pub data: Vec<u8>,
    /// Total file bytes below this node (files only).
    pub filesize: u64,
    /// File bytes under each link, in link order (internal file nodes only).
    pub blocksizes: Vec<u64>,
    pub mode: Option<u32>,
    pub mtime: Option<Mtime>,
    /// Out-of-band metadata attached to a file root.
    pub metadata: Option<Vec<u8>>,
}

impl UnixfsData {
    fn empty(kind: UnixfsKind) -> Self {
        Self {
            kind,
            data: Vec::new(),
            filesize: 0,
            blocksizes: Vec::new(),
            mode: None,
            mtime: None,
            metadata: None,
        }
    }

    /// A file (or leaf) holding `data` inline.
    pub fn file(data: Vec<u8>) -> Self {
        let filesize = data.len() as u64;
        Self {
            data,
            filesize,
            ..Self::empty(UnixfsKind::File)
        }
    }

    /// An internal file node over children holding `blocksizes` bytes each.
    pub fn file_tree(blocksizes: Vec<u64>) -> Self {
        Self {
            filesize: blocksizes.iter().sum(),
            blocksizes,
            ..Self::empty(UnixfsKind::File)
        }
    }

    pub fn directory() -> Self {
        Self::empty(UnixfsKind::Directory)
    }

    pub fn symlink(target: impl Into<String>) -> Self {
        Self {
            data: target.into().into_bytes(),
            ..Self::empty(UnixfsKind::Symlink)
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

    /// Byte size as reported to listings: file bytes, symlink target length,
    /// zero for directories.
    pub fn size(&self) -> u64 {
        match self.kind {
            UnixfsKind::File => self.filesize,
            UnixfsKind::Symlink | UnixfsKind::Raw => self.data.len() as u64,
            UnixfsKind::Directory => 0,
        }
    }

    /// The symlink target, if this is a symlink.
    pub fn symlink_target(&self) -> Option<String> {
        match self.kind {
            UnixfsKind::Symlink => Some(String::from_utf8_lossy(&self.data).into_owned()),
            _ => None,
        }
    }
}
