use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Length of every digest carried by a [`Cid`].
pub const DIGEST_LEN: usize = 32;

const CID_VERSION: u8 = 0x01;
const MULTIBASE_BASE16: char = 'f';
const ENCODED_LEN: usize = 4 + DIGEST_LEN;

/// How the bytes addressed by a [`Cid`] are to be interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Codec {
    /// Opaque bytes (file chunks).
    Raw,
    /// Linked node with named links and a UnixFS payload.
    DagPb,
    /// Generic linked data.
    DagCbor,
}

impl Codec {
    /// Multicodec table code.
    pub const fn code(self) -> u8 {
        match self {
            Self::Raw => 0x55,
            Self::DagPb => 0x70,
            Self::DagCbor => 0x71,
        }
    }

    /// Look up a codec by its multicodec code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x55 => Some(Self::Raw),
            0x70 => Some(Self::DagPb),
            0x71 => Some(Self::DagCbor),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::DagPb => "dag-pb",
            Self::DagCbor => "dag-cbor",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Self::Raw),
            "dag-pb" => Ok(Self::DagPb),
            "dag-cbor" => Ok(Self::DagCbor),
            other => Err(TypeError::UnknownCodec(other.to_string())),
        }
    }
}

/// Hash function used to produce a [`Cid`] digest.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "sha2-256")]
    Sha2_256,
    Blake3,
}

impl HashAlgorithm {
    /// Multihash table code.
    pub const fn code(self) -> u8 {
        match self {
            Self::Sha2_256 => 0x12,
            Self::Blake3 => 0x1e,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x12 => Some(Self::Sha2_256),
            0x1e => Some(Self::Blake3),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha2_256 => "sha2-256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha2-256" => Ok(Self::Sha2_256),
            "blake3" => Ok(Self::Blake3),
            other => Err(TypeError::UnknownHashAlgorithm(other.to_string())),
        }
    }
}

/// Self-describing content identifier.
///
/// A `Cid` names an immutable block by the digest of its encoded bytes,
/// together with the hash function that produced the digest and the codec
/// needed to interpret the bytes. Identical content always produces the same
/// `Cid`, so blocks are deduplicatable and verifiable.
///
/// The text form is a base16 CIDv1 string (`f01...`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cid {
    codec: Codec,
    algorithm: HashAlgorithm,
    digest: [u8; DIGEST_LEN],
}

impl Cid {
    /// Create a `Cid` from a pre-computed digest.
    pub const fn new(codec: Codec, algorithm: HashAlgorithm, digest: [u8; DIGEST_LEN]) -> Self {
        Self {
            codec,
            algorithm,
            digest,
        }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The raw digest bytes.
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// The same digest reinterpreted under another codec.
    pub fn with_codec(&self, codec: Codec) -> Self {
        Self { codec, ..*self }
    }

    /// Binary CIDv1 encoding: version, codec, multihash code, digest length, digest.
    pub fn to_bytes(&self) -> [u8; ENCODED_LEN] {
        let mut out = [0u8; ENCODED_LEN];
        out[0] = CID_VERSION;
        out[1] = self.codec.code();
        out[2] = self.algorithm.code();
        out[3] = DIGEST_LEN as u8;
        out[4..].copy_from_slice(&self.digest);
        out
    }

    /// Decode the binary CIDv1 encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != ENCODED_LEN {
            return Err(TypeError::InvalidLength {
                expected: ENCODED_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0] != CID_VERSION {
            return Err(TypeError::UnsupportedVersion(bytes[0]));
        }
        let codec = Codec::from_code(bytes[1])
            .ok_or_else(|| TypeError::UnknownCodec(format!("0x{:02x}", bytes[1])))?;
        let algorithm = HashAlgorithm::from_code(bytes[2])
            .ok_or_else(|| TypeError::UnknownHashAlgorithm(format!("0x{:02x}", bytes[2])))?;
        if bytes[3] as usize != DIGEST_LEN {
            return Err(TypeError::DigestLength {
                expected: DIGEST_LEN,
                actual: bytes[3] as usize,
            });
        }
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&bytes[4..]);
        Ok(Self::new(codec, algorithm, digest))
    }

    /// Short hex representation of the digest (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.digest[..4])
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({}:{})", self.codec, self.short_hex())
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{MULTIBASE_BASE16}{}", hex::encode(self.to_bytes()))
    }
}

impl FromStr for Cid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match chars.next() {
            Some(MULTIBASE_BASE16) => {}
            Some(other) => return Err(TypeError::UnsupportedMultibase(other)),
            None => {
                return Err(TypeError::InvalidLength {
                    expected: ENCODED_LEN * 2 + 1,
                    actual: 0,
                })
            }
        }
        let bytes = hex::decode(chars.as_str()).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl TryFrom<String> for Cid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cid> for String {
    fn from(cid: Cid) -> Self {
        cid.to_string()
    }
}
