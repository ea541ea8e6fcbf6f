use dagfs_types::{Cid, Codec, HashAlgorithm, DIGEST_LEN};
use sha2::{Digest, Sha256};

/// Content hasher bound to one hash algorithm.
///
/// Unlike domain-separated hashing, the digest covers exactly the encoded
/// block bytes: the codec travels in the [`Cid`] instead, so the same bytes
/// under two codecs share a digest but not an identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
}

impl ContentHasher {
    pub const SHA2_256: Self = Self {
        algorithm: HashAlgorithm::Sha2_256,
    };
    pub const BLAKE3: Self = Self {
        algorithm: HashAlgorithm::Blake3,
    };

    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Raw digest of `data`.
    pub fn digest(&self, data: &[u8]) -> [u8; DIGEST_LEN] {
        match self.algorithm {
            HashAlgorithm::Sha2_256 => {
                let mut out = [0u8; DIGEST_LEN];
                out.copy_from_slice(&Sha256::digest(data));
                out
            }
            HashAlgorithm::Blake3 => *blake3::hash(data).as_bytes(),
        }
    }

    /// Identifier for `data` interpreted under `codec`.
    pub fn cid(&self, codec: Codec, data: &[u8]) -> Cid {
        Cid::new(codec, self.algorithm, self.digest(data))
    }

    /// Verify that `data` hashes to `expected`, using the algorithm recorded
    /// in `expected`.
    pub fn verify(data: &[u8], expected: &Cid) -> bool {
        Self::new(expected.algorithm()).digest(data) == *expected.digest()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let a = ContentHasher::SHA2_256.cid(Codec::Raw, b"hello world");
        let b = ContentHasher::SHA2_256.cid(Codec::Raw, b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn sha256_matches_known_vector() {
        let digest = ContentHasher::SHA2_256.digest(b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn algorithms_disagree() {
        let sha = ContentHasher::SHA2_256.cid(Codec::Raw, b"data");
        let blake = ContentHasher::BLAKE3.cid(Codec::Raw, b"data");
        assert_ne!(sha, blake);
        assert_eq!(blake.algorithm(), HashAlgorithm::Blake3);
    }

    #[test]
    fn codec_is_part_of_identity() {
        let raw = ContentHasher::default().cid(Codec::Raw, b"same");
        let pb = ContentHasher::default().cid(Codec::DagPb, b"same");
        assert_ne!(raw, pb);
        assert_eq!(raw.digest(), pb.digest());
    }

    #[test]
    fn verify_uses_recorded_algorithm() {
        let cid = ContentHasher::BLAKE3.cid(Codec::Raw, b"payload");
        assert!(ContentHasher::verify(b"payload", &cid));
        assert!(!ContentHasher::verify(b"tampered", &cid));
    }
}
