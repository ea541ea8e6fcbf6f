//! Splitting a byte source into leaf-sized chunks.
//!
//! Two strategies are implemented:
//!
//! - `size-<n>`: fixed-size chunks of `n` bytes (the last may be shorter).
//! - `buzhash`: content-defined boundaries from a rolling buzhash over a
//!   32-byte window, so an insertion early in a file only disturbs nearby
//!   chunks. The explicit form is `buzhash-<min>-<max>-<mask bits>`.
//!
//! Boundaries depend only on the input bytes and the strategy, never on how
//! the source happens to split its reads.

use std::fmt;
use std::io;
use std::str::FromStr;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ChunkerError;

/// Default fixed chunk size: 256 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 262_144;
/// Largest chunk any strategy may produce: 1 MiB.
pub const MAX_CHUNK_SIZE: usize = 1 << 20;

pub const BUZHASH_MIN: usize = 128 * 1024;
pub const BUZHASH_MAX: usize = 512 * 1024;
pub const BUZHASH_MASK_BITS: u32 = 17;
const BUZHASH_WINDOW: usize = 32;

/// How a byte source is cut into chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChunkerStrategy {
    FixedSize(usize),
    Buzhash {
        min: usize,
        max: usize,
        mask_bits: u32,
    },
}

impl ChunkerStrategy {
    pub const BUZHASH: Self = Self::Buzhash {
        min: BUZHASH_MIN,
        max: BUZHASH_MAX,
        mask_bits: BUZHASH_MASK_BITS,
    };

    /// Upper bound on the length of any chunk.
    pub fn max_chunk_len(&self) -> usize {
        match *self {
            Self::FixedSize(size) => size,
            Self::Buzhash { max, .. } => max,
        }
    }

    /// Reject parameters no chunker can run with. Strategies built by
    /// parsing are always valid; hand-built ones may not be.
    pub fn check(&self) -> Result<(), ChunkerError> {
        self.validate(&self.to_string()).map(|_| ())
    }

    fn validate(self, input: &str) -> Result<Self, ChunkerError> {
        let invalid = |reason: String| ChunkerError::InvalidParameter {
            input: input.to_string(),
            reason,
        };
        match self {
            Self::FixedSize(0) => Err(invalid("chunk size must be positive".into())),
            Self::FixedSize(size) if size > MAX_CHUNK_SIZE => Err(invalid(format!(
                "chunk size {size} exceeds {MAX_CHUNK_SIZE}"
            ))),
            Self::Buzhash { min, .. } if min < BUZHASH_WINDOW => Err(invalid(format!(
                "minimum must be at least the {BUZHASH_WINDOW}-byte window"
            ))),
            Self::Buzhash { min, max, .. } if max <= min => {
                Err(invalid("maximum must exceed minimum".into()))
            }
            Self::Buzhash { max, .. } if max > MAX_CHUNK_SIZE => Err(invalid(format!(
                "maximum {max} exceeds {MAX_CHUNK_SIZE}"
            ))),
            Self::Buzhash { mask_bits, .. } if !(1..=31).contains(&mask_bits) => {
                Err(invalid("mask bits must be between 1 and 31".into()))
            }
            valid => Ok(valid),
        }
    }
}

impl Default for ChunkerStrategy {
    fn default() -> Self {
        Self::FixedSize(DEFAULT_CHUNK_SIZE)
    }
}

impl fmt::Display for ChunkerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::FixedSize(size) => write!(f, "size-{size}"),
            strategy if strategy == Self::BUZHASH => write!(f, "buzhash"),
            Self::Buzhash {
                min,
                max,
                mask_bits,
            } => write!(f, "buzhash-{min}-{max}-{mask_bits}"),
        }
    }
}

impl FromStr for ChunkerStrategy {
    type Err = ChunkerError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let strategy = match input {
            "" | "size" => Self::default(),
            "buzhash" => Self::BUZHASH,
            _ if input.starts_with("rabin") => {
                return Err(ChunkerError::NotSupported(input.to_string()))
            }
            _ => {
                if let Some(size) = input.strip_prefix("size-") {
                    Self::FixedSize(parse_number(input, size)?)
                } else if let Some(params) = input.strip_prefix("buzhash-") {
                    let parts: Vec<&str> = params.split('-').collect();
                    let [min, max, bits] = parts.as_slice() else {
                        return Err(ChunkerError::InvalidParameter {
                            input: input.to_string(),
                            reason: "expected buzhash-<min>-<max>-<mask bits>".into(),
                        });
                    };
                    Self::Buzhash {
                        min: parse_number(input, min)?,
                        max: parse_number(input, max)?,
                        mask_bits: parse_number(input, bits)?,
                    }
                } else {
                    return Err(ChunkerError::Unknown(input.to_string()));
                }
            }
        };
        strategy.validate(input)
    }
}

fn parse_number<T>(input: &str, text: &str) -> Result<T, ChunkerError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    text.parse().map_err(|e: T::Err| ChunkerError::InvalidParameter {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

impl TryFrom<String> for ChunkerStrategy {
    type Error = ChunkerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChunkerStrategy> for String {
    fn from(strategy: ChunkerStrategy) -> Self {
        strategy.to_string()
    }
}

const fn buzhash_table() -> [u32; 256] {
    // splitmix64, fixed seed: the table is part of the chunk boundary format.
    let mut table = [0u32; 256];
    let mut state: u64 = 0x6461_6766_735f_627a;
    let mut i = 0;
    while i < 256 {
        state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;
        table[i] = (z >> 32) as u32;
        i += 1;
    }
    table
}

static BUZHASH_TABLE: [u32; 256] = buzhash_table();

/// Length of the next content-defined chunk at the start of `buf`.
fn buzhash_cut(buf: &[u8], min: usize, max: usize, mask_bits: u32) -> usize {
    let end = buf.len().min(max);
    if end <= min {
        return end;
    }
    let mask = (1u32 << mask_bits) - 1;

    let mut state = 0u32;
    for &byte in &buf[min - BUZHASH_WINDOW..min] {
        state = state.rotate_left(1) ^ BUZHASH_TABLE[byte as usize];
    }
    for i in min..end {
        // The outgoing byte has been rotated by the full window width, which
        // is the identity on a u32, so a plain xor removes it.
        state = state.rotate_left(1)
            ^ BUZHASH_TABLE[buf[i - BUZHASH_WINDOW] as usize]
            ^ BUZHASH_TABLE[buf[i] as usize];
        if state & mask == 0 {
            return i + 1;
        }
    }
    end
}

/// Single-pass chunker over an async byte source.
///
/// A fresh `Chunker` over a fresh source always yields the same chunks.
pub struct Chunker<R> {
    reader: R,
    strategy: ChunkerStrategy,
    buf: BytesMut,
    eof: bool,
}

impl<R: AsyncRead + Unpin> Chunker<R> {
    pub fn new(reader: R, strategy: ChunkerStrategy) -> Self {
        Self {
            reader,
            strategy,
            buf: BytesMut::new(),
            eof: false,
        }
    }

    pub fn strategy(&self) -> ChunkerStrategy {
        self.strategy
    }

    /// Read until `target` bytes are buffered or the source is exhausted.
    async fn fill(&mut self, target: usize) -> io::Result<()> {
        while self.buf.len() < target && !self.eof {
            let start = self.buf.len();
            self.buf.resize(target, 0);
            match self.reader.read(&mut self.buf[start..]).await {
                Ok(n) => {
                    self.buf.truncate(start + n);
                    self.eof = n == 0;
                }
                Err(e) => {
                    self.buf.truncate(start);
                    if e.kind() != io::ErrorKind::Interrupted {
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }

    /// The next chunk, or `None` once the source is exhausted.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        self.fill(self.strategy.max_chunk_len()).await?;
        if self.buf.is_empty() {
            return Ok(None);
        }
        let cut = match self.strategy {
            ChunkerStrategy::FixedSize(size) => self.buf.len().min(size),
            ChunkerStrategy::Buzhash {
                min,
                max,
                mask_bits,
            } => buzhash_cut(&self.buf, min, max, mask_bits),
        };
        Ok(Some(self.buf.split_to(cut).freeze()))
    }

    /// The remaining chunks as a stream.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> {
        stream::try_unfold(self, |mut chunker| async move {
            let chunk = chunker.next_chunk().await?;
            Ok::<_, io::Error>(chunk.map(|chunk| (chunk, chunker)))
        })
    }
}
