//! Rolling checksum over a container's logical contents.
//!
//! The digest is order-dependent: the layout pass feeds every record and
//! artifact through one accumulator in a fixed sequence and the header
//! stores the final value. An independent verification must replay the
//! same sequence, not the on-disk byte order.

use crc32fast::Hasher;

/// Rolling CRC32 accumulator. One per written container; no reset.
#[derive(Clone, Default)]
pub struct ChecksumAccumulator {
    hasher: Hasher,
}

impl ChecksumAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold raw bytes into the digest.
    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Fold one u32 into the digest, little-endian.
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(&value.to_le_bytes());
    }

    /// Fold a u32 sequence into the digest, each element little-endian.
    pub fn update_u32s(&mut self, values: &[u32]) {
        for &value in values {
            self.update_u32(value);
        }
    }

    /// Fold a u16 sequence into the digest, each element little-endian.
    pub fn update_u16s(&mut self, values: &[u16]) {
        for &value in values {
            self.hasher.update(&value.to_le_bytes());
        }
    }

    /// Current digest value.
    pub fn value(&self) -> u32 {
        self.hasher.clone().finalize()
    }
}

impl std::fmt::Debug for ChecksumAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChecksumAccumulator")
            .field("value", &self.value())
            .finish()
    }
}
