use thiserror::Error;

use crate::bin::{self, exact_log2};

pub const MAX_ADDRESS_SIZE: u32 = u64::BITS;
/// Upper bound on `num_lines`; the line array is allocated up front.
pub const MAX_NUM_LINES: u32 = 1 << 24;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("address size must be within 1..=64 bits, got {0}")]
    AddressSize(u32),
    #[error("word size must be a positive multiple of 8 bits, got {0}")]
    WordSize(u32),
    #[error("{what} must be a positive power of two, got {value}")]
    NotPowerOfTwo { what: &'static str, value: u32 },
    #[error("at most 16777216 lines are supported, got {0}")]
    TooManyLines(u32),
    #[error("{address_size}-bit address cannot hold {offset_bits} offset bits and {index_bits} index bits")]
    AddressTooSmall {
        address_size: u32,
        offset_bits: u32,
        index_bits: u32,
    },
}

fn log2_of(what: &'static str, value: u32) -> Result<u32, ConfigError> {
    exact_log2(value).ok_or(ConfigError::NotPowerOfTwo { what, value })
}

/// Field widths of a direct-mapped cache.
///
/// The address is partitioned, from the least significant bit, into
/// `offset_bits | index_bits | tag_bits`, and the three always sum to
/// `address_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeometry {
    address_size: u32,
    word_size: u32,
    block_size: u32,
    num_lines: u32,
    offset_bits: u32,
    index_bits: u32,
    tag_bits: u32,
}

impl CacheGeometry {
    /// `word_size` is in bits, `block_size` in words per line.
    pub fn new(
        address_size: u32,
        word_size: u32,
        block_size: u32,
        num_lines: u32,
    ) -> Result<Self, ConfigError> {
        if address_size == 0 || address_size > MAX_ADDRESS_SIZE {
            return Err(ConfigError::AddressSize(address_size));
        }
        if word_size == 0 || word_size % 8 != 0 {
            return Err(ConfigError::WordSize(word_size));
        }
        let offset_bits =
            log2_of("bytes per word", word_size / 8)? + log2_of("block size", block_size)?;
        let index_bits = log2_of("number of lines", num_lines)?;
        if num_lines > MAX_NUM_LINES {
            return Err(ConfigError::TooManyLines(num_lines));
        }
        // residual; must come after offset and index
        let tag_bits = address_size
            .checked_sub(offset_bits + index_bits)
            .ok_or(ConfigError::AddressTooSmall {
                address_size,
                offset_bits,
                index_bits,
            })?;
        Ok(Self {
            address_size,
            word_size,
            block_size,
            num_lines,
            offset_bits,
            index_bits,
            tag_bits,
        })
    }
    pub fn address_size(&self) -> u32 {
        self.address_size
    }
    pub fn word_size(&self) -> u32 {
        self.word_size
    }
    pub fn word_bytes(&self) -> u32 {
        self.word_size / 8
    }
    pub fn block_size(&self) -> u32 {
        self.block_size
    }
    pub fn num_lines(&self) -> u32 {
        self.num_lines
    }
    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }
    pub fn index_bits(&self) -> u32 {
        self.index_bits
    }
    pub fn tag_bits(&self) -> u32 {
        self.tag_bits
    }
    /// width of a block address (the address with its offset dropped)
    pub fn block_address_bits(&self) -> u32 {
        self.address_size - self.offset_bits
    }
    /// whether `address` fits in `address_size` bits
    pub fn contains(&self, address: u64) -> bool {
        bin::mask_lower(address, self.address_size) == address
    }
    /// splits an in-range address into its fields.
    /// bits above `address_size` are ignored.
    pub fn decompose(&self, address: u64) -> AddressFields {
        let address = bin::mask_lower(address, self.address_size);
        AddressFields {
            address,
            block_address: bin::shr(address, self.offset_bits),
            offset: bin::mask_lower(address, self.offset_bits),
            index: bin::extract(address, self.offset_bits, self.index_bits),
            tag: bin::extract(address, self.offset_bits + self.index_bits, self.tag_bits),
        }
    }
    /// inverse of [`Self::decompose`]
    pub fn compose(&self, tag: u64, index: u64, offset: u64) -> u64 {
        bin::shl(tag, self.offset_bits + self.index_bits)
            | bin::shl(index, self.offset_bits)
            | offset
    }
    pub fn report(&self) -> GeometryReport {
        let bytes_of_memory = 1u128 << self.address_size;
        let num_lines = self.num_lines as u128;
        let line_data_bits = self.block_size as u128 * self.word_size as u128;
        GeometryReport {
            words_in_memory: bytes_of_memory / self.word_bytes() as u128,
            bits_per_word: self.word_size,
            bytes_of_memory,
            num_lines: self.num_lines,
            tag_bits: self.tag_bits,
            block_size: self.block_size,
            total_cache_bits: (1 + self.tag_bits as u128) * num_lines + num_lines * line_data_bits,
        }
    }
}

/// An address split into its cache fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressFields {
    pub address: u64,
    pub block_address: u64,
    pub offset: u64,
    pub index: u64,
    pub tag: u64,
}

/// Sizes derived from a [`CacheGeometry`], for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryReport {
    pub words_in_memory: u128,
    pub bits_per_word: u32,
    pub bytes_of_memory: u128,
    pub num_lines: u32,
    pub tag_bits: u32,
    pub block_size: u32,
    /// valid bit and tag per line plus the data of every line
    pub total_cache_bits: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_fields() {
        let g = CacheGeometry::new(32, 32, 4, 8).unwrap();
        assert_eq!(4, g.offset_bits());
        assert_eq!(3, g.index_bits());
        assert_eq!(25, g.tag_bits());
        assert_eq!(28, g.block_address_bits());
    }
    #[test]
    fn test_fields_cover_address() {
        for address_size in [12, 16, 32, 48, 64] {
            for word_size in [8, 16, 32, 64] {
                for block_size in [1, 2, 4, 16] {
                    for num_lines in [1, 2, 8, 256] {
                        let Ok(g) =
                            CacheGeometry::new(address_size, word_size, block_size, num_lines)
                        else {
                            continue;
                        };
                        assert_eq!(
                            address_size,
                            g.offset_bits() + g.index_bits() + g.tag_bits()
                        );
                    }
                }
            }
        }
    }
    #[test]
    fn test_rejects_bad_config() {
        assert_eq!(
            Err(ConfigError::NotPowerOfTwo {
                what: "number of lines",
                value: 6
            }),
            CacheGeometry::new(32, 32, 4, 6)
        );
        assert_eq!(
            Err(ConfigError::NotPowerOfTwo {
                what: "block size",
                value: 0
            }),
            CacheGeometry::new(32, 32, 0, 8)
        );
        assert_eq!(
            Err(ConfigError::NotPowerOfTwo {
                what: "bytes per word",
                value: 3
            }),
            CacheGeometry::new(32, 24, 4, 8)
        );
        assert_eq!(Err(ConfigError::WordSize(12)), CacheGeometry::new(32, 12, 4, 8));
        assert_eq!(Err(ConfigError::AddressSize(0)), CacheGeometry::new(0, 32, 4, 8));
        assert_eq!(Err(ConfigError::AddressSize(65)), CacheGeometry::new(65, 32, 4, 8));
        assert_eq!(
            Err(ConfigError::AddressTooSmall {
                address_size: 6,
                offset_bits: 4,
                index_bits: 3
            }),
            CacheGeometry::new(6, 32, 4, 8)
        );
    }
    #[test]
    fn test_line_limit() {
        assert!(CacheGeometry::new(32, 32, 1, MAX_NUM_LINES).is_ok());
        assert_eq!(
            Err(ConfigError::TooManyLines(1 << 25)),
            CacheGeometry::new(32, 32, 1, 1 << 25)
        );
        assert_eq!(
            Err(ConfigError::TooManyLines(1 << 31)),
            CacheGeometry::new(64, 64, 1, 1 << 31)
        );
    }
    #[test]
    fn test_zero_tag_bits_allowed() {
        let g = CacheGeometry::new(7, 32, 4, 8).unwrap();
        assert_eq!(0, g.tag_bits());
    }
    #[test]
    fn test_decompose() {
        let g = CacheGeometry::new(32, 32, 4, 8).unwrap();
        let f = g.decompose(0x0000_0010);
        assert_eq!((0, 1, 0, 1), (f.tag, f.index, f.offset, f.block_address));
        let f = g.decompose(0x0000_0090);
        assert_eq!((1, 1, 0, 9), (f.tag, f.index, f.offset, f.block_address));
        let f = g.decompose(0xFFFF_FFFF);
        assert_eq!((0x1FF_FFFF, 7, 0xF), (f.tag, f.index, f.offset));
    }
    #[test]
    fn test_decompose_reconstructs() {
        let geometries = [
            CacheGeometry::new(32, 32, 4, 8).unwrap(),
            CacheGeometry::new(16, 8, 1, 1).unwrap(),
            CacheGeometry::new(64, 64, 8, 1024).unwrap(),
            CacheGeometry::new(7, 32, 4, 8).unwrap(),
        ];
        for g in geometries {
            let mut address = 0x9E37_79B9_7F4A_7C15u64;
            for _ in 0..64 {
                address = address.rotate_left(7) ^ 0x2545_F491_4F6C_DD1D;
                let f = g.decompose(address);
                assert!(g.contains(f.address));
                assert_eq!(f.address, g.compose(f.tag, f.index, f.offset));
            }
        }
    }
    #[test]
    fn test_contains() {
        let g = CacheGeometry::new(16, 32, 4, 8).unwrap();
        assert!(g.contains(0xFFFF));
        assert!(!g.contains(0x1_0000));
        let g = CacheGeometry::new(64, 32, 4, 8).unwrap();
        assert!(g.contains(u64::MAX));
    }
    #[test]
    fn test_report() {
        let r = CacheGeometry::new(32, 32, 4, 8).unwrap().report();
        assert_eq!(1232, r.total_cache_bits);
        assert_eq!(1u128 << 32, r.bytes_of_memory);
        assert_eq!(1u128 << 30, r.words_in_memory);
        assert_eq!(32, r.bits_per_word);
        assert_eq!(25, r.tag_bits);
    }
    #[test]
    fn test_report_full_address_space() {
        let r = CacheGeometry::new(64, 64, 1, 1).unwrap().report();
        assert_eq!(1u128 << 64, r.bytes_of_memory);
        assert_eq!(1u128 << 61, r.words_in_memory);
        assert_eq!(61, r.tag_bits);
    }
}
