//! Address Space Abstraction
//!
//! Traits for reading from a memory image's named layers, and the
//! best-effort region read used when dumping.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("invalid address {addr:#x}")]
    InvalidAddress { addr: u64 },

    #[error("unknown memory layer: {0}")]
    UnknownLayer(String),

    #[error("short read at {addr:#x}: expected {expected} bytes")]
    ShortRead { addr: u64, expected: usize },

    #[error("region size {0:#x} exceeds addressable memory")]
    RegionTooLarge(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for reading memory from an image layer (one process's view,
/// a kernel view, or the raw physical image).
pub trait AddressSpace {
    /// Read `size` bytes starting at virtual address `start`.
    ///
    /// With `pad`, inaccessible bytes are substituted with `0x00` and
    /// the read only fails for infrastructure reasons (truncated
    /// image, I/O fault). Without `pad` the read is strict and fails
    /// with [`ReadError::InvalidAddress`] at the first inaccessible
    /// byte.
    fn read(&self, start: u64, size: usize, pad: bool) -> Result<Vec<u8>, ReadError>;
}

/// Trait for resolving a layer name to its address space
pub trait AddressSpaceResolver {
    fn layer(&self, name: &str) -> Result<&dyn AddressSpace, ReadError>;
}

/// The materialized contents of one region
///
/// `data` is always exactly the requested size. When any byte of the
/// range was inaccessible, `first_invalid` holds the lowest such
/// address and the inaccessible bytes in `data` are zero-filled.
pub struct RegionBytes {
    pub data: Vec<u8>,
    pub first_invalid: Option<u64>,
}

/// Best-effort read of one region's contents.
///
/// Tries a strict read first; if that trips on an unmapped address,
/// falls back to a padded read so the caller still gets `size` bytes
/// plus the address that failed. Infrastructure failures (unknown
/// layer, I/O) propagate as errors.
///
/// The fallback re-reads the full range; a caller that only needs the
/// valid/invalid classification can use the strict mode of
/// [`AddressSpace::read`] directly.
pub fn read_region(
    space: &dyn AddressSpace,
    start: u64,
    size: u64,
) -> Result<RegionBytes, ReadError> {
    let len = usize::try_from(size).map_err(|_| ReadError::RegionTooLarge(size))?;

    let (data, first_invalid) = match space.read(start, len, false) {
        Ok(data) => (data, None),
        Err(ReadError::InvalidAddress { addr }) => (space.read(start, len, true)?, Some(addr)),
        Err(e) => return Err(e),
    };

    if data.len() != len {
        return Err(ReadError::ShortRead {
            addr: start,
            expected: len,
        });
    }

    Ok(RegionBytes {
        data,
        first_invalid,
    })
}
