//! Memory Region Types
//!
//! Data structures for representing a process's mapped memory regions
//! and the on-image tree nodes that index them.

use byteorder::{ByteOrder, LE};

use crate::space::{AddressSpace, ReadError};

/// A contiguous virtual address range `[start, end)` of a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: u64,
    pub end: u64,
}

impl Region {
    pub fn size(&self) -> u64 {
        self.end - self.start
    }
}

/// Size in bytes of one encoded region-tree node
pub const VAD_NODE_SIZE: usize = 32;

/// One node of a process's region tree as stored in the image
///
/// Encoded as a 32-byte little-endian record:
/// `start: u64 | end: u64 | left: u64 | right: u64`, where `left` and
/// `right` are the addresses of the child nodes (0 = no child). Nodes
/// live inside the process's own address space and are ordered as a
/// binary search tree keyed by `start`.
#[derive(Debug, Clone, Copy)]
pub struct VadNode {
    pub start: u64,
    pub end: u64,
    pub left: u64,
    pub right: u64,
}

impl VadNode {
    /// Decode a node from its raw 32-byte encoding
    pub fn decode(raw: &[u8; VAD_NODE_SIZE]) -> Self {
        VadNode {
            start: LE::read_u64(&raw[0..8]),
            end: LE::read_u64(&raw[8..16]),
            left: LE::read_u64(&raw[16..24]),
            right: LE::read_u64(&raw[24..32]),
        }
    }

    /// Read and decode the node at `addr` with a strict read
    pub fn read(space: &dyn AddressSpace, addr: u64) -> Result<Self, ReadError> {
        let bytes = space.read(addr, VAD_NODE_SIZE, false)?;
        let raw: [u8; VAD_NODE_SIZE] = bytes
            .try_into()
            .map_err(|_| ReadError::ShortRead { addr, expected: VAD_NODE_SIZE })?;
        Ok(Self::decode(&raw))
    }

    pub fn region(&self) -> Region {
        Region {
            start: self.start,
            end: self.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_size() {
        let region = Region {
            start: 0x1000,
            end: 0x2000,
        };
        assert_eq!(region.size(), 0x1000);
    }

    #[test]
    fn test_zero_size_region() {
        let region = Region {
            start: 0x1000,
            end: 0x1000,
        };
        assert_eq!(region.size(), 0);
    }

    #[test]
    fn test_node_decode() {
        let mut raw = [0u8; VAD_NODE_SIZE];
        raw[0..8].copy_from_slice(&0x7ffe_0000u64.to_le_bytes());
        raw[8..16].copy_from_slice(&0x7ffe_1000u64.to_le_bytes());
        raw[16..24].copy_from_slice(&0x100u64.to_le_bytes());
        raw[24..32].copy_from_slice(&0u64.to_le_bytes());

        let node = VadNode::decode(&raw);
        assert_eq!(node.start, 0x7ffe_0000);
        assert_eq!(node.end, 0x7ffe_1000);
        assert_eq!(node.left, 0x100);
        assert_eq!(node.right, 0);
        assert_eq!(node.region().size(), 0x1000);
    }
}
