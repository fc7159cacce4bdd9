//! Mock collaborators for testing the walker, reader, and driver.

use std::collections::HashMap;
use std::ops::Range;

use crate::process::{ProcessDirectory, ProcessEntry, ProcessListError};
use crate::region::VadNode;
use crate::space::{AddressSpace, AddressSpaceResolver, ReadError};

/// An in-memory address space: a contiguous byte buffer at `base`,
/// with optional unmapped holes punched into it.
pub struct MockSpace {
    pub base: u64,
    pub data: Vec<u8>,
    pub holes: Vec<Range<u64>>,
    pub faults: Vec<Range<u64>>,
}

impl MockSpace {
    pub fn new(base: u64, size: usize) -> Self {
        MockSpace {
            base,
            data: vec![0u8; size],
            holes: Vec::new(),
            faults: Vec::new(),
        }
    }

    pub fn fill(&mut self, addr: u64, bytes: &[u8]) {
        let offset = (addr - self.base) as usize;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Mark an address range as unmapped
    pub fn punch_hole(&mut self, range: Range<u64>) {
        self.holes.push(range);
    }

    /// Mark an address range as failing with an I/O error on any
    /// read, padded or not
    pub fn fail_range(&mut self, range: Range<u64>) {
        self.faults.push(range);
    }

    /// Encode a region-tree node at `addr`
    pub fn put_node(&mut self, addr: u64, node: VadNode) {
        let mut raw = [0u8; crate::region::VAD_NODE_SIZE];
        raw[0..8].copy_from_slice(&node.start.to_le_bytes());
        raw[8..16].copy_from_slice(&node.end.to_le_bytes());
        raw[16..24].copy_from_slice(&node.left.to_le_bytes());
        raw[24..32].copy_from_slice(&node.right.to_le_bytes());
        self.fill(addr, &raw);
    }

    fn accessible(&self, addr: u64) -> bool {
        addr >= self.base
            && addr - self.base < self.data.len() as u64
            && !self.holes.iter().any(|h| h.contains(&addr))
    }
}

impl AddressSpace for MockSpace {
    fn read(&self, start: u64, size: usize, pad: bool) -> Result<Vec<u8>, ReadError> {
        let mut out = Vec::with_capacity(size);
        for i in 0..size as u64 {
            let addr = start.wrapping_add(i);
            if self.faults.iter().any(|f| f.contains(&addr)) {
                return Err(ReadError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "backing store fault",
                )));
            }
            if self.accessible(addr) {
                out.push(self.data[(addr - self.base) as usize]);
            } else if pad {
                out.push(0);
            } else {
                return Err(ReadError::InvalidAddress { addr });
            }
        }
        Ok(out)
    }
}

/// Resolver over a fixed set of named mock layers
#[derive(Default)]
pub struct MockResolver {
    pub layers: HashMap<String, MockSpace>,
}

impl MockResolver {
    pub fn insert(&mut self, name: &str, space: MockSpace) {
        self.layers.insert(name.to_string(), space);
    }
}

impl AddressSpaceResolver for MockResolver {
    fn layer(&self, name: &str) -> Result<&dyn AddressSpace, ReadError> {
        self.layers
            .get(name)
            .map(|s| s as &dyn AddressSpace)
            .ok_or_else(|| ReadError::UnknownLayer(name.to_string()))
    }
}

/// Directory over a fixed process list
#[derive(Default)]
pub struct MockDirectory {
    pub entries: Vec<ProcessEntry>,
}

impl ProcessDirectory for MockDirectory {
    fn list_processes(&self) -> Result<Vec<ProcessEntry>, ProcessListError> {
        Ok(self.entries.clone())
    }
}
