//! Region Tree Walker
//!
//! Lazy in-order traversal of a process's region tree as stored in a
//! passive memory image. The tree offers no consistency guarantees: a
//! node may point at an unmapped address, carry inverted bounds, or
//! loop back into itself. The walker yields such problems as items and
//! keeps going with the rest of the tree instead of aborting.

use std::collections::HashSet;

use thiserror::Error;

use crate::region::{Region, VadNode};
use crate::space::{AddressSpace, ReadError};

/// Upper bound on nodes visited per tree. A healthy process has a few
/// thousand regions; anything near this count is a corrupt tree.
const MAX_NODES: usize = 1 << 20;

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("unreadable tree node at {addr:#x}: {source}")]
    BadNode {
        addr: u64,
        #[source]
        source: ReadError,
    },

    #[error("tree node at {addr:#x} has inverted bounds {start:#x}..{end:#x}")]
    BadBounds { addr: u64, start: u64, end: u64 },

    #[error("cycle in region tree at node {addr:#x}")]
    CycleDetected { addr: u64 },

    #[error("region tree exceeds {0} nodes")]
    NodeLimitExceeded(usize),
}

/// In-order iterator over the region tree rooted at `root`.
///
/// Yields regions in ascending start order for a well-formed tree.
/// A malformed subtree yields one `Err` item and is skipped; siblings
/// and ancestors are unaffected.
pub struct VadWalker<'a> {
    space: &'a dyn AddressSpace,
    /// Next node address to descend into, 0 = none pending
    current: u64,
    stack: Vec<VadNode>,
    visited: HashSet<u64>,
}

impl<'a> VadWalker<'a> {
    pub fn new(space: &'a dyn AddressSpace, root: u64) -> Self {
        VadWalker {
            space,
            current: root,
            stack: Vec::new(),
            visited: HashSet::new(),
        }
    }

    /// Descend the left spine from `self.current`, pushing ancestors.
    /// Returns an error item if the descent hit a malformed node.
    fn descend(&mut self) -> Option<WalkError> {
        while self.current != 0 {
            let addr = self.current;

            if !self.visited.insert(addr) {
                self.current = 0;
                return Some(WalkError::CycleDetected { addr });
            }
            if self.visited.len() > MAX_NODES {
                self.current = 0;
                self.stack.clear();
                return Some(WalkError::NodeLimitExceeded(MAX_NODES));
            }

            match VadNode::read(self.space, addr) {
                Ok(node) if node.end < node.start => {
                    // Abandon this subtree entirely; its children are
                    // as untrustworthy as its bounds.
                    self.current = 0;
                    return Some(WalkError::BadBounds {
                        addr,
                        start: node.start,
                        end: node.end,
                    });
                }
                Ok(node) => {
                    self.current = node.left;
                    self.stack.push(node);
                }
                Err(source) => {
                    self.current = 0;
                    return Some(WalkError::BadNode { addr, source });
                }
            }
        }
        None
    }
}

impl Iterator for VadWalker<'_> {
    type Item = Result<Region, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.descend() {
            return Some(Err(err));
        }

        let node = self.stack.pop()?;
        self.current = node.right;
        Some(Ok(node.region()))
    }
}
