//! # vadump
//!
//! Memory-image process dumper library.
//!
//! Given a passive memory image, this library enumerates a process's
//! mapped memory regions by walking its on-image region tree, reads
//! each region's bytes best-effort (unmapped bytes are reported, not
//! fatal), and persists every readable region as one `.dmp` file with
//! a deterministic name.
//!
//! The process list and the image's address-space layers come from
//! outside through the [`ProcessDirectory`] and
//! [`AddressSpaceResolver`] traits; the companion CLI crate provides a
//! file-backed implementation of both.
//!
//! ## Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let (directory, resolver): (Box<dyn vadump::ProcessDirectory>, Box<dyn vadump::AddressSpaceResolver>) = unimplemented!();
//! let config = vadump::DumpConfig::new("dumps")?.with_pids([4]);
//!
//! for record in vadump::dump_processes(&*directory, &*resolver, &config)? {
//!     println!("{:#x} {} {}", record.pid, record.image_name, record.message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod dump;
pub mod process;
pub mod region;
pub mod space;
pub mod walk;

#[cfg(test)]
pub(crate) mod mock;

// Re-export commonly used items
#[doc(inline)]
pub use driver::{dump_processes, ConfigError, DumpConfig, DumpRun, OutcomeRecord};
#[doc(inline)]
pub use dump::{dump_file_name, write_region_dump, WriteError};
#[doc(inline)]
pub use process::{ProcessDirectory, ProcessEntry, ProcessListError};
#[doc(inline)]
pub use region::{Region, VadNode, VAD_NODE_SIZE};
#[doc(inline)]
pub use space::{read_region, AddressSpace, AddressSpaceResolver, ReadError, RegionBytes};
#[doc(inline)]
pub use walk::{VadWalker, WalkError};
