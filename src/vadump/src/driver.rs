//! Process Iteration Driver
//!
//! Walks every process in scope, dumps each of its memory regions,
//! and emits one outcome record per region (or one per process when
//! the process itself cannot be resolved). Records are produced
//! lazily: the consumer sees early processes before later ones are
//! touched, and dropping the run mid-way releases everything.

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::dump::write_region_dump;
use crate::process::{ProcessDirectory, ProcessEntry, ProcessListError};
use crate::region::Region;
use crate::space::{read_region, AddressSpace, AddressSpaceResolver, ReadError};
use crate::walk::VadWalker;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("dump directory {0:?} is not a directory")]
    NotADirectory(PathBuf),
}

/// Validated run configuration. Checked once at construction and
/// never re-inspected.
#[derive(Debug, Clone)]
pub struct DumpConfig {
    pub dump_dir: PathBuf,
    /// Allow-list of process identifiers; empty = every process
    pub pid_filter: BTreeSet<u64>,
}

impl DumpConfig {
    pub fn new(dump_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let dump_dir = dump_dir.into();
        if !dump_dir.is_dir() {
            return Err(ConfigError::NotADirectory(dump_dir));
        }
        Ok(DumpConfig {
            dump_dir,
            pid_filter: BTreeSet::new(),
        })
    }

    pub fn with_pids(mut self, pids: impl IntoIterator<Item = u64>) -> Self {
        self.pid_filter = pids.into_iter().collect();
        self
    }

    fn includes(&self, pid: u64) -> bool {
        self.pid_filter.is_empty() || self.pid_filter.contains(&pid)
    }
}

/// One row of the observable result stream
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub pid: u64,
    pub image_name: String,
    pub message: String,
}

#[derive(Error, Debug)]
enum ResolveError {
    #[error(transparent)]
    Layer(#[from] ReadError),

    #[error("region tree root missing")]
    MissingRegionRoot,
}

struct ActiveProcess<'a> {
    pid: u64,
    image_name: String,
    space: &'a dyn AddressSpace,
    walker: VadWalker<'a>,
}

/// Lazy stream of outcome records for one run
pub struct DumpRun<'a> {
    resolver: &'a dyn AddressSpaceResolver,
    config: &'a DumpConfig,
    processes: std::vec::IntoIter<ProcessEntry>,
    current: Option<ActiveProcess<'a>>,
}

/// Start a dump run over every process the directory lists.
///
/// Only a total enumeration failure surfaces as an error here; every
/// per-process and per-region problem afterwards becomes a record in
/// the returned stream.
pub fn dump_processes<'a>(
    directory: &dyn ProcessDirectory,
    resolver: &'a dyn AddressSpaceResolver,
    config: &'a DumpConfig,
) -> Result<DumpRun<'a>, ProcessListError> {
    let processes = directory.list_processes()?;
    Ok(DumpRun {
        resolver,
        config,
        processes: processes.into_iter(),
        current: None,
    })
}

impl<'a> DumpRun<'a> {
    fn activate(&self, entry: &ProcessEntry) -> Result<ActiveProcess<'a>, ResolveError> {
        let space = self.resolver.layer(&entry.layer_name)?;
        if entry.vad_root == 0 {
            return Err(ResolveError::MissingRegionRoot);
        }
        Ok(ActiveProcess {
            pid: entry.pid,
            image_name: entry.image_name(),
            space,
            walker: VadWalker::new(space, entry.vad_root),
        })
    }
}

impl Iterator for DumpRun<'_> {
    type Item = OutcomeRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let config = self.config;
        loop {
            if let Some(active) = self.current.as_mut() {
                if let Some(item) = active.walker.next() {
                    let message = match item {
                        Ok(region) => {
                            dump_one(config, active.space, &active.image_name, active.pid, region)
                        }
                        Err(e) => format!("error walking memory regions: {e}"),
                    };
                    return Some(OutcomeRecord {
                        pid: active.pid,
                        image_name: active.image_name.clone(),
                        message,
                    });
                }
                self.current = None;
            }

            let entry = self.processes.next()?;
            if !config.includes(entry.pid) {
                continue;
            }

            match self.activate(&entry) {
                Ok(active) => self.current = Some(active),
                Err(e) => {
                    return Some(OutcomeRecord {
                        pid: entry.pid,
                        image_name: entry.image_name(),
                        message: format!("failed to resolve process memory: {e}"),
                    });
                }
            }
        }
    }
}

/// Dump one region and describe the outcome.
fn dump_one(
    config: &DumpConfig,
    space: &dyn AddressSpace,
    image_name: &str,
    pid: u64,
    region: Region,
) -> String {
    let bytes = match read_region(space, region.start, region.size()) {
        Ok(bytes) => bytes,
        Err(ReadError::InvalidAddress { .. }) => {
            return "invalid address for this region".to_string();
        }
        Err(e) => return format!("error dumping region: {e}"),
    };

    // A region touching any unmapped byte is reported, not dumped.
    if bytes.first_invalid.is_some() {
        return "invalid address for this region".to_string();
    }

    match write_region_dump(
        &config.dump_dir,
        image_name,
        pid,
        region.start,
        region.end,
        &bytes.data,
    ) {
        Ok(path) => format!("dumped to {}", path.display()),
        Err(e) => format!("error dumping region: {e}"),
    }
}
