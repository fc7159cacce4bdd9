//! Memory Image File Backend
//!
//! File-backed implementation of the library's process-directory and
//! address-space seams. The image is a single memory-mapped file in
//! the `VIMG` container format:
//!
//! - header (36 bytes): magic `VIMG`, `version: u32`, kernel module
//!   name `[u8; 16]` (NUL-padded), `proc_count: u32`,
//!   `proc_table_rva: u64`
//! - process entry (40 bytes): `pid: u64`, `image_name: [u8; 16]`,
//!   `vad_root: u64`, `run_count: u32`, `run_table_rva: u32`
//! - run descriptor (24 bytes): `va_start: u64`, `va_size: u64`,
//!   `file_offset: u64`
//!
//! All fields little-endian. Each process's mapped memory is described
//! by its run list; virtual addresses outside every run are unmapped.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use byteorder::{ByteOrder, LE};
use memmap2::Mmap;

use vadump::{
    AddressSpace, AddressSpaceResolver, ProcessDirectory, ProcessEntry, ProcessListError,
    ReadError,
};

pub const IMAGE_MAGIC: &[u8; 4] = b"VIMG";
pub const IMAGE_VERSION: u32 = 1;

const HEADER_SIZE: usize = 36;
const PROC_ENTRY_SIZE: usize = 40;
const RUN_SIZE: usize = 24;
const NAME_SIZE: usize = 16;

/// One contiguous mapped range of a process: virtual addresses
/// `[va_start, va_start + va_size)` live at `file_offset` in the image.
/// `va_size` is capped at parse time so `va_end` cannot overflow.
#[derive(Debug, Clone, Copy)]
struct Run {
    va_start: u64,
    va_size: u64,
    file_offset: u64,
}

impl Run {
    fn va_end(&self) -> u64 {
        self.va_start + self.va_size
    }
}

/// One process's view of the image
pub struct ImageLayer {
    mmap: Arc<Mmap>,
    /// Sorted by `va_start`, non-overlapping
    runs: Vec<Run>,
}

impl ImageLayer {
    fn find_run(&self, va: u64) -> Option<&Run> {
        let idx = self.runs.partition_point(|r| r.va_start <= va);
        let run = self.runs[..idx].last()?;
        (va < run.va_end()).then_some(run)
    }

    /// Lowest mapped address strictly above `va`, if any
    fn next_mapped(&self, va: u64) -> Option<u64> {
        let idx = self.runs.partition_point(|r| r.va_start <= va);
        self.runs.get(idx).map(|r| r.va_start)
    }
}

impl AddressSpace for ImageLayer {
    fn read(&self, start: u64, size: usize, pad: bool) -> Result<Vec<u8>, ReadError> {
        let end = start
            .checked_add(size as u64)
            .ok_or(ReadError::RegionTooLarge(size as u64))?;

        let mut out = Vec::with_capacity(size);
        let mut va = start;
        while va < end {
            match self.find_run(va) {
                Some(run) => {
                    let chunk_end = end.min(run.va_end());
                    let len = (chunk_end - va) as usize;
                    let offset = (run.file_offset + (va - run.va_start)) as usize;
                    if offset + len > self.mmap.len() {
                        return Err(ReadError::Io(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            format!("image truncated: run at {va:#x} points past end of file"),
                        )));
                    }
                    out.extend_from_slice(&self.mmap[offset..offset + len]);
                    va = chunk_end;
                }
                None => {
                    if !pad {
                        return Err(ReadError::InvalidAddress { addr: va });
                    }
                    let next = self.next_mapped(va).unwrap_or(end).min(end);
                    out.resize(out.len() + (next - va) as usize, 0);
                    va = next;
                }
            }
        }
        Ok(out)
    }
}

/// A parsed memory image: the process table plus one layer per process
pub struct ImageFile {
    pub path: PathBuf,
    processes: Vec<ProcessEntry>,
    layers: HashMap<String, ImageLayer>,
}

impl ImageFile {
    /// Open and parse a memory image, checking that it carries the
    /// expected kernel module.
    pub fn open(path: &Path, kernel_module: &str) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open memory image: {path:?}"))?;
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to mmap memory image: {path:?}"))?;
        let mmap = Arc::new(mmap);

        if mmap.len() < HEADER_SIZE || &mmap[0..4] != IMAGE_MAGIC {
            bail!("Not a VIMG memory image: {path:?}");
        }
        let version = LE::read_u32(&mmap[4..8]);
        if version != IMAGE_VERSION {
            bail!("Unsupported VIMG version {version}");
        }

        let module_name = decode_fixed_name(&mmap[8..8 + NAME_SIZE]);
        if module_name != kernel_module {
            bail!(
                "Kernel module {kernel_module:?} not found in image (image provides {module_name:?})"
            );
        }

        let proc_count = LE::read_u32(&mmap[24..28]) as usize;
        let proc_table_rva = LE::read_u64(&mmap[28..36]) as usize;

        let table_end = proc_table_rva
            .checked_add(proc_count * PROC_ENTRY_SIZE)
            .filter(|&e| e <= mmap.len())
            .context("Process table out of bounds")?;

        let mut processes = Vec::with_capacity(proc_count);
        let mut layers = HashMap::new();

        for raw in mmap[proc_table_rva..table_end].chunks_exact(PROC_ENTRY_SIZE) {
            let pid = LE::read_u64(&raw[0..8]);
            let image_name_raw = raw[8..8 + NAME_SIZE].to_vec();
            let vad_root = LE::read_u64(&raw[24..32]);
            let run_count = LE::read_u32(&raw[32..36]) as usize;
            let run_table_rva = LE::read_u32(&raw[36..40]) as usize;

            let runs_end = run_table_rva
                .checked_add(run_count * RUN_SIZE)
                .filter(|&e| e <= mmap.len())
                .with_context(|| format!("Run table for pid {pid} out of bounds"))?;

            let mut runs: Vec<Run> = mmap[run_table_rva..runs_end]
                .chunks_exact(RUN_SIZE)
                .map(|r| {
                    let va_start = LE::read_u64(&r[0..8]);
                    // A corrupt descriptor can claim a size that wraps
                    // past the top of the address space; cap it here so
                    // run arithmetic never overflows.
                    let va_size = LE::read_u64(&r[8..16]).min(u64::MAX - va_start);
                    Run {
                        va_start,
                        va_size,
                        file_offset: LE::read_u64(&r[16..24]),
                    }
                })
                .collect();
            runs.sort_by_key(|r| r.va_start);

            let layer_name = format!("proc-{pid}");
            layers.insert(
                layer_name.clone(),
                ImageLayer {
                    mmap: Arc::clone(&mmap),
                    runs,
                },
            );
            processes.push(ProcessEntry {
                pid,
                image_name_raw,
                layer_name,
                vad_root,
            });
        }

        eprintln!(
            "Opened memory image {:?} ({} KB), module {:?}, {} processes",
            path,
            mmap.len() / 1000,
            module_name,
            processes.len()
        );

        Ok(ImageFile {
            path: path.to_path_buf(),
            processes,
            layers,
        })
    }
}

impl AddressSpaceResolver for ImageFile {
    fn layer(&self, name: &str) -> Result<&dyn AddressSpace, ReadError> {
        self.layers
            .get(name)
            .map(|l| l as &dyn AddressSpace)
            .ok_or_else(|| ReadError::UnknownLayer(name.to_string()))
    }
}

impl ProcessDirectory for ImageFile {
    fn list_processes(&self) -> Result<Vec<ProcessEntry>, ProcessListError> {
        Ok(self.processes.clone())
    }
}

/// Decode a NUL-padded fixed-length name field
fn decode_fixed_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).to_string()
}
