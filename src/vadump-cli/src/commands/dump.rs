//! dump-processes command handler

use std::path::{Path, PathBuf};

use anyhow::Result;

use vadump::{dump_processes, DumpConfig};

use crate::image::ImageFile;

/// Open the image, run the dump, and print one table row per outcome
/// record as it is produced.
pub fn handle(image: &Path, kernel: &str, dump_dir: PathBuf, pids: Vec<u64>) -> Result<()> {
    let image = ImageFile::open(image, kernel)?;
    let config = DumpConfig::new(dump_dir)?.with_pids(pids);

    println!("{:<12} {:<20} {}", "PID", "ImageFileName", "Result");
    for record in dump_processes(&image, &image, &config)? {
        println!(
            "{:<#12x} {:<20} {}",
            record.pid, record.image_name, record.message
        );
    }

    Ok(())
}
