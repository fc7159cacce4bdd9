//! Dump Writer
//!
//! Persists one region's bytes under a canonical, deterministic name.
//! Writes go through a temporary file in the destination directory and
//! are renamed onto the final name, so a failed or abandoned write
//! never leaves a partial dump visible.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to persist dump file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Canonical dump artifact name for one region:
/// `{image_name}_{pid}_{start:x}-{end:x}.dmp`
pub fn dump_file_name(image_name: &str, pid: u64, start: u64, end: u64) -> String {
    format!("{image_name}_{pid}_{start:x}-{end:x}.dmp")
}

/// Write one region dump and return its final path.
///
/// Identical bounds for the same process overwrite the previous
/// artifact; bounds are unique within one traversal so this only
/// matters across re-runs, where overwriting is the intent.
pub fn write_region_dump(
    dump_dir: &Path,
    image_name: &str,
    pid: u64,
    start: u64,
    end: u64,
    data: &[u8],
) -> Result<PathBuf, WriteError> {
    let path = dump_dir.join(dump_file_name(image_name, pid, start, end));

    let mut tmp = NamedTempFile::new_in(dump_dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(&path)?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_dump_file_name_format() {
        assert_eq!(
            dump_file_name("explorer.exe", 1234, 0x7ffe0000, 0x7ffe1000),
            "explorer.exe_1234_7ffe0000-7ffe1000.dmp"
        );
    }

    #[test]
    fn test_dump_file_name_lowercase_hex() {
        assert_eq!(
            dump_file_name("a", 1, 0xABCD, 0xEF01),
            "a_1_abcd-ef01.dmp"
        );
    }

    #[test]
    fn test_write_region_dump() {
        let dir = tempfile::tempdir().unwrap();
        let data = vec![0x41u8; 0x1000];

        let path = write_region_dump(dir.path(), "System", 4, 0x1000, 0x2000, &data).unwrap();
        assert_eq!(path, dir.path().join("System_4_1000-2000.dmp"));
        assert_eq!(fs::read(&path).unwrap(), data);
    }

    #[test]
    fn test_write_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();

        write_region_dump(dir.path(), "System", 4, 0x1000, 0x2000, &[1, 2, 3]).unwrap();
        let path = write_region_dump(dir.path(), "System", 4, 0x1000, 0x2000, &[4, 5]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_write_missing_dir_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = write_region_dump(&missing, "System", 4, 0x1000, 0x2000, &[0]);
        assert!(err.is_err());
        assert!(!missing.exists());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        write_region_dump(dir.path(), "System", 4, 0x1000, 0x2000, &[0u8; 16]).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
