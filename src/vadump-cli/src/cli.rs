//! Core CLI definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vadump")]
#[command(about = "Dump process memory regions from a memory image", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dump every mapped region of each process to one .dmp file per region
    #[command(visible_alias = "d")]
    DumpProcesses {
        /// Path to the memory image
        #[arg(short, long)]
        image: PathBuf,

        /// Directory where region dumps are written (must exist)
        #[arg(long)]
        dump_dir: PathBuf,

        /// Kernel module name expected in the image header
        #[arg(long, default_value = "kernel")]
        kernel: String,

        /// Only dump processes with this PID (repeatable)
        #[arg(long = "pid", value_name = "PID")]
        pids: Vec<u64>,
    },
}
