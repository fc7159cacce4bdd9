mod cli;
mod commands;
mod image;

use anyhow::Result;
use clap::Parser;

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpProcesses {
            image,
            dump_dir,
            kernel,
            pids,
        } => {
            commands::dump::handle(&image, &kernel, dump_dir, pids)?;
        }
    }

    Ok(())
}
