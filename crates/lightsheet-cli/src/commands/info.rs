use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use lightsheet_core::metadata::read_project_metadata;
use lightsheet_core::resources::format_bytes;

#[derive(Args)]
pub struct InfoArgs {
    /// Project description file (.xml)
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let metadata = read_project_metadata(&args.file)
        .with_context(|| format!("Failed to read project {}", args.file.display()))?;
    let size = std::fs::metadata(&args.file)?.len();

    println!("File:           {}", args.file.display());
    println!("Channels:       {}", metadata.channels);
    println!("Illuminations:  {}", metadata.illuminations);
    println!("Timepoints:     {}", metadata.timepoints);
    println!("Fused volumes:  {}", metadata.fused_volumes());
    println!("Project size:   {}", format_bytes(size));

    Ok(())
}
