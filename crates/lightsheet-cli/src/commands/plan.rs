use anyhow::Result;
use clap::Args;
use lightsheet_core::convert::locate_converter;
use lightsheet_core::metadata::{read_project_metadata, DatasetMetadata};
use lightsheet_core::paths::plan_artifacts;
use lightsheet_core::resources::{format_bytes, ResourcePlanner};

use super::run::JobArgs;

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub job: JobArgs,
}

/// Dry run: derive every path and estimate fusion memory without running a stage.
pub fn run(args: &PlanArgs) -> Result<()> {
    let config = args.job.build_config()?;
    config.validate()?;
    let artifacts = plan_artifacts(&args.job.file, &config)?;

    println!("Job:            {}", artifacts.name);
    println!("Project:        {}", artifacts.project.display());
    println!("Temp directory: {}", artifacts.temp_dir.display());
    println!("Resaved data:   {}", artifacts.resaved_container.display());
    println!("Fused project:  {}", artifacts.fused_project.display());
    println!("Final output:   {}", artifacts.final_output.display());
    println!("Summary:        {}", artifacts.summary.display());

    let metadata = if artifacts.project.is_file() {
        read_project_metadata(&artifacts.project)?
    } else {
        println!("(project not defined yet, assuming a single view)");
        DatasetMetadata::default()
    };
    println!("Dataset:        {metadata}");

    if !args.job.file.is_file() {
        println!("Fusion:         input not found, no estimate");
        return Ok(());
    }
    let planner = ResourcePlanner::new(config.resources.clone());
    let size = planner.artifact_bytes(&artifacts.resaved_container, &artifacts.input)?;
    let estimate = planner.estimate(
        size,
        &metadata,
        config.downsampling,
        config.resources.free_memory(),
    );
    println!(
        "Fusion:         {} ({} tier), {} dataset, {} free, {} per volume",
        estimate.strategy,
        estimate.tier,
        format_bytes(estimate.artifact_bytes),
        format_bytes(estimate.free_memory_bytes),
        format_bytes(estimate.working_set_bytes),
    );
    if !estimate.fusion_permitted {
        println!(
            "                slow fusion needs confirmation (policy: {})",
            config.resources.slow_fusion
        );
    }

    match locate_converter(&config.converter) {
        Some(install) => println!(
            "Converter:      {} ({})",
            install.dir.display(),
            install.version_string()
        ),
        None => println!("Converter:      not found, conversion would be skipped"),
    }

    Ok(())
}
