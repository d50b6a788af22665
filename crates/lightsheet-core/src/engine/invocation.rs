use std::fmt;
use std::path::{Path, PathBuf};

use crate::consts::{CONVERTER_CHANNEL_TOKEN, CONVERTER_TIMEPOINT_TOKEN};
use crate::paths::engine_path;

use super::operation::StageOperation;

/// A stage operation in the form the external tools expect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    /// Named engine command with its option string.
    Command { command: String, options: String },
    /// Separate operating-system process.
    Process {
        program: PathBuf,
        args: Vec<String>,
        working_dir: PathBuf,
    },
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command { command, options } => write!(f, "{command} {options}"),
            Self::Process { program, args, .. } => {
                write!(f, "{}", program.display())?;
                for arg in args {
                    write!(f, " \"{arg}\"")?;
                }
                Ok(())
            }
        }
    }
}

/// Space-separated `key=value` option string.
#[derive(Default)]
struct Options(Vec<String>);

impl Options {
    fn bracketed(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.0.push(format!("{key}=[{value}]"));
        self
    }

    fn value(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.0.push(format!("{key}={value}"));
        self
    }

    fn flag(mut self, name: &str) -> Self {
        self.0.push(name.to_string());
        self
    }

    fn select(self, project: &Path) -> Self {
        self.bracketed("select", engine_path(project))
    }

    /// Every angle, channel, illumination, tile and timepoint.
    fn all_views(self, prefix: &str) -> Self {
        self.bracketed(&format!("{prefix}_angle"), "All angles")
            .bracketed(&format!("{prefix}_channel"), "All channels")
            .bracketed(&format!("{prefix}_illumination"), "All illuminations")
            .bracketed(&format!("{prefix}_tile"), "All tiles")
            .bracketed(&format!("{prefix}_timepoint"), "All Timepoints")
    }

    fn build(self) -> String {
        self.0.join(" ")
    }
}

fn command(name: &str, options: Options) -> Invocation {
    Invocation::Command {
        command: name.to_string(),
        options: options.build(),
    }
}

/// Translate a typed operation into the delegated tool's syntax.
pub fn marshal(op: &StageOperation) -> Invocation {
    match op {
        StageOperation::DefineDataset {
            reader,
            project_filename,
            first_file,
        } => command(
            "Define dataset ...",
            Options::default()
                .bracketed("define_dataset", reader.loader())
                .bracketed("project_filename", project_filename)
                .bracketed("first_czi", engine_path(first_file))
                .flag("apply_rotation_to_dataset")
                .flag("fix_bioformats"),
        ),
        StageOperation::Resave {
            project,
            export,
            deflate,
        } => {
            let mut options = Options::default().select(project).all_views("resave");
            if *deflate {
                options = options.flag("use_deflate_compression");
            }
            command(
                "As HDF5 ...",
                options.bracketed("export_path", engine_path(export)),
            )
        }
        StageOperation::PairwiseShifts { project } => command(
            "Calculate pairwise shifts ...",
            Options::default()
                .select(project)
                .all_views("process")
                .bracketed("method", "Phase Correlation")
                .bracketed("channels", "Average Channels")
                .bracketed("illuminations", "Average Illuminations"),
        ),
        StageOperation::FilterShifts {
            project,
            min_correlation,
            max_correlation,
        } => command(
            "Filter pairwise shifts ...",
            Options::default()
                .select(project)
                .flag("filter_by_link_quality")
                .value("min_r", min_correlation)
                .value("max_r", max_correlation)
                .value("max_shift_in_x", 0)
                .value("max_shift_in_y", 0)
                .value("max_shift_in_z", 0)
                .value("max_displacement", 0),
        ),
        StageOperation::GlobalOptimize {
            project,
            relative_threshold,
            absolute_threshold,
        } => command(
            "Optimize globally and apply shifts ...",
            Options::default()
                .select(project)
                .all_views("process")
                .value("relative", format!("{relative_threshold:.3}"))
                .value("absolute", format!("{absolute_threshold:.3}"))
                .bracketed(
                    "global_optimization_strategy",
                    "Two-Round using Metadata to align unconnected Tiles",
                )
                .flag("fix_group_0-0,"),
        ),
        StageOperation::DetectInterestPoints { project, params } => command(
            "Detect Interest Points for Registration",
            Options::default()
                .select(project)
                .all_views("process")
                .value("type_of_interest_point_detection", "Difference-of-Gaussian")
                .value("label_interest_points", "beads")
                .flag("limit_amount_of_detections")
                .flag("group_tiles")
                .flag("group_illuminations")
                .bracketed("subpixel_localization", "3-dimensional quadratic fit")
                .bracketed("interest_point_specification", "Advanced ...")
                .bracketed("downsample_xy", "Match Z Resolution (less downsampling)")
                .value("downsample_z", "1x")
                .value("sigma", format!("{:.5}", params.sigma))
                .value("threshold", format!("{:.5}", params.threshold))
                .flag("find_maxima")
                .value("maximum_number", params.max_detections)
                .value("type_of_detections_to_use", "Brightest")
                .bracketed("compute_on", "CPU (Java)"),
        ),
        StageOperation::RegisterInterestPoints { project } => command(
            "Register Dataset based on Interest Points",
            Options::default()
                .select(project)
                .all_views("process")
                .bracketed(
                    "registration_algorithm",
                    "Precise descriptor-based (translation invariant)",
                )
                .bracketed(
                    "registration_in_between_views",
                    "Compare all views against each other",
                )
                .value("interest_points", "beads")
                .flag("group_tiles")
                .flag("group_illuminations")
                .flag("group_channels")
                .bracketed("fix_views", "Fix first view")
                .bracketed("map_back_views", "Do not map back (use this if views are fixed)")
                .value("transformation", "Affine")
                .flag("regularize_model")
                .value("model_to_regularize_with", "Rigid")
                .value("lamba", "0.10")
                .value("number_of_neighbors", 3)
                .value("redundancy", 3)
                .value("significance", 2)
                .value("allowed_error_for_ransac", 5)
                .value("ransac_iterations", "Normal")
                .bracketed(
                    "interestpoint_grouping",
                    "Group interest points (simply combine all in one virtual view)",
                )
                .value("interest", 5),
        ),
        StageOperation::SelectIllumination { project } => command(
            "Select Illuminations",
            Options::default()
                .select(project)
                .bracketed("selection", "Pick brightest"),
        ),
        StageOperation::RestageTiff { project, export } => command(
            "As TIFF ...",
            Options::default()
                .select(project)
                .all_views("resave")
                .bracketed("export_path", engine_path(export)),
        ),
        StageOperation::Fuse {
            project,
            export,
            downsampling,
            strategy,
            output,
        } => command(
            "Fuse dataset ...",
            Options::default()
                .select(project)
                .all_views("process")
                .bracketed("bounding_box", "Currently Selected Views")
                .value("downsampling", downsampling)
                .bracketed("pixel_type", "16-bit unsigned integer")
                .bracketed("interpolation", "Linear Interpolation")
                .value("image", strategy.engine_selector())
                .bracketed("interest_points_for_non_rigid", "-= Disable Non-Rigid =-")
                .flag("blend")
                .flag("preserve_original")
                .bracketed("produce", "Each timepoint & channel")
                .value("fused_image", output.engine_selector())
                .bracketed("export_path", engine_path(export)),
        ),
        StageOperation::Convert {
            executable,
            working_dir,
            input,
            output,
            format,
        } => Invocation::Process {
            program: executable.clone(),
            args: vec![
                "-i".into(),
                engine_path(input),
                "-of".into(),
                format.clone(),
                "-o".into(),
                engine_path(output),
                "-fsdc".into(),
                CONVERTER_CHANNEL_TOKEN.into(),
                "-fsdt".into(),
                CONVERTER_TIMEPOINT_TOKEN.into(),
            ],
            working_dir: working_dir.clone(),
        },
    }
}
