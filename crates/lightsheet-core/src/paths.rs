use std::path::{Path, PathBuf};

use xxhash_rust::xxh3::xxh3_64;

use crate::consts::{
    ACQUISITION_EXTENSION, CONTAINER_EXTENSION, FINAL_EXTENSION, FIRST_FUSED_TIFF,
    FUSED_DIR_SUFFIX, FUSED_PROJECT_SUFFIX, PROJECT_EXTENSION, SUMMARY_SUFFIX, TEMP_DIR_SUFFIX,
};
use crate::error::{PipelineError, Result};
use crate::pipeline::config::PipelineConfig;

/// Every path a job reads or writes, derived from the first acquisition file.
///
/// All paths use `/` as separator so they can be embedded verbatim in engine
/// option strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactSet {
    /// Display name of the job: the acquisition file name.
    pub name: String,
    /// First raw acquisition file.
    pub input: PathBuf,
    /// Canonical project description written by the define stage.
    pub project: PathBuf,
    /// Private working directory for destructive stages.
    pub temp_dir: PathBuf,
    /// Copy of the canonical project inside `temp_dir`.
    pub staged_project: PathBuf,
    /// Container written by the resave stage.
    pub resaved_container: PathBuf,
    /// Project description of the fused volume.
    pub fused_project: PathBuf,
    /// Converted final-format output, next to the input.
    pub final_output: PathBuf,
    /// Persisted job summary, next to the input.
    pub summary: PathBuf,
}

impl ArtifactSet {
    /// Directory that receives the fused files.
    pub fn fused_dir(&self) -> &Path {
        self.fused_project.parent().unwrap_or(self.temp_dir.as_path())
    }

    /// First fused TIFF file, the converter's entry point for TIFF fusion.
    pub fn first_fused_tiff(&self) -> PathBuf {
        join(&self.fused_dir().to_string_lossy(), FIRST_FUSED_TIFF)
    }

    /// True when the fused output lives inside the temp working directory and
    /// would be lost by cleanup.
    pub fn fused_in_temp(&self) -> bool {
        self.fused_project.starts_with(&self.temp_dir)
    }
}

/// Replace Windows separators so string-built engine commands are unambiguous.
pub fn normalize_separators(raw: &str) -> String {
    raw.replace('\\', "/")
}

/// Render a path for an engine option string.
pub fn engine_path(path: &Path) -> String {
    normalize_separators(&path.to_string_lossy())
}

fn join(dir: &str, name: &str) -> PathBuf {
    PathBuf::from(format!("{}/{}", dir.trim_end_matches('/'), name))
}

fn invalid(path: &Path, reason: impl Into<String>) -> PipelineError {
    PipelineError::InvalidInput {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Derive the artifact paths for one acquisition.
///
/// Fails when the input does not carry the acquisition suffix or its parent
/// directory does not exist. Apart from that directory check this is pure:
/// identical arguments always give identical sets.
pub fn plan_artifacts(input: &Path, config: &PipelineConfig) -> Result<ArtifactSet> {
    let normalized = normalize_separators(&input.to_string_lossy());
    let input = PathBuf::from(&normalized);

    let has_suffix = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ACQUISITION_EXTENSION));
    if !has_suffix {
        return Err(invalid(
            &input,
            format!("expected a .{ACQUISITION_EXTENSION} acquisition file"),
        ));
    }

    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| invalid(&input, "file name is not valid UTF-8"))?
        .to_string();
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid(&input, "file name has no stem"))?
        .to_string();

    let parent = match normalized.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => normalized[..idx].to_string(),
        None => ".".to_string(),
    };
    if !Path::new(&parent).is_dir() {
        return Err(invalid(&input, format!("parent directory {parent} does not exist")));
    }

    // Jobs sharing a temp override are told apart by a hash of the full input
    // path; next to the input the file name alone is unique.
    let temp_dir = match &config.temp_directory {
        Some(root) => {
            let root = normalize_separators(&root.to_string_lossy());
            let tag = xxh3_64(normalized.as_bytes()) as u32;
            join(&root, &format!("{file_name}_{tag:08x}{TEMP_DIR_SUFFIX}"))
        }
        None => join(&parent, &format!("{file_name}{TEMP_DIR_SUFFIX}")),
    };
    let temp = temp_dir.to_string_lossy().into_owned();

    let project_file = format!("{stem}.{PROJECT_EXTENSION}");
    let fused_file = format!("{stem}{FUSED_PROJECT_SUFFIX}.{PROJECT_EXTENSION}");
    let fused_project = if config.convert_to_final_format {
        join(&temp, &fused_file)
    } else {
        let kept = join(&parent, &format!("{file_name}{FUSED_DIR_SUFFIX}"));
        join(&kept.to_string_lossy(), &fused_file)
    };

    Ok(ArtifactSet {
        project: join(&parent, &project_file),
        staged_project: join(&temp, &project_file),
        resaved_container: join(&temp, &format!("{stem}.{CONTAINER_EXTENSION}")),
        fused_project,
        final_output: join(&parent, &format!("{stem}.{FINAL_EXTENSION}")),
        summary: join(&parent, &format!("{file_name}{SUMMARY_SUFFIX}")),
        temp_dir,
        name: file_name,
        input,
    })
}
