use std::cmp::Ordering;
use std::path::PathBuf;

use glob::{glob, Pattern};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::DEFAULT_CONVERTER_FORMAT;
use crate::error::{PipelineError, Result};
use crate::paths::normalize_separators;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Install-folder prefixes; a folder named `<prefix><version>` is an
    /// installation. Hits under later prefixes win over earlier ones, so list
    /// converter-only installs before full application installs.
    pub search_prefixes: Vec<String>,
    /// Converter executable inside the install folder.
    pub executable: String,
    /// Output format tag passed to the converter.
    pub output_format: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        let search_prefixes = if cfg!(windows) {
            vec![
                "C:/Program Files/Bitplane/ImarisFileConverter ".to_string(),
                "C:/Program Files/Bitplane/Imaris ".to_string(),
            ]
        } else {
            Vec::new()
        };
        Self {
            search_prefixes,
            executable: "ImarisConvert.exe".into(),
            output_format: DEFAULT_CONVERTER_FORMAT.into(),
        }
    }
}

impl ConverterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.executable.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "converter.executable must not be empty".into(),
            ));
        }
        if self.output_format.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "converter.output_format must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// A discovered converter installation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConverterInstall {
    pub dir: PathBuf,
    pub version: Vec<u32>,
    /// Index of the search prefix that matched; higher wins.
    pub rank: usize,
}

impl ConverterInstall {
    pub fn executable(&self, config: &ConverterConfig) -> PathBuf {
        self.dir.join(&config.executable)
    }

    pub fn version_string(&self) -> String {
        self.version
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    fn precedence(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.version.cmp(&other.version))
    }
}

/// Parse a dotted version such as `9.7.2`. Non-numeric segments reject the
/// folder.
pub fn parse_version(raw: &str) -> Option<Vec<u32>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.split('.').map(|part| part.parse().ok()).collect()
}

fn scan_prefix(prefix: &str, rank: usize) -> Vec<ConverterInstall> {
    let prefix = normalize_separators(prefix);
    let name_prefix = prefix.rsplit('/').next().unwrap_or_default();
    let pattern = format!("{}*", Pattern::escape(&prefix));
    let Ok(paths) = glob(&pattern) else {
        return Vec::new();
    };
    paths
        .flatten()
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            let version = parse_version(name.strip_prefix(name_prefix)?)?;
            Some(ConverterInstall {
                dir: path,
                version,
                rank,
            })
        })
        .collect()
}

/// Find the preferred converter installation, if any.
///
/// Within one prefix the highest version wins; across prefixes the later
/// prefix wins.
pub fn locate_converter(config: &ConverterConfig) -> Option<ConverterInstall> {
    let best = config
        .search_prefixes
        .iter()
        .enumerate()
        .flat_map(|(rank, prefix)| {
            let hits = scan_prefix(prefix, rank);
            debug!(prefix = %prefix, hits = hits.len(), "Probed converter prefix");
            hits
        })
        .max_by(|a, b| a.precedence(b));

    match &best {
        Some(install) => info!(
            dir = %install.dir.display(),
            version = %install.version_string(),
            "Found converter installation"
        ),
        None => info!("No converter installation found"),
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_numeric_segments() {
        assert_eq!(parse_version("9.7.2"), Some(vec![9, 7, 2]));
        assert_eq!(parse_version("10"), Some(vec![10]));
        assert_eq!(parse_version("9.x"), None);
        assert_eq!(parse_version(""), None);
    }

    #[test]
    fn test_version_order_is_numeric() {
        assert!(parse_version("10.0.0") > parse_version("9.9.9"));
    }
}
