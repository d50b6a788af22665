use std::fmt;
use std::path::Path;

use roxmltree::{Document, Node};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Dataset cardinalities read back from the project description.
///
/// Counts are never zero: missing or empty groupings count as one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DatasetMetadata {
    pub channels: u32,
    pub illuminations: u32,
    pub timepoints: u32,
}

impl Default for DatasetMetadata {
    fn default() -> Self {
        Self {
            channels: 1,
            illuminations: 1,
            timepoints: 1,
        }
    }
}

impl DatasetMetadata {
    /// Build from raw counts, clamping zero to one.
    pub fn new(channels: u32, illuminations: u32, timepoints: u32) -> Self {
        Self {
            channels: channels.max(1),
            illuminations: illuminations.max(1),
            timepoints: timepoints.max(1),
        }
    }

    /// Number of fused volumes, one per timepoint and channel.
    pub fn fused_volumes(&self) -> u64 {
        u64::from(self.timepoints) * u64::from(self.channels)
    }
}

impl fmt::Display for DatasetMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} channels, {} illuminations and {} timepoints",
            self.channels, self.illuminations, self.timepoints
        )
    }
}

fn is_element(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn count_descendants(node: &Node, name: &str) -> u32 {
    node.descendants().filter(|n| is_element(n, name)).count() as u32
}

/// Parse channel, illumination and timepoint counts from project XML.
///
/// Channels and illuminations come from the `Attributes` groupings named
/// `channel` and `illumination`; timepoints from `Timepoints/last` + 1.
pub fn parse_project_metadata(xml: &str) -> Result<DatasetMetadata> {
    let doc = Document::parse(xml)
        .map_err(|e| PipelineError::Metadata(format!("XML parse error: {e}")))?;

    let mut channels = 0;
    let mut illuminations = 0;
    for group in doc.descendants().filter(|n| is_element(n, "Attributes")) {
        match group.attribute("name") {
            Some("channel") => channels = count_descendants(&group, "Channel"),
            Some("illumination") => illuminations = count_descendants(&group, "Illumination"),
            _ => {}
        }
    }

    let last_timepoint = doc
        .descendants()
        .find(|n| is_element(n, "Timepoints"))
        .and_then(|tp| tp.descendants().find(|n| is_element(n, "last")))
        .and_then(|last| last.text())
        .map(|text| {
            text.trim().parse::<u32>().map_err(|e| {
                PipelineError::Metadata(format!("invalid last timepoint {text:?}: {e}"))
            })
        })
        .transpose()?;
    let timepoints = last_timepoint.map_or(0, |last| last.saturating_add(1));

    debug!(channels, illuminations, timepoints, "Parsed project metadata");
    Ok(DatasetMetadata::new(channels, illuminations, timepoints))
}

/// Read and parse a project description file.
pub fn read_project_metadata(path: &Path) -> Result<DatasetMetadata> {
    let xml = std::fs::read_to_string(path)?;
    parse_project_metadata(&xml)
}
