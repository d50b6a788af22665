#[allow(dead_code)]
mod common;

use common::project_xml;
use lightsheet_core::error::PipelineError;
use lightsheet_core::metadata::{parse_project_metadata, read_project_metadata, DatasetMetadata};

#[test]
fn test_parse_counts_views() {
    let metadata = parse_project_metadata(&project_xml(3, 2, 5)).unwrap();
    assert_eq!(metadata, DatasetMetadata::new(3, 2, 5));
    assert_eq!(metadata.fused_volumes(), 15);
}

#[test]
fn test_missing_groupings_count_as_one() {
    let xml = "<SpimData><SequenceDescription><ViewSetups/></SequenceDescription></SpimData>";
    assert_eq!(
        parse_project_metadata(xml).unwrap(),
        DatasetMetadata::default()
    );
}

#[test]
fn test_zero_counts_clamped() {
    let metadata = DatasetMetadata::new(0, 0, 0);
    assert_eq!(metadata, DatasetMetadata::default());
    assert_eq!(metadata.fused_volumes(), 1);
}

#[test]
fn test_invalid_last_timepoint() {
    let xml = "<SpimData><Timepoints type=\"range\"><first>0</first><last>many</last></Timepoints></SpimData>";
    let err = parse_project_metadata(xml).unwrap_err();
    assert!(matches!(err, PipelineError::Metadata(_)));
}

#[test]
fn test_malformed_xml() {
    let err = parse_project_metadata("<SpimData><Timepoints>").unwrap_err();
    assert!(matches!(err, PipelineError::Metadata(_)));
}

#[test]
fn test_display_lists_counts() {
    assert_eq!(
        DatasetMetadata::new(2, 1, 4).to_string(),
        "2 channels, 1 illuminations and 4 timepoints"
    );
}

#[test]
fn test_read_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("sample.xml");
    std::fs::write(&path, project_xml(1, 2, 1)).unwrap();
    assert_eq!(
        read_project_metadata(&path).unwrap(),
        DatasetMetadata::new(1, 2, 1)
    );
    assert!(read_project_metadata(&dir.path().join("absent.xml")).is_err());
}
