use lightsheet_core::artifacts::{
    cleanup_temp, ensure_dir, promote_project, stage_project, CleanupOutcome,
};

#[test]
fn test_ensure_dir_is_idempotent() {
    let root = tempfile::TempDir::new().unwrap();
    let dir = root.path().join("a").join("b");
    ensure_dir(&dir).unwrap();
    ensure_dir(&dir).unwrap();
    assert!(dir.is_dir());
}

#[test]
fn test_stage_copies_into_temp() {
    let root = tempfile::TempDir::new().unwrap();
    let project = root.path().join("sample.xml");
    std::fs::write(&project, "<SpimData/>").unwrap();
    let temp = root.path().join("sample.czi_temp");

    let staged = stage_project(&project, &temp).unwrap();
    assert_eq!(staged, temp.join("sample.xml"));
    assert_eq!(std::fs::read_to_string(&staged).unwrap(), "<SpimData/>");
    assert!(project.is_file());

    // Restaging overwrites the copy.
    std::fs::write(&project, "<SpimData version=\"2\"/>").unwrap();
    let staged = stage_project(&project, &temp).unwrap();
    assert_eq!(
        std::fs::read_to_string(&staged).unwrap(),
        "<SpimData version=\"2\"/>"
    );
}

#[test]
fn test_promote_creates_destination_dir() {
    let root = tempfile::TempDir::new().unwrap();
    let project = root.path().join("sample.xml");
    std::fs::write(&project, "<SpimData/>").unwrap();
    let destination = root.path().join("sample.czi_fused").join("sample_fused.xml");

    promote_project(&project, &destination).unwrap();
    assert!(destination.is_file());
}

#[test]
fn test_stage_missing_project_fails() {
    let root = tempfile::TempDir::new().unwrap();
    let result = stage_project(&root.path().join("absent.xml"), &root.path().join("tmp"));
    assert!(result.is_err());
}

#[test]
fn test_cleanup_twice_does_not_fail() {
    let root = tempfile::TempDir::new().unwrap();
    let temp = root.path().join("sample.czi_temp");
    std::fs::create_dir_all(temp.join("nested")).unwrap();
    std::fs::write(temp.join("nested").join("sample.h5"), b"data").unwrap();

    assert_eq!(cleanup_temp(&temp), CleanupOutcome::Removed);
    assert!(!temp.exists());
    assert_eq!(cleanup_temp(&temp), CleanupOutcome::AlreadyAbsent);
}
