use lightsheet_core::metadata::DatasetMetadata;
use lightsheet_core::pipeline::{decide_fusion, FusionPlan, PolicyConfirmation};
use lightsheet_core::resources::{
    FusionOutput, FusionStrategy, ResourcePlanner, ResourcePolicy, ResourceTier, SlowFusionPolicy,
};

const GB: u64 = 1024 * 1024 * 1024;

fn planner() -> ResourcePlanner {
    ResourcePlanner::new(ResourcePolicy::default())
}

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

#[test]
fn test_ample_memory_is_in_memory() {
    let e = planner().estimate(10 * GB, &DatasetMetadata::default(), 1, 64 * GB);
    assert_eq!(e.tier, ResourceTier::InMemory);
    assert_eq!(e.strategy, FusionStrategy::InMemory);
    assert!(e.fusion_permitted);
}

#[test]
fn test_many_volumes_fit_disk_backed() {
    let metadata = DatasetMetadata::new(2, 2, 4);
    let e = planner().estimate(10 * GB, &metadata, 1, 40 * GB);
    assert_eq!(e.tier, ResourceTier::DiskBacked);
    assert_eq!(e.strategy, FusionStrategy::Virtual);
    assert_eq!(e.working_set_bytes, 10 * GB / 4);
    assert!(e.fusion_permitted);
}

#[test]
fn test_too_little_memory_is_insufficient() {
    let e = planner().estimate(10 * GB, &DatasetMetadata::default(), 1, GB);
    assert_eq!(e.tier, ResourceTier::Insufficient);
    assert!(!e.fusion_permitted);
}

#[test]
fn test_disk_backed_strategy_follows_policy() {
    let policy = ResourcePolicy {
        disk_backed_strategy: FusionStrategy::Cached,
        ..ResourcePolicy::default()
    };
    let e = ResourcePlanner::new(policy).estimate(10 * GB, &DatasetMetadata::new(2, 1, 4), 1, 40 * GB);
    assert_eq!(e.strategy, FusionStrategy::Cached);
}

#[test]
fn test_zero_artifact_size_is_in_memory() {
    let e = planner().estimate(0, &DatasetMetadata::default(), 1, GB);
    assert_eq!(e.tier, ResourceTier::InMemory);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn test_more_free_memory_never_less_permissive() {
    let p = planner();
    let metadata = DatasetMetadata::new(2, 2, 3);
    let mut previous = ResourceTier::Insufficient;
    for free_gb in 0..200 {
        let tier = p.estimate(20 * GB, &metadata, 1, free_gb * GB).tier;
        assert!(tier >= previous, "tier dropped at {free_gb} GB");
        previous = tier;
    }
    assert_eq!(previous, ResourceTier::InMemory);
}

#[test]
fn test_more_downsampling_never_grows_working_set() {
    let p = planner();
    let metadata = DatasetMetadata::new(1, 2, 2);
    let mut previous = u64::MAX;
    for ds in 1..=16 {
        let ws = p.estimate(30 * GB, &metadata, ds, 8 * GB).working_set_bytes;
        assert!(ws <= previous, "working set grew at downsampling {ds}");
        previous = ws;
    }
}

#[test]
fn test_downsampling_zero_treated_as_one() {
    let p = planner();
    let metadata = DatasetMetadata::default();
    assert_eq!(
        p.estimate(GB, &metadata, 0, 8 * GB),
        p.estimate(GB, &metadata, 1, 8 * GB)
    );
}

#[test]
fn test_non_interactive_never_fuses_when_insufficient() {
    let e = planner().estimate(50 * GB, &DatasetMetadata::default(), 1, GB);
    assert!(!e.fusion_permitted);
    let confirmation = PolicyConfirmation::new(SlowFusionPolicy::Ask);
    assert_eq!(decide_fusion(&e, &confirmation), FusionPlan::Skip);
}

#[test]
fn test_accept_policy_takes_slow_path() {
    let e = planner().estimate(50 * GB, &DatasetMetadata::default(), 1, GB);
    let confirmation = PolicyConfirmation::new(SlowFusionPolicy::Accept);
    assert_eq!(
        decide_fusion(&e, &confirmation),
        FusionPlan::Fuse {
            strategy: FusionStrategy::Virtual,
            output: FusionOutput::Container,
        }
    );
}

#[test]
fn test_refuse_policy_skips() {
    let e = planner().estimate(50 * GB, &DatasetMetadata::default(), 1, GB);
    let confirmation = PolicyConfirmation::new(SlowFusionPolicy::Refuse);
    assert_eq!(decide_fusion(&e, &confirmation), FusionPlan::Skip);
}

// ---------------------------------------------------------------------------
// Artifact size and policy validation
// ---------------------------------------------------------------------------

#[test]
fn test_artifact_size_prefers_container() {
    let dir = tempfile::TempDir::new().unwrap();
    let raw = dir.path().join("sample.czi");
    let container = dir.path().join("sample.h5");
    std::fs::File::create(&raw).unwrap().set_len(1000).unwrap();

    assert_eq!(planner().artifact_bytes(&container, &raw).unwrap(), 500);

    std::fs::File::create(&container).unwrap().set_len(700).unwrap();
    assert_eq!(planner().artifact_bytes(&container, &raw).unwrap(), 700);
}

#[test]
fn test_artifact_size_missing_input_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = planner().artifact_bytes(&dir.path().join("a.h5"), &dir.path().join("a.czi"));
    assert!(result.is_err());
}

#[test]
fn test_policy_rejects_non_positive_factors() {
    let policy = ResourcePolicy {
        margin_divisor: 0.0,
        ..ResourcePolicy::default()
    };
    assert!(policy.validate().is_err());
    let policy = ResourcePolicy {
        in_memory_multiplier: f64::NAN,
        ..ResourcePolicy::default()
    };
    assert!(policy.validate().is_err());
}

#[test]
fn test_policy_rejects_in_memory_disk_strategy() {
    let policy = ResourcePolicy {
        disk_backed_strategy: FusionStrategy::InMemory,
        ..ResourcePolicy::default()
    };
    assert!(policy.validate().is_err());
}

#[test]
fn test_free_memory_override() {
    let policy = ResourcePolicy {
        free_memory_override: Some(42),
        ..ResourcePolicy::default()
    };
    assert_eq!(policy.free_memory(), 42);
}
