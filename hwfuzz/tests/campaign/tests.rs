use std::fs;

use hwfuzz::{
    CampaignBuilder, CampaignOutcome, HarnessError, MailboxWorkload, MemoryWorkload, QueueCheck,
    QueueWorkload, WorkloadModel,
};

use super::devices::{FixedChecker, MailboxModel, MemoryEcho, QueueModel, Recording, Silent};
use super::small_config;

fn queue_model() -> WorkloadModel {
    WorkloadModel::ArrayOfQueue(QueueWorkload::default())
}

fn mailbox_model() -> WorkloadModel {
    WorkloadModel::Mailbox(MailboxWorkload::default())
}

#[tokio::test]
async fn test_fifo_queue_reaches_iteration_cap() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = small_config(dir.path());
    let mut campaign = CampaignBuilder::new(config, queue_model())
        .device(QueueModel::fifo())
        .build()
        .expect("build");

    let report = campaign.run().await.expect("run");

    assert!(report.is_success(), "{report}");
    assert_eq!(report.depth_levels_passed, 3);
    assert_eq!(report.trials_passed, 15);
    assert_eq!(report.last_depth, 80);
    assert!(!dir.path().join("log/failure.json").exists());
}

#[tokio::test]
async fn test_single_pass_accepts_fifo_queue() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut campaign = CampaignBuilder::new(small_config(dir.path()), queue_model())
        .device(QueueModel::fifo())
        .queue_check(QueueCheck::SinglePass)
        .build()
        .expect("build");

    assert!(campaign.run().await.expect("run").is_success());
}

#[tokio::test]
async fn test_depth_grows_only_after_full_level() {
    let dir = tempfile::tempdir().expect("tempdir");
    let device = Recording::new(QueueModel::fifo());
    let depths = device.depths.clone();
    let mut campaign = CampaignBuilder::new(small_config(dir.path()), queue_model())
        .device(device)
        .build()
        .expect("build");

    campaign.run().await.expect("run");

    let depths = depths.borrow();
    assert_eq!(depths.len(), 15);
    assert!(depths[..5].iter().all(|&d| d == 40));
    assert!(depths[5..10].iter().all(|&d| d == 60));
    assert!(depths[10..].iter().all(|&d| d == 80));
}

#[tokio::test]
async fn test_lifo_queue_halts_with_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = small_config(dir.path());
    config.num_iterations = None;
    let mut campaign = CampaignBuilder::new(config, queue_model())
        .device(QueueModel::lifo())
        .build()
        .expect("build");

    let report = campaign.run().await.expect("run");

    let record = report.failure().expect("lifo queue must fail");
    assert!(record.line.is_some());
    assert!(record.reason.contains("bad dequeue"), "{}", record.reason);
    assert!(record.requests.exists());
    assert!(record.trace.exists());
    assert_eq!(campaign.state().depth, record.depth);

    let manifest = fs::read_to_string(dir.path().join("log/failure.json")).expect("read");
    let manifest: serde_json::Value = serde_json::from_str(&manifest).expect("json");
    assert_eq!(manifest["trial_seed"], record.trial_seed);
    assert_eq!(manifest["component"], "array-of-queue");
    assert!(report.to_string().contains("For details, see directory"));
}

#[tokio::test]
async fn test_replay_reproduces_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = small_config(dir.path());
    config.num_iterations = None;
    let mut campaign = CampaignBuilder::new(config.clone(), queue_model())
        .device(QueueModel::lifo())
        .build()
        .expect("build");
    let report = campaign.run().await.expect("run");
    let original = report.failure().expect("failure").clone();
    let original_requests = fs::read(&original.requests).expect("requests");

    config.replay = Some(original.trial_seed);
    config.init_depth = original.depth;
    let mut replay = CampaignBuilder::new(config, queue_model())
        .device(QueueModel::lifo())
        .build()
        .expect("build");
    let replayed = replay.run().await.expect("replay");

    let record = replayed.failure().expect("replay must fail");
    assert_eq!(record.reason, original.reason);
    assert_eq!(record.line, original.line);
    assert_eq!(fs::read(&record.requests).expect("requests"), original_requests);
}

#[tokio::test]
async fn test_same_seed_same_failure() {
    let mut records = Vec::new();
    for _ in 0..2 {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = small_config(dir.path());
        config.num_iterations = None;
        let mut campaign = CampaignBuilder::new(config, queue_model())
            .device(QueueModel::lifo())
            .build()
            .expect("build");
        let report = campaign.run().await.expect("run");
        let mut record = report.failure().expect("failure").clone();
        record.artifacts_dir = Default::default();
        record.requests = Default::default();
        record.trace = Default::default();
        records.push(record);
    }
    assert_eq!(records[0], records[1]);
}

#[tokio::test]
async fn test_mailbox_snapshot_semantics() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut campaign = CampaignBuilder::new(small_config(dir.path()), mailbox_model())
        .device(MailboxModel::correct())
        .build()
        .expect("build");
    assert!(campaign.run().await.expect("run").is_success());

    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = small_config(dir.path());
    config.num_iterations = None;
    let mut campaign = CampaignBuilder::new(config, mailbox_model())
        .device(MailboxModel::late_delivery())
        .build()
        .expect("build");
    let report = campaign.run().await.expect("run");
    let record = report.failure().expect("late delivery must fail");
    assert!(record.reason.contains("bad receive"), "{}", record.reason);
}

#[tokio::test]
async fn test_memory_campaign_consults_checker() {
    let dir = tempfile::tempdir().expect("tempdir");
    let checker = FixedChecker::answering("OK");
    let calls = checker.calls.clone();
    let mut campaign = CampaignBuilder::new(
        small_config(dir.path()),
        WorkloadModel::Memory(MemoryWorkload::default()),
    )
    .device(MemoryEcho)
    .checker(checker, "wmo")
    .build()
    .expect("build");

    assert!(campaign.run().await.expect("run").is_success());
    assert_eq!(calls.borrow().len(), 15);
    assert!(calls.borrow().iter().all(|model| model == "wmo"));
    assert!(dir.path().join("log/trace.axe").exists());
}

#[tokio::test]
async fn test_memory_checker_rejection_fails_trial() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut campaign = CampaignBuilder::new(
        small_config(dir.path()),
        WorkloadModel::Memory(MemoryWorkload::default()),
    )
    .device(MemoryEcho)
    .checker(FixedChecker::answering("NO: load 3 saw stale value"), "wmo")
    .build()
    .expect("build");

    let report = campaign.run().await.expect("run");
    let record = report.failure().expect("failure");
    assert_eq!(record.depth, 40);
    assert_eq!(record.trial, 1);
    assert_eq!(record.line, None);
    assert!(record.reason.contains("stale value"));
}

#[tokio::test]
async fn test_empty_trace_is_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut campaign = CampaignBuilder::new(small_config(dir.path()), queue_model())
        .device(Silent)
        .build()
        .expect("build");

    let err = campaign.run().await.unwrap_err();
    assert!(matches!(err, HarnessError::EmptyTrace { .. }), "{err}");
}

#[tokio::test]
async fn test_aborted_trial_keeps_replayable_seed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = small_config(dir.path());
    let mut campaign = CampaignBuilder::new(config.clone(), queue_model())
        .device(Silent)
        .build()
        .expect("build");
    campaign.run().await.unwrap_err();

    let state = campaign.state();
    assert_eq!((state.depth, state.trial), (40, 1));
    let trial_seed = state.trial_seed.expect("seed of the aborted trial");
    let requests = fs::read(dir.path().join("log/reqs.txt")).expect("requests");

    config.replay = Some(trial_seed);
    let mut replay = CampaignBuilder::new(config, queue_model())
        .device(Silent)
        .build()
        .expect("build");
    let err = replay.run().await.unwrap_err();
    assert!(matches!(err, HarnessError::EmptyTrace { .. }), "{err}");
    assert_eq!(fs::read(dir.path().join("log/reqs.txt")).expect("requests"), requests);
}

#[tokio::test]
async fn test_passing_campaign_clears_stale_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manifest = dir.path().join("log/failure.json");

    let mut config = small_config(dir.path());
    config.num_iterations = None;
    let mut failing = CampaignBuilder::new(config, queue_model())
        .device(QueueModel::lifo())
        .build()
        .expect("build");
    assert!(!failing.run().await.expect("run").is_success());
    assert!(manifest.exists());

    let mut passing = CampaignBuilder::new(small_config(dir.path()), queue_model())
        .device(QueueModel::fifo())
        .build()
        .expect("build");
    assert!(passing.run().await.expect("run").is_success());
    assert!(!manifest.exists(), "manifest from the earlier campaign survived");
}

#[test]
fn test_build_requires_device_and_checker() {
    let dir = tempfile::tempdir().expect("tempdir");
    let Err(err) = CampaignBuilder::new(small_config(dir.path()), queue_model()).build() else {
        panic!("campaign without device must not build");
    };
    assert!(matches!(err, HarnessError::Config(_)));

    let Err(err) = CampaignBuilder::new(
        small_config(dir.path()),
        WorkloadModel::Memory(MemoryWorkload::default()),
    )
    .device(MemoryEcho)
    .build() else {
        panic!("memory campaign without checker must not build");
    };
    assert!(matches!(err, HarnessError::Config(_)));
}

#[test]
fn test_memory_plan_drawn_at_build() {
    let dir = tempfile::tempdir().expect("tempdir");
    let build = || {
        CampaignBuilder::new(
            small_config(dir.path()),
            WorkloadModel::Memory(MemoryWorkload::default()),
        )
        .device(MemoryEcho)
        .checker(FixedChecker::answering("OK"), "wmo")
        .build()
        .expect("build")
    };
    let (a, b) = (build(), build());
    let plan_a = a.generator().address_plan().expect("plan");
    let plan_b = b.generator().address_plan().expect("plan");
    assert_eq!(plan_a.mode(), plan_b.mode());
    assert_eq!(plan_a.addresses_for(0), plan_b.addresses_for(0));
}

#[cfg(unix)]
#[tokio::test]
async fn test_hung_device_fails_trial() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = small_config(dir.path());
    config.timeout = std::time::Duration::from_millis(300);
    let device = hwfuzz::ProcessDevice::new("sh", config.timeout)
        .with_args(["-c", "echo 'I 0 5'; echo stuck >&2; sleep 10"]);
    let mut campaign = CampaignBuilder::new(config, queue_model())
        .device(device)
        .build()
        .expect("build");

    let report = campaign.run().await.expect("run");
    let record = report.failure().expect("timeout must fail");
    assert!(record.reason.contains("did not finish"), "{}", record.reason);
    assert_eq!(report.outcome, CampaignOutcome::Failed(record.clone()));

    // Output printed before the kill stays inspectable.
    assert_eq!(fs::read_to_string(&record.trace).expect("trace"), "I 0 5\n");
    let stderr = fs::read_to_string(dir.path().join("log/dut.stderr")).expect("stderr");
    assert_eq!(stderr, "stuck\n");
}
