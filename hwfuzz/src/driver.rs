//! Escalation driver: the campaign control loop.
//!
//! A campaign runs `trials_per_depth` trials at the current depth, each one
//! generate → produce → validate. When every trial at a depth passes, the
//! depth grows by `depth_increment` and the loop continues, either forever
//! or until `num_iterations` depth levels have passed. The first failing
//! trial halts the campaign and leaves its artifacts in place.
//!
//! ```ignore
//! let mut campaign = CampaignBuilder::new(config, model)
//!     .device(ProcessDevice::new("./testArrayOfQueue", timeout))
//!     .build()?;
//! let report = campaign.run().await?;
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::config::CampaignConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::generator::RequestGenerator;
use crate::producer::{ArtifactPaths, Device, TraceProducer};
use crate::report::{replay_command, CampaignOutcome, CampaignReport, FailureRecord};
use crate::rng::SimRandom;
use crate::validator::{ConsistencyChecker, QueueCheck, TraceValidator, Verdict, Violation};
use crate::workload::{Component, WorkloadModel};

/// Mutable progress of a running campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignState {
    /// Operation count of the scripts currently generated.
    pub depth: u64,
    /// 1-based trial index within the current depth.
    pub trial: u64,
    /// Trials passed since the campaign started.
    pub passes: u64,
    /// Seed of the most recent trial, kept so an aborted trial can be
    /// replayed.
    pub trial_seed: Option<u64>,
    pub log_dir: PathBuf,
}

/// Builder for a [`Campaign`].
pub struct CampaignBuilder {
    config: CampaignConfig,
    model: WorkloadModel,
    producer: Option<TraceProducer>,
    validator: TraceValidator,
}

impl CampaignBuilder {
    pub fn new(config: CampaignConfig, model: WorkloadModel) -> Self {
        let validator = TraceValidator::new(model.clone());
        Self {
            config,
            model,
            producer: None,
            validator,
        }
    }

    /// The device under test.
    pub fn device(mut self, device: impl Device + 'static) -> Self {
        let paths = ArtifactPaths::new(&self.config.log_dir, self.model.component());
        self.producer = Some(TraceProducer::new(device, paths));
        self
    }

    /// Consistency checker for memory campaigns.
    pub fn checker(
        mut self,
        checker: impl ConsistencyChecker + 'static,
        consistency_model: impl Into<String>,
    ) -> Self {
        self.validator = self.validator.checker(checker, consistency_model);
        self
    }

    pub fn queue_check(mut self, strategy: QueueCheck) -> Self {
        self.validator = self.validator.queue_check(strategy);
        self
    }

    /// Validate the configuration and draw per-campaign state.
    pub fn build(self) -> HarnessResult<Campaign> {
        self.config.validate()?;
        self.model.validate()?;

        let producer = self
            .producer
            .ok_or_else(|| HarnessError::Config("no device under test configured".into()))?;
        let component = self.model.component();
        if component == Component::Memory && !self.validator.has_checker() {
            return Err(HarnessError::Config(
                "memory campaigns need a consistency checker".into(),
            ));
        }

        let mut random = SimRandom::new(self.config.seed);
        let generator = RequestGenerator::new(self.model, &mut random);
        let state = CampaignState {
            depth: self.config.init_depth,
            trial: 0,
            passes: 0,
            trial_seed: None,
            log_dir: self.config.log_dir.clone(),
        };

        Ok(Campaign {
            config: self.config,
            component,
            generator,
            producer,
            validator: self.validator,
            random,
            state,
        })
    }
}

/// A configured campaign, ready to run.
pub struct Campaign {
    config: CampaignConfig,
    component: Component,
    generator: RequestGenerator,
    producer: TraceProducer,
    validator: TraceValidator,
    random: SimRandom,
    state: CampaignState,
}

impl Campaign {
    pub fn state(&self) -> &CampaignState {
        &self.state
    }

    pub fn generator(&self) -> &RequestGenerator {
        &self.generator
    }

    /// Run until a failure or the iteration cap.
    ///
    /// Returns `Err` only for setup, protocol and I/O problems; an invariant
    /// violation is a normal report with [`CampaignOutcome::Failed`].
    pub async fn run(&mut self) -> HarnessResult<CampaignReport> {
        self.clear_stale_failure()?;
        if let Some(trial_seed) = self.config.replay {
            return self.replay(trial_seed).await;
        }

        tracing::info!(
            component = %self.component,
            seed = self.config.seed,
            log_dir = %self.state.log_dir.display(),
            "starting campaign"
        );
        if let Some(plan) = self.generator.address_plan() {
            tracing::info!(mode = ?plan.mode(), "memory test mode");
        }

        let mut levels = 0;
        loop {
            if self.cap_reached(levels) {
                break;
            }

            let depth = self.state.depth;
            tracing::info!(depth, "Depth {depth}");
            for trial in 1..=self.config.trials_per_depth {
                self.state.trial = trial;
                let trial_seed = self.random.next_seed();
                match self.run_trial(trial_seed).await? {
                    Verdict::Pass => {
                        self.state.passes += 1;
                        tracing::info!(depth, trial, "trial passed");
                    }
                    Verdict::Fail(violation) => {
                        let record = self.record_failure(trial_seed, violation)?;
                        return Ok(self.report(levels, CampaignOutcome::Failed(record)));
                    }
                }
            }
            levels += 1;
            tracing::info!(depth, "OK, passed {} tests", self.config.trials_per_depth);

            if self.cap_reached(levels) {
                break;
            }
            self.state.depth += self.config.depth_increment;
        }

        Ok(self.report(levels, CampaignOutcome::Completed))
    }

    /// Run one trial at the current depth with the given seed.
    ///
    /// An error aborting the trial is logged with the trial's seed and
    /// depth before it is returned.
    pub async fn run_trial(&mut self, trial_seed: u64) -> HarnessResult<Verdict> {
        self.state.trial_seed = Some(trial_seed);
        let result = self.execute_trial(trial_seed).await;
        if let Err(err) = &result {
            tracing::error!(
                depth = self.state.depth,
                trial = self.state.trial,
                trial_seed,
                error = %err,
                "trial aborted, replay with: {}",
                replay_command(self.component, self.config.seed, self.state.depth, trial_seed)
            );
        }
        result
    }

    async fn execute_trial(&mut self, trial_seed: u64) -> HarnessResult<Verdict> {
        let script = self.generator.generate(self.state.depth, trial_seed);
        tracing::debug!(
            depth = self.state.depth,
            trial = self.state.trial,
            trial_seed,
            "generated request script"
        );

        let artifact = self.producer.produce(&script).await?;
        if artifact.timed_out {
            return Ok(Verdict::Fail(Violation::unattributed(format!(
                "device did not finish within {:?}",
                self.config.timeout
            ))));
        }
        if artifact.event_lines == 0 && script.expects_events() {
            return Err(HarnessError::EmptyTrace {
                path: artifact.path.display().to_string(),
            });
        }

        self.validator.validate(&artifact).await
    }

    async fn replay(&mut self, trial_seed: u64) -> HarnessResult<CampaignReport> {
        tracing::info!(depth = self.state.depth, trial_seed, "replaying single trial");
        self.state.trial = 1;
        let outcome = match self.run_trial(trial_seed).await? {
            Verdict::Pass => {
                self.state.passes += 1;
                CampaignOutcome::Completed
            }
            Verdict::Fail(violation) => {
                CampaignOutcome::Failed(self.record_failure(trial_seed, violation)?)
            }
        };
        Ok(self.report(0, outcome))
    }

    fn cap_reached(&self, levels: u64) -> bool {
        self.config.num_iterations.is_some_and(|cap| levels >= cap)
    }

    /// Remove a manifest left by an earlier campaign in the same directory.
    fn clear_stale_failure(&self) -> HarnessResult<()> {
        let failure = &self.producer.paths().failure;
        match fs::remove_file(failure) {
            Ok(()) => {
                tracing::debug!(path = %failure.display(), "removed stale failure manifest");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(HarnessError::Io(format!(
                "failed removing {}: {err}",
                failure.display()
            ))),
        }
    }

    fn record_failure(
        &self,
        trial_seed: u64,
        violation: Violation,
    ) -> HarnessResult<FailureRecord> {
        let paths = self.producer.paths();
        let record = FailureRecord {
            component: self.component,
            campaign_seed: self.config.seed,
            trial_seed,
            depth: self.state.depth,
            trial: self.state.trial,
            line: violation.line,
            reason: violation.reason,
            artifacts_dir: paths.dir.clone(),
            requests: paths.requests.clone(),
            trace: paths.trace.clone(),
        };

        let json = serde_json::to_string_pretty(&record)
            .map_err(|err| HarnessError::Io(format!("failed to serialize failure record: {err}")))?;
        fs::write(&paths.failure, json).map_err(|err| {
            HarnessError::Io(format!("failed writing {}: {err}", paths.failure.display()))
        })?;

        tracing::error!(
            depth = record.depth,
            trial = record.trial,
            trial_seed,
            line = ?record.line,
            reason = %record.reason,
            "Test failed. For details, see directory '{}/'",
            record.artifacts_dir.display()
        );
        Ok(record)
    }

    fn report(&self, levels: u64, outcome: CampaignOutcome) -> CampaignReport {
        CampaignReport {
            component: self.component,
            seed: self.config.seed,
            depth_levels_passed: levels,
            trials_passed: self.state.passes,
            last_depth: self.state.depth,
            outcome,
        }
    }
}
