//! # Stage Executor
//!
//! Runs one stage against a copy of the filing:
//!
//! 1. claim the filing's in-flight slot (a second concurrent run fails fast
//!    with [`EngineError::StageAlreadyRunning`]);
//! 2. walk the stage's simulated sub-steps, waiting on the [`Clock`] and
//!    emitting cumulative progress;
//! 3. for per-investor stages, deliver to each investor in order, tracking
//!    `pending → sending → sent | error`;
//! 4. invoke the stage operation and validate its result as a successor of
//!    the input filing.
//!
//! The caller's filing is never mutated. A failure at any step returns an
//! error and the caller keeps its filing as it was; a success returns the
//! successor in a [`StageRun`] for the workflow controller to commit.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use spvtax_core::{InvestorId, RunId, SpvId};
use spvtax_state::{Filing, Stage, SuccessorError};
use tracing::Instrument;

use crate::clock::{Clock, InstantClock, TokioClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::operation::StageOperation;
use crate::plan::StagePlan;
use crate::progress::{percent_of, DeliveryStatus, ProgressEvent, ProgressReporter};

/// The result of a successful run, not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRun {
    /// Identifies this run in logs.
    pub run_id: RunId,
    /// Stage that ran.
    pub stage: Stage,
    /// Successor filing produced by the operation.
    pub filing: Filing,
    /// Final delivery state per investor; empty for stages without
    /// per-investor delivery.
    pub deliveries: BTreeMap<InvestorId, DeliveryStatus>,
}

/// Executes stages, at most one at a time per filing.
#[derive(Debug)]
pub struct StageExecutor {
    clock: Arc<dyn Clock>,
    step_unit: Duration,
    delivery_delay: Duration,
    in_flight: Mutex<HashSet<SpvId>>,
}

/// Releases the in-flight slot on drop, including on early return.
struct InFlight<'a> {
    slots: &'a Mutex<HashSet<SpvId>>,
    spv: SpvId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.slots.lock().remove(&self.spv);
    }
}

impl StageExecutor {
    /// An executor using the clock `config` asks for.
    pub fn new(config: &EngineConfig) -> Self {
        let clock: Arc<dyn Clock> = if config.instant {
            Arc::new(InstantClock::new())
        } else {
            Arc::new(TokioClock)
        };
        Self::with_clock(config, clock)
    }

    /// An executor waiting on `clock`.
    pub fn with_clock(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            step_unit: config.step_unit(),
            delivery_delay: config.delivery_delay(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Whether a run is in flight for `spv`.
    pub fn is_running(&self, spv: &SpvId) -> bool {
        self.in_flight.lock().contains(spv)
    }

    fn claim(&self, spv: &SpvId) -> Result<InFlight<'_>, EngineError> {
        let mut slots = self.in_flight.lock();
        if !slots.insert(spv.clone()) {
            return Err(EngineError::StageAlreadyRunning { spv: spv.clone() });
        }
        Ok(InFlight {
            slots: &self.in_flight,
            spv: spv.clone(),
        })
    }

    /// Run `stage` on a copy of `filing`.
    pub async fn run_stage(
        &self,
        stage: Stage,
        filing: &Filing,
        operation: &dyn StageOperation,
        progress: &mut ProgressReporter,
    ) -> Result<StageRun, EngineError> {
        let _slot = self.claim(&filing.spv_id)?;
        let run_id = RunId::new();
        let span = tracing::info_span!(
            "stage_run",
            run = %run_id,
            stage = %stage,
            filing = %filing.spv_id,
            operation = operation.name(),
        );

        let result = self
            .execute(run_id, stage, filing, operation, progress)
            .instrument(span.clone())
            .await;

        span.in_scope(|| match &result {
            Ok(_) => tracing::info!("stage run succeeded"),
            Err(e) => tracing::warn!(error = %e, "stage run failed"),
        });
        result
    }

    async fn execute(
        &self,
        run_id: RunId,
        stage: Stage,
        filing: &Filing,
        operation: &dyn StageOperation,
        progress: &mut ProgressReporter,
    ) -> Result<StageRun, EngineError> {
        let plan = StagePlan::for_stage(stage);
        progress.begin(stage);
        tracing::debug!(substeps = plan.substeps.len(), "stage run started");

        self.run_substeps(&plan, progress).await;

        let deliveries = if plan.per_investor {
            self.deliver_all(stage, filing, operation, progress).await?
        } else {
            BTreeMap::new()
        };

        let next = operation
            .execute(filing.clone())
            .await
            .map_err(|e| EngineError::from_operation(stage, e))?;

        filing.check_successor(&next).map_err(|e| match e {
            SuccessorError::Regression(status) => EngineError::Status(status),
            other => EngineError::OperationFailed {
                stage,
                reason: other.to_string(),
            },
        })?;

        progress.record(ProgressEvent::Finished);
        Ok(StageRun {
            run_id,
            stage,
            filing: next,
            deliveries,
        })
    }

    async fn run_substeps(&self, plan: &StagePlan, progress: &mut ProgressReporter) {
        let total = plan.total_units();
        let mut done = 0u64;
        for step in plan.substeps {
            progress.record(ProgressEvent::Phase {
                label: step.name.to_string(),
                percent: percent_of(done, total),
            });
            tracing::debug!(substep = step.name, units = step.units, "substep");
            self.clock.sleep(self.step_unit * step.units).await;
            done += u64::from(step.units);
            let update = progress.record(ProgressEvent::Phase {
                label: step.name.to_string(),
                percent: percent_of(done, total),
            });
            tracing::trace!(percent = update.percent, "substep finished");
        }
    }

    async fn deliver_all(
        &self,
        stage: Stage,
        filing: &Filing,
        operation: &dyn StageOperation,
        progress: &mut ProgressReporter,
    ) -> Result<BTreeMap<InvestorId, DeliveryStatus>, EngineError> {
        let mut statuses: BTreeMap<InvestorId, DeliveryStatus> = filing
            .investors
            .iter()
            .map(|i| (i.id.clone(), DeliveryStatus::Pending))
            .collect();
        let total = statuses.len() as u64;

        if total == 0 {
            progress.record(ProgressEvent::Phase {
                label: "No investors to notify".to_string(),
                percent: 100,
            });
            return Ok(statuses);
        }

        let mut settled = 0u64;
        let mut failed = Vec::new();
        for investor in &filing.investors {
            statuses.insert(investor.id.clone(), DeliveryStatus::Sending);
            progress.record(ProgressEvent::Delivery {
                investor: investor.id.clone(),
                status: DeliveryStatus::Sending,
                percent: percent_of(settled, total),
            });

            self.clock.sleep(self.delivery_delay).await;
            let status = match operation.deliver(filing, investor).await {
                Ok(()) => DeliveryStatus::Sent,
                Err(e) => {
                    tracing::warn!(investor = %investor.id, error = %e, "delivery failed");
                    failed.push(investor.id.to_string());
                    DeliveryStatus::Error
                }
            };
            settled += 1;
            statuses.insert(investor.id.clone(), status);
            progress.record(ProgressEvent::Delivery {
                investor: investor.id.clone(),
                status,
                percent: percent_of(settled, total),
            });
        }

        if failed.is_empty() {
            Ok(statuses)
        } else {
            Err(EngineError::OperationFailed {
                stage,
                reason: format!("delivery failed for {}", failed.join(", ")),
            })
        }
    }
}
