//! # Workflow Session
//!
//! [`TaxWorkflow`] is the single mutator of one filing's workflow. It owns
//! the [`WorkflowController`], runs stages through the [`StageExecutor`],
//! commits successful results, and reports every outcome to the display.
//!
//! Controller transitions are synchronous and happen between awaits; the
//! executor only ever sees a copy of the filing, so a stage that fails or
//! is abandoned leaves the session exactly as it was.

use std::collections::BTreeMap;
use std::sync::Arc;

use spvtax_core::{InvestorId, RunId, SpvId};
use spvtax_state::{
    ApprovalChecks, Filing, RequirementGap, Stage, WorkflowController, WorkflowError, WorkflowPhase,
};

use crate::display::{DisplaySink, StageOutcome};
use crate::error::EngineError;
use crate::executor::StageExecutor;
use crate::operation::{EntitySource, EntitySummary, StageOperation};
use crate::progress::{DeliveryStatus, ProgressEvent, ProgressReporter};

/// What a committed stage produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// Executor run id.
    pub run_id: RunId,
    /// Stage that committed.
    pub stage: Stage,
    /// Workflow phase after the commit.
    pub phase: WorkflowPhase,
    /// Per-investor delivery results, if the stage delivered.
    pub deliveries: BTreeMap<InvestorId, DeliveryStatus>,
}

/// One workflow instance.
pub struct TaxWorkflow {
    controller: WorkflowController,
    executor: StageExecutor,
    source: Arc<dyn EntitySource>,
    display: Arc<dyn DisplaySink>,
    progress: ProgressReporter,
}

impl TaxWorkflow {
    /// A workflow with no filing loaded.
    pub fn new(
        executor: StageExecutor,
        source: Arc<dyn EntitySource>,
        display: Arc<dyn DisplaySink>,
    ) -> Self {
        Self {
            controller: WorkflowController::new(),
            executor,
            source,
            progress: ProgressReporter::new(Arc::clone(&display)),
            display,
        }
    }

    /// Read access to the controller.
    pub fn controller(&self) -> &WorkflowController {
        &self.controller
    }

    /// The executor stages run on.
    pub fn executor(&self) -> &StageExecutor {
        &self.executor
    }

    /// The committed filing, if one is loaded.
    pub fn filing(&self) -> Option<&Filing> {
        self.controller.filing()
    }

    /// Current phase.
    pub fn phase(&self) -> WorkflowPhase {
        self.controller.phase()
    }

    /// SPVs available for selection.
    pub async fn list_entities(&self) -> Result<Vec<EntitySummary>, EngineError> {
        self.source
            .list_candidate_entities()
            .await
            .map_err(|e| EngineError::from_operation(Stage::DataCollection, e))
    }

    /// Load `spv` and complete data collection.
    ///
    /// Selecting an SPV always starts over: any filing already loaded is
    /// discarded together with every completion flag.
    pub async fn collect(&mut self, spv: &SpvId) -> Result<WorkflowPhase, EngineError> {
        let stage = Stage::DataCollection;
        self.progress.begin(stage);
        let result = self.try_collect(spv).await;
        match &result {
            Ok(phase) => {
                self.progress.record(ProgressEvent::Finished);
                self.report_success(stage, None, *phase);
            }
            Err(e) => self.report_failure(stage, e),
        }
        result
    }

    async fn try_collect(&mut self, spv: &SpvId) -> Result<WorkflowPhase, EngineError> {
        let filing = self
            .source
            .load_entity_details(spv)
            .await
            .map_err(|e| EngineError::from_operation(Stage::DataCollection, e))?;
        tracing::info!(
            filing = %filing.spv_id,
            investors = filing.investors.len(),
            forms = filing.tax_forms.len(),
            "filing loaded"
        );
        self.controller.load_filing(filing);
        Ok(self.controller.complete_stage(Stage::DataCollection)?)
    }

    /// Run `stage` and commit its result.
    pub async fn run_stage(
        &mut self,
        stage: Stage,
        operation: &dyn StageOperation,
    ) -> Result<StageReport, EngineError> {
        let result = self.try_run_stage(stage, operation).await;
        match &result {
            Ok(report) => self.report_success(stage, Some(report.run_id), report.phase),
            Err(e) => self.report_failure(stage, e),
        }
        result
    }

    async fn try_run_stage(
        &mut self,
        stage: Stage,
        operation: &dyn StageOperation,
    ) -> Result<StageReport, EngineError> {
        self.controller.ensure_runnable(stage)?;
        let filing = self
            .controller
            .filing()
            .cloned()
            .ok_or(WorkflowError::StageIncomplete {
                stage: Stage::DataCollection,
                gap: RequirementGap::NoFiling,
            })?;

        let run = self
            .executor
            .run_stage(stage, &filing, operation, &mut self.progress)
            .await?;
        let phase = self.controller.commit_stage(stage, run.filing)?;
        Ok(StageReport {
            run_id: run.run_id,
            stage,
            phase,
            deliveries: run.deliveries,
        })
    }

    /// Run the approval stage after checking `checks`.
    ///
    /// Unconfirmed checks fail the stage before `operation` is invoked.
    pub async fn approve(
        &mut self,
        checks: ApprovalChecks,
        operation: &dyn StageOperation,
    ) -> Result<StageReport, EngineError> {
        let stage = Stage::Approval;
        if let Err(e) = self.controller.ensure_runnable(stage).and_then(|()| checks.validate()) {
            let err = EngineError::from(e);
            self.report_failure(stage, &err);
            return Err(err);
        }
        self.run_stage(stage, operation).await
    }

    /// Mark `stage` complete against the committed filing, without running
    /// an operation.
    pub fn complete_stage(&mut self, stage: Stage) -> Result<WorkflowPhase, EngineError> {
        Ok(self.controller.complete_stage(stage)?)
    }

    /// Navigate to `stage`.
    pub fn view(&mut self, stage: Stage) -> Result<Stage, EngineError> {
        Ok(self.controller.request_stage_view(stage)?)
    }

    /// Navigate forward one stage.
    pub fn advance(&mut self) -> Result<Stage, EngineError> {
        Ok(self.controller.advance()?)
    }

    /// Navigate back one stage.
    pub fn retreat(&mut self) -> Result<Stage, EngineError> {
        Ok(self.controller.retreat()?)
    }

    /// Discard the filing and every flag.
    pub fn restart(&mut self) {
        tracing::info!("workflow restarted");
        self.controller.restart();
    }

    fn report_success(&self, stage: Stage, run_id: Option<RunId>, phase: WorkflowPhase) {
        self.display.outcome(&StageOutcome::Succeeded {
            stage,
            run_id,
            phase,
        });
    }

    fn report_failure(&self, stage: Stage, err: &EngineError) {
        self.display.outcome(&StageOutcome::Failed {
            stage,
            kind: err.kind(),
            message: err.user_message(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::InstantClock;
    use crate::config::EngineConfig;
    use crate::display::RecordingDisplay;
    use crate::error::ErrorKind;
    use crate::mock::{MockApproval, MockEntitySource, MockProcessing};
    use spvtax_state::FormStatus;

    fn workflow() -> (TaxWorkflow, Arc<RecordingDisplay>, Arc<InstantClock>) {
        let clock = Arc::new(InstantClock::new());
        let display = Arc::new(RecordingDisplay::default());
        let executor = StageExecutor::with_clock(&EngineConfig::default(), clock.clone());
        let source = Arc::new(MockEntitySource::with_investors(clock.clone(), 2));
        (
            TaxWorkflow::new(executor, source, display.clone()),
            display,
            clock,
        )
    }

    fn spv(id: &str) -> SpvId {
        SpvId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_collect_unknown_spv_reports_failure() {
        let (mut wf, display, _) = workflow();
        let err = wf.collect(&spv("spv-404")).await.unwrap_err();
        assert!(matches!(err, EngineError::EntityNotFound(ref id) if id == "spv-404"));
        assert!(wf.filing().is_none());
        let outcomes = display.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].is_success());
    }

    #[tokio::test]
    async fn test_collect_completes_data_collection() {
        let (mut wf, display, _) = workflow();
        let phase = wf.collect(&spv("spv-003")).await.unwrap();
        assert_eq!(phase, WorkflowPhase::AwaitingStage(Stage::DataProcessing));
        assert_eq!(
            wf.filing().map(|f| f.entity_name.as_str()),
            Some("Real Estate Opportunity Fund")
        );
        assert!(display.outcomes()[0].is_success());
    }

    #[tokio::test]
    async fn test_selecting_another_spv_starts_over() {
        let (mut wf, _, clock) = workflow();
        wf.collect(&spv("spv-001")).await.unwrap();
        wf.run_stage(Stage::DataProcessing, &MockProcessing::new(clock))
            .await
            .unwrap();
        wf.collect(&spv("spv-002")).await.unwrap();
        assert_eq!(
            wf.controller().state().completion_flags(),
            [true, false, false, false, false, false]
        );
        assert!(wf
            .filing()
            .unwrap()
            .tax_forms
            .iter()
            .all(|f| f.status == FormStatus::Pending));
    }

    #[tokio::test]
    async fn test_locked_stage_is_reported_and_not_run() {
        let (mut wf, display, clock) = workflow();
        wf.collect(&spv("spv-001")).await.unwrap();
        let op = crate::mock::FailOnce::new(MockProcessing::new(clock));
        let err = wf.run_stage(Stage::FileGeneration, &op).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StageLocked);
        assert_eq!(op.calls(), 0);
        let last = display.outcomes().pop().unwrap();
        assert_eq!(
            last,
            StageOutcome::Failed {
                stage: Stage::FileGeneration,
                kind: ErrorKind::StageLocked,
                message: "Please complete the current step first.".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_approve_out_of_turn_is_locked() {
        let (mut wf, _, clock) = workflow();
        wf.collect(&spv("spv-001")).await.unwrap();
        let err = wf
            .approve(
                ApprovalChecks::all_confirmed(),
                &MockApproval::new(clock, ApprovalChecks::all_confirmed()),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StageLocked);
    }

    #[tokio::test]
    async fn test_navigation_delegates_to_controller() {
        let (mut wf, _, _) = workflow();
        wf.collect(&spv("spv-001")).await.unwrap();
        assert_eq!(wf.advance().unwrap(), Stage::DataProcessing);
        assert_eq!(wf.advance().unwrap_err().kind(), ErrorKind::StageLocked);
        assert_eq!(wf.retreat().unwrap(), Stage::DataCollection);
        assert_eq!(wf.view(Stage::DataProcessing).unwrap(), Stage::DataProcessing);
        wf.restart();
        assert!(wf.filing().is_none());
    }
}
