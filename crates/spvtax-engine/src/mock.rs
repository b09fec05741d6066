//! # Mock Collaborators
//!
//! In-memory stand-ins for the entity source and every stage operation.
//! Each waits a fixed simulated latency on the injected [`Clock`] and then
//! applies the status changes its stage requires, so a filing can be
//! driven end to end without any external system.
//!
//! [`FailOnce`] wraps any operation and rejects its first invocation, which
//! is how retries are exercised.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use spvtax_core::{FormId, InvestorId, SpvId, TaxYear};
use spvtax_state::{
    ApprovalChecks, Filing, FormKind, FormStatus, Investor, InvestorStatus, TaxForm,
    WorkflowError,
};

use crate::clock::Clock;
use crate::error::OperationError;
use crate::operation::{EntitySource, EntitySummary, StageOperation};

// ─── Latencies ───────────────────────────────────────────────────────

const LIST_LATENCY: Duration = Duration::from_millis(800);
const DETAILS_LATENCY: Duration = Duration::from_millis(1000);
const PROCESS_LATENCY: Duration = Duration::from_millis(1500);
const GENERATE_LATENCY: Duration = Duration::from_millis(2000);
const DISTRIBUTE_LATENCY: Duration = Duration::from_millis(1800);
const APPROVE_LATENCY: Duration = Duration::from_millis(1200);
const SUBMIT_LATENCY: Duration = Duration::from_millis(2500);

/// Investors per SPV in the default catalogue.
pub const DEFAULT_INVESTORS: usize = 5;

const CATALOGUE: [(&str, &str); 3] = [
    ("spv-001", "Tech Ventures Fund I"),
    ("spv-002", "Healthcare Innovations SPV"),
    ("spv-003", "Real Estate Opportunity Fund"),
];

fn to_rejection(err: impl std::fmt::Display) -> OperationError {
    OperationError::rejected(err.to_string())
}

// ─── Entity Source ───────────────────────────────────────────────────

/// Serves the fixed three-SPV catalogue.
#[derive(Debug, Clone)]
pub struct MockEntitySource {
    clock: Arc<dyn Clock>,
    investors: usize,
    tax_year: TaxYear,
}

impl MockEntitySource {
    /// Catalogue with five investors per SPV, for the current tax year.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_investors(clock, DEFAULT_INVESTORS)
    }

    /// Catalogue with `investors` investors per SPV.
    pub fn with_investors(clock: Arc<dyn Clock>, investors: usize) -> Self {
        Self {
            clock,
            investors,
            tax_year: TaxYear::current(),
        }
    }

    fn build_filing(&self, id: SpvId, name: &str) -> Result<Filing, OperationError> {
        let mut rng = rand::thread_rng();
        let entity_tax_id = format!("XX-{:07}", rng.gen_range(0..10_000_000u32));

        let investors = (0..self.investors)
            .map(|n| {
                let investor_id = InvestorId::new(format!("inv-{}", 100 + n)).map_err(to_rejection)?;
                Ok(Investor::new(
                    investor_id,
                    format!("Investor {}", n + 1),
                    format!("XXX-XX-{:04}", rng.gen_range(0..10_000u32)),
                    format!("investor{}@example.com", n + 1),
                ))
            })
            .collect::<Result<Vec<_>, OperationError>>()?;

        let tax_forms = vec![
            TaxForm::new(FormId::new("form-1").map_err(to_rejection)?, FormKind::PartnershipReturn),
            TaxForm::new(FormId::new("form-2").map_err(to_rejection)?, FormKind::PartnerShare),
        ];

        Ok(Filing {
            spv_id: id,
            tax_year: self.tax_year,
            entity_name: name.to_string(),
            entity_tax_id,
            tax_forms,
            investors,
            confirmation_id: None,
        })
    }
}

#[async_trait]
impl EntitySource for MockEntitySource {
    async fn list_candidate_entities(&self) -> Result<Vec<EntitySummary>, OperationError> {
        self.clock.sleep(LIST_LATENCY).await;
        CATALOGUE
            .iter()
            .map(|(id, name)| {
                Ok(EntitySummary {
                    id: SpvId::new(*id).map_err(to_rejection)?,
                    name: (*name).to_string(),
                })
            })
            .collect()
    }

    async fn load_entity_details(&self, id: &SpvId) -> Result<Filing, OperationError> {
        self.clock.sleep(DETAILS_LATENCY).await;
        let (_, name) = CATALOGUE
            .iter()
            .find(|(known, _)| *known == id.as_str())
            .ok_or_else(|| OperationError::NotFound {
                kind: "spv",
                id: id.to_string(),
            })?;
        self.build_filing(id.clone(), name)
    }
}

// ─── Stage Operations ────────────────────────────────────────────────

/// Data processing: forms and investors move from pending to generated.
#[derive(Debug, Clone)]
pub struct MockProcessing {
    clock: Arc<dyn Clock>,
}

impl MockProcessing {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl StageOperation for MockProcessing {
    async fn execute(&self, mut filing: Filing) -> Result<Filing, OperationError> {
        self.clock.sleep(PROCESS_LATENCY).await;
        filing.advance_forms(FormStatus::Generated).map_err(to_rejection)?;
        filing
            .advance_investors(InvestorStatus::Generated)
            .map_err(to_rejection)?;
        Ok(filing)
    }

    fn name(&self) -> &str {
        "mock-processing"
    }
}

/// File generation: every form gets a download reference.
#[derive(Debug, Clone)]
pub struct MockGeneration {
    clock: Arc<dyn Clock>,
    base_url: String,
}

impl MockGeneration {
    /// References are built as `{base_url}/{spv}/{form code}.pdf`.
    pub fn new(clock: Arc<dyn Clock>, base_url: impl Into<String>) -> Self {
        Self {
            clock,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StageOperation for MockGeneration {
    async fn execute(&self, mut filing: Filing) -> Result<Filing, OperationError> {
        self.clock.sleep(GENERATE_LATENCY).await;
        let base = self.base_url.trim_end_matches('/');
        for form in &mut filing.tax_forms {
            form.raise_status(FormStatus::Generated).map_err(to_rejection)?;
            form.download_url = Some(format!("{base}/{}/{}.pdf", filing.spv_id, form.kind.code()));
        }
        for investor in &mut filing.investors {
            investor
                .raise_status(InvestorStatus::Generated)
                .map_err(to_rejection)?;
        }
        Ok(filing)
    }

    fn name(&self) -> &str {
        "mock-generation"
    }
}

/// File distribution: per-investor delivery, then everything distributed.
#[derive(Debug, Clone)]
pub struct MockDistribution {
    clock: Arc<dyn Clock>,
}

impl MockDistribution {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl StageOperation for MockDistribution {
    async fn execute(&self, mut filing: Filing) -> Result<Filing, OperationError> {
        self.clock.sleep(DISTRIBUTE_LATENCY).await;
        for form in &mut filing.tax_forms {
            form.raise_status(FormStatus::Distributed).map_err(to_rejection)?;
        }
        for investor in &mut filing.investors {
            investor
                .raise_status(InvestorStatus::Distributed)
                .map_err(to_rejection)?;
        }
        Ok(filing)
    }

    async fn deliver(&self, _filing: &Filing, investor: &Investor) -> Result<(), OperationError> {
        if investor.email.contains('@') {
            Ok(())
        } else {
            Err(OperationError::rejected(format!(
                "undeliverable address {:?}",
                investor.email
            )))
        }
    }

    fn name(&self) -> &str {
        "mock-distribution"
    }
}

/// Approval: requires every check, then marks everything approved.
#[derive(Debug, Clone)]
pub struct MockApproval {
    clock: Arc<dyn Clock>,
    checks: ApprovalChecks,
}

impl MockApproval {
    pub fn new(clock: Arc<dyn Clock>, checks: ApprovalChecks) -> Self {
        Self { clock, checks }
    }
}

#[async_trait]
impl StageOperation for MockApproval {
    async fn execute(&self, mut filing: Filing) -> Result<Filing, OperationError> {
        if let Err(WorkflowError::ConfirmationIncomplete { missing }) = self.checks.validate() {
            return Err(OperationError::ConfirmationIncomplete { missing });
        }
        self.clock.sleep(APPROVE_LATENCY).await;
        for form in &mut filing.tax_forms {
            form.raise_status(FormStatus::Approved).map_err(to_rejection)?;
        }
        for investor in &mut filing.investors {
            investor
                .raise_status(InvestorStatus::Approved)
                .map_err(to_rejection)?;
        }
        Ok(filing)
    }

    fn name(&self) -> &str {
        "mock-approval"
    }
}

/// E-file submission: forms submitted, confirmation id issued.
#[derive(Debug, Clone)]
pub struct MockSubmission {
    clock: Arc<dyn Clock>,
}

impl MockSubmission {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn confirmation_id() -> String {
        format!("EFILE-{}", rand::thread_rng().gen_range(100_000..1_000_000u32))
    }
}

#[async_trait]
impl StageOperation for MockSubmission {
    async fn execute(&self, mut filing: Filing) -> Result<Filing, OperationError> {
        self.clock.sleep(SUBMIT_LATENCY).await;
        filing.advance_forms(FormStatus::Submitted).map_err(to_rejection)?;
        filing.confirmation_id = Some(Self::confirmation_id());
        Ok(filing)
    }

    fn name(&self) -> &str {
        "mock-submission"
    }
}

// ─── Failure Injection ───────────────────────────────────────────────

/// Rejects the first `execute` call, then delegates.
#[derive(Debug)]
pub struct FailOnce<O> {
    inner: O,
    tripped: AtomicBool,
    calls: AtomicUsize,
}

impl<O> FailOnce<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            tripped: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Total `execute` invocations, including the rejected one.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<O: StageOperation> StageOperation for FailOnce<O> {
    async fn execute(&self, filing: Filing) -> Result<Filing, OperationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(OperationError::rejected(format!(
                "{} unavailable (injected failure)",
                self.inner.name()
            )));
        }
        self.inner.execute(filing).await
    }

    async fn deliver(&self, filing: &Filing, investor: &Investor) -> Result<(), OperationError> {
        self.inner.deliver(filing, investor).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::InstantClock;

    fn clock() -> Arc<InstantClock> {
        Arc::new(InstantClock::new())
    }

    async fn loaded(clock: Arc<InstantClock>) -> Filing {
        MockEntitySource::new(clock)
            .load_entity_details(&SpvId::new("spv-002").unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_catalogue_lists_three_spvs() {
        let source = MockEntitySource::new(clock());
        let entities = source.list_candidate_entities().await.unwrap();
        let ids: Vec<&str> = entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["spv-001", "spv-002", "spv-003"]);
        assert_eq!(entities[1].name, "Healthcare Innovations SPV");
    }

    #[tokio::test]
    async fn test_details_are_fresh() {
        let c = clock();
        let filing = loaded(c.clone()).await;
        assert_eq!(filing.entity_name, "Healthcare Innovations SPV");
        assert_eq!(filing.investors.len(), DEFAULT_INVESTORS);
        assert_eq!(filing.investors[0].id.as_str(), "inv-100");
        assert_eq!(filing.investors[4].email, "investor5@example.com");
        assert!(filing.investors[0].tax_id.starts_with("XXX-XX-"));
        assert_eq!(filing.entity_tax_id.len(), "XX-0000000".len());
        assert!(filing.tax_forms.iter().all(|f| f.status == FormStatus::Pending));
        assert!(filing.tax_forms.iter().all(|f| f.download_url.is_none()));
        assert!(filing.confirmation_id.is_none());
        assert_eq!(c.requested(), DETAILS_LATENCY);
    }

    #[tokio::test]
    async fn test_unknown_spv_not_found() {
        let err = MockEntitySource::new(clock())
            .load_entity_details(&SpvId::new("spv-999").unwrap())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            OperationError::NotFound {
                kind: "spv",
                id: "spv-999".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_generation_attaches_download_references() {
        let c = clock();
        let filing = MockProcessing::new(c.clone())
            .execute(loaded(c.clone()).await)
            .await
            .unwrap();
        let filing = MockGeneration::new(c, "https://files.test/tax/")
            .execute(filing)
            .await
            .unwrap();
        assert_eq!(
            filing.tax_forms[0].download_url.as_deref(),
            Some("https://files.test/tax/spv-002/1065.pdf")
        );
        assert_eq!(
            filing.tax_forms[1].download_url.as_deref(),
            Some("https://files.test/tax/spv-002/K-1.pdf")
        );
    }

    #[tokio::test]
    async fn test_processing_twice_is_a_regression_error() {
        let c = clock();
        let op = MockProcessing::new(c.clone());
        let once = op.execute(loaded(c).await).await.unwrap();
        assert!(matches!(
            op.execute(once).await,
            Err(OperationError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_approval_reports_missing_checks_without_waiting() {
        let c = clock();
        let filing = loaded(c.clone()).await;
        let before = c.requested();
        let checks = ApprovalChecks {
            authorize_submission: false,
            ..ApprovalChecks::all_confirmed()
        };
        let err = MockApproval::new(c.clone(), checks)
            .execute(filing)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            OperationError::ConfirmationIncomplete {
                missing: vec!["authorizeSubmission".to_string()]
            }
        );
        assert_eq!(c.requested(), before);
    }

    #[tokio::test]
    async fn test_submission_issues_confirmation_id() {
        let c = clock();
        let mut filing = loaded(c.clone()).await;
        filing.advance_forms(FormStatus::Approved).unwrap();
        let filing = MockSubmission::new(c).execute(filing).await.unwrap();
        let id = filing.confirmation_id.unwrap();
        assert!(id.starts_with("EFILE-"));
        assert_eq!(id.len(), "EFILE-123456".len());
        assert!(filing.tax_forms.iter().all(|f| f.status == FormStatus::Submitted));
    }

    #[tokio::test]
    async fn test_delivery_rejects_bad_address() {
        let c = clock();
        let mut filing = loaded(c.clone()).await;
        filing.investors[1].email = "nobody".to_string();
        let op = MockDistribution::new(c);
        assert!(op.deliver(&filing, &filing.investors[0]).await.is_ok());
        assert!(op.deliver(&filing, &filing.investors[1]).await.is_err());
    }

    #[tokio::test]
    async fn test_fail_once_rejects_then_delegates() {
        let c = clock();
        let op = FailOnce::new(MockProcessing::new(c.clone()));
        let filing = loaded(c).await;
        assert!(op.execute(filing.clone()).await.is_err());
        assert!(op.execute(filing).await.is_ok());
        assert_eq!(op.calls(), 2);
        assert_eq!(op.name(), "mock-processing");
    }
}
