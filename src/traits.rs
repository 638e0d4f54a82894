//! Traits for collaborator abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::*;

/// Filter predicate for a ledger-entry search
///
/// Everything that compares exactly (company, date window, counterparty,
/// journal restriction) belongs in the query and should be pushed down to
/// the backing store. Amount comparison deliberately does NOT appear here:
/// minor-unit rounding semantics vary by currency, so the engine always
/// applies the precision-aware amount test in application code after
/// retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryQuery {
    pub company_id: Uuid,
    /// Inclusive start of the date window
    pub date_from: NaiveDate,
    /// Inclusive end of the date window
    pub date_to: NaiveDate,
    /// When set, restrict to entries with this exact counterparty;
    /// when `None`, search across all counterparties
    pub counterparty_id: Option<Uuid>,
    /// When set, restrict to entries in these journals (transfer search);
    /// when `None`, search every journal
    pub journal_ids: Option<Vec<Uuid>>,
}

/// Read-only query interface over the ledger store
///
/// This trait allows the matching core to work with any storage backend
/// (PostgreSQL, an ORM, in-memory, ...) by implementing these methods.
/// Candidate search is read-only and must be safe for concurrent calls.
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    /// Return entries matching `query` that are open for matching
    ///
    /// Implementations must also apply the standing eligibility predicate:
    /// posted move, reconcilable account, no full-reconciliation marker
    /// (see [`LedgerEntry::is_open_for_matching`]).
    async fn eligible_entries(&self, query: &EntryQuery) -> ReconcileResult<Vec<LedgerEntry>>;

    /// All bank-kind journals of a company
    async fn bank_journals(&self, company_id: Uuid) -> ReconcileResult<Vec<Journal>>;
}

/// An extra candidate produced by an external reconcile model
///
/// The core treats these as opaque: score and reason are merged in
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub entry: LedgerEntry,
    pub score: f64,
    pub reason: String,
}

/// Opaque provider of reconcile-model candidates for a statement line
#[async_trait]
pub trait ReconcileModelProvider: Send + Sync {
    async fn model_candidates(
        &self,
        record: &TransactionRecord,
    ) -> ReconcileResult<Vec<ModelCandidate>>;
}

/// Write interface for persisting match proposals and line outcomes
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Drop every proposal belonging to `batch_id`
    ///
    /// Called at the start of each matching run so a re-match regenerates
    /// from scratch instead of appending.
    async fn discard_batch_proposals(&mut self, batch_id: Uuid) -> ReconcileResult<()>;

    /// Persist one line's proposals and its updated best-match fields as a
    /// single atomic unit
    ///
    /// Either all of the line's proposals become visible or none do.
    /// Implementations must reject a second proposal for the same
    /// (record, entry) pair.
    async fn persist_line_match(
        &mut self,
        record: &TransactionRecord,
        proposals: &[MatchProposal],
    ) -> ReconcileResult<()>;
}

/// Sink for batch-level notifications emitted at the end of matching
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Called once per completed matching run with the aggregated counts
    async fn matching_completed(
        &self,
        batch_id: Uuid,
        summary: &MatchSummary,
    ) -> ReconcileResult<()>;
}
