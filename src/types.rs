//! Core types and data structures for the reconciliation system

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Posting state of the journal move that owns a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveState {
    /// Move is still editable and must not be matched against
    Draft,
    /// Move is posted and its entries are eligible for matching
    Posted,
    /// Move was cancelled
    Cancelled,
}

/// Kind of journal an entry or statement line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalKind {
    Bank,
    Cash,
    General,
}

/// Progress of a single transaction record through the reconciliation flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchState {
    /// No proposal has been generated for this line yet
    Unmatched,
    /// At least one proposal exists; the best one is pointed to by the line
    Matched,
    /// A reviewer has looked at the proposals
    Reviewed,
    /// The line has been settled against a ledger entry
    Reconciled,
}

/// Origin of a match proposal
///
/// Encodes where a proposal came from, not how confident it is —
/// confidence lives in the score and its [`Classification`].
///
/// [`Classification`]: crate::engine::Classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    /// Perfect score across all factors
    Exact,
    /// Regular amount-search candidate below a perfect score
    Partial,
    /// Created by a reviewer, outside the engine
    Manual,
    /// Mirrored leg found in a sibling bank journal
    InternalTransfer,
    /// Supplied by an external reconcile-model provider
    ReconcileModel,
}

/// Currency with its minor-unit resolution
///
/// `decimal_places` drives every amount comparison in the engine: amounts
/// are rounded to this scale before testing equality, never compared raw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 code (e.g. "USD")
    pub code: String,
    /// Number of minor-unit digits (2 for USD, 0 for JPY)
    pub decimal_places: i64,
}

impl Currency {
    pub fn new(code: impl Into<String>, decimal_places: i64) -> Self {
        Self {
            code: code.into(),
            decimal_places,
        }
    }
}

/// Counterparty on a statement line or ledger entry
///
/// Equality for matching purposes is by `id`; the name only feeds
/// human-readable reason strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counterparty {
    pub id: Uuid,
    pub name: String,
}

impl Counterparty {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Reference to the account a ledger entry is booked on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: Uuid,
    /// Only entries on reconcilable accounts may be proposed as matches
    pub reconcilable: bool,
}

/// A journal (bank account, cash register, ...) within a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub id: Uuid,
    pub name: String,
    pub company_id: Uuid,
    pub kind: JournalKind,
}

impl Journal {
    pub fn new(id: Uuid, name: impl Into<String>, company_id: Uuid, kind: JournalKind) -> Self {
        Self {
            id,
            name: name.into(),
            company_id,
            kind,
        }
    }
}

/// A single journal item on the ledger side of the match
///
/// The signed amount is represented as a debit/credit pair, the way the
/// ledger stores it. An entry is only eligible for matching while its move
/// is posted, its account is reconcilable, and it has not been settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    /// Accounting move (journal entry) this item belongs to
    pub move_id: Uuid,
    pub journal_id: Uuid,
    pub company_id: Uuid,
    pub account: AccountRef,
    pub date: NaiveDate,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub counterparty: Option<Counterparty>,
    /// Payment reference carried by the entry itself
    pub payment_ref: Option<String>,
    /// Free-text reference of the owning move, used as a fallback
    pub move_ref: Option<String>,
    pub move_state: MoveState,
    /// Set once the entry is fully reconciled; non-`None` means settled
    pub full_reconcile_id: Option<Uuid>,
}

impl LedgerEntry {
    /// Signed amount of the entry (`debit - credit`)
    pub fn signed_amount(&self) -> BigDecimal {
        &self.debit - &self.credit
    }

    /// Absolute amount of the entry
    pub fn magnitude(&self) -> BigDecimal {
        self.signed_amount().abs()
    }

    /// Reference used for scoring: the payment reference, falling back to
    /// the owning move's free-text reference
    pub fn effective_reference(&self) -> Option<&str> {
        self.payment_ref
            .as_deref()
            .or(self.move_ref.as_deref())
            .filter(|r| !r.trim().is_empty())
    }

    /// Whether the entry may be proposed as a match at all
    pub fn is_open_for_matching(&self) -> bool {
        self.full_reconcile_id.is_none()
            && self.account.reconcilable
            && self.move_state == MoveState::Posted
    }
}

/// A bank statement line waiting to be reconciled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    /// Batch that exclusively owns this line while assigned
    pub batch_id: Option<Uuid>,
    pub journal_id: Uuid,
    pub company_id: Uuid,
    /// Signed statement amount: positive for money in, negative for money out
    pub amount: BigDecimal,
    pub date: NaiveDate,
    pub currency: Currency,
    pub counterparty: Option<Counterparty>,
    pub payment_ref: Option<String>,
    pub match_state: MatchState,
    /// Confidence score of the best proposal, if any
    pub match_score: Option<f64>,
    /// Move of the best-scoring proposal; recomputed on every re-match
    pub suggested_move_id: Option<Uuid>,
}

impl TransactionRecord {
    /// Clear any prior matching outcome, returning the line to `Unmatched`
    pub fn reset_match(&mut self) {
        self.match_state = MatchState::Unmatched;
        self.match_score = None;
        self.suggested_move_id = None;
    }

    /// Record the best proposal for this line and mark it matched
    pub fn apply_match(&mut self, score: f64, suggested_move_id: Uuid) {
        self.match_state = MatchState::Matched;
        self.match_score = Some(score);
        self.suggested_move_id = Some(suggested_move_id);
    }
}

/// A ranked, scored suggestion that one ledger entry settles one
/// statement line
///
/// Proposals are created in bulk by the batch orchestrator and discarded
/// wholesale on re-match. At most one proposal may exist per
/// (record, entry) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchProposal {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub record_id: Uuid,
    pub entry_id: Uuid,
    pub move_id: Uuid,
    /// Confidence score in [0, 100]
    pub score: f64,
    pub match_type: MatchType,
    /// Human-readable explanation of why this match was suggested
    pub reason: String,
    /// Set by reviewer action; never by the engine
    pub selected: bool,
}

impl MatchProposal {
    /// Build a validated proposal linking `record` to `entry`
    ///
    /// Rejects scores outside [0, 100] and records that do not belong to
    /// the given batch.
    pub fn new(
        batch_id: Uuid,
        record: &TransactionRecord,
        entry: &LedgerEntry,
        score: f64,
        match_type: MatchType,
        reason: impl Into<String>,
    ) -> ReconcileResult<Self> {
        if !(0.0..=100.0).contains(&score) {
            return Err(ReconcileError::Validation(format!(
                "Match score must be between 0 and 100. Got: {score}"
            )));
        }
        if record.batch_id != Some(batch_id) {
            return Err(ReconcileError::Validation(format!(
                "Record {} does not belong to batch {batch_id}",
                record.id
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            batch_id,
            record_id: record.id,
            entry_id: entry.id,
            move_id: entry.move_id,
            score,
            match_type,
            reason: reason.into(),
            selected: false,
        })
    }
}

/// Batch-level outcome counts, keyed by the classification of each line's
/// best score
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Lines whose best proposal scored exactly 100
    pub safe: usize,
    /// Lines whose best proposal scored 80 or above
    pub probable: usize,
    /// Lines with proposals, none of which reached 80
    pub doubtful: usize,
    /// Lines with no proposal at all
    pub unmatched: usize,
}

impl MatchSummary {
    pub fn total_lines(&self) -> usize {
        self.safe + self.probable + self.doubtful + self.unmatched
    }
}

/// Errors that can occur in the reconciliation core
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),
    #[error("Record not found: {0}")]
    RecordNotFound(Uuid),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn record(batch_id: Option<Uuid>) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            batch_id,
            journal_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            amount: BigDecimal::from(100),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            currency: Currency::new("USD", 2),
            counterparty: None,
            payment_ref: None,
            match_state: MatchState::Unmatched,
            match_score: None,
            suggested_move_id: None,
        }
    }

    fn entry() -> LedgerEntry {
        LedgerEntry {
            id: Uuid::new_v4(),
            move_id: Uuid::new_v4(),
            journal_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            account: AccountRef {
                id: Uuid::new_v4(),
                reconcilable: true,
            },
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            debit: BigDecimal::from(100),
            credit: BigDecimal::from(0),
            counterparty: None,
            payment_ref: None,
            move_ref: None,
            move_state: MoveState::Posted,
            full_reconcile_id: None,
        }
    }

    #[test]
    fn signed_amount_is_debit_minus_credit() {
        let mut e = entry();
        e.debit = BigDecimal::from(0);
        e.credit = BigDecimal::from_str("250.50").unwrap();
        assert_eq!(e.signed_amount(), BigDecimal::from_str("-250.50").unwrap());
        assert_eq!(e.magnitude(), BigDecimal::from_str("250.50").unwrap());
    }

    #[test]
    fn effective_reference_falls_back_to_move_ref() {
        let mut e = entry();
        e.move_ref = Some("INV-42".to_string());
        assert_eq!(e.effective_reference(), Some("INV-42"));

        e.payment_ref = Some("PAY-1".to_string());
        assert_eq!(e.effective_reference(), Some("PAY-1"));

        e.payment_ref = Some("   ".to_string());
        e.move_ref = None;
        assert_eq!(e.effective_reference(), None);
    }

    #[test]
    fn entry_eligibility_requires_posted_reconcilable_unsettled() {
        let mut e = entry();
        assert!(e.is_open_for_matching());

        e.move_state = MoveState::Draft;
        assert!(!e.is_open_for_matching());
        e.move_state = MoveState::Posted;

        e.account.reconcilable = false;
        assert!(!e.is_open_for_matching());
        e.account.reconcilable = true;

        e.full_reconcile_id = Some(Uuid::new_v4());
        assert!(!e.is_open_for_matching());
    }

    #[test]
    fn proposal_rejects_out_of_range_score() {
        let batch_id = Uuid::new_v4();
        let rec = record(Some(batch_id));
        let e = entry();

        let err = MatchProposal::new(batch_id, &rec, &e, 120.0, MatchType::Exact, "r");
        assert!(matches!(err, Err(ReconcileError::Validation(_))));

        let err = MatchProposal::new(batch_id, &rec, &e, -1.0, MatchType::Exact, "r");
        assert!(matches!(err, Err(ReconcileError::Validation(_))));
    }

    #[test]
    fn proposal_rejects_record_outside_batch() {
        let batch_id = Uuid::new_v4();
        let rec = record(Some(Uuid::new_v4()));
        let e = entry();

        let err = MatchProposal::new(batch_id, &rec, &e, 100.0, MatchType::Exact, "r");
        assert!(matches!(err, Err(ReconcileError::Validation(_))));
    }

    #[test]
    fn proposal_links_record_and_entry() {
        let batch_id = Uuid::new_v4();
        let rec = record(Some(batch_id));
        let e = entry();

        let proposal =
            MatchProposal::new(batch_id, &rec, &e, 85.0, MatchType::Partial, "Amount match")
                .unwrap();
        assert_eq!(proposal.record_id, rec.id);
        assert_eq!(proposal.entry_id, e.id);
        assert_eq!(proposal.move_id, e.move_id);
        assert!(!proposal.selected);
    }
}
