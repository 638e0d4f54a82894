//! Matching engine: candidate search, transfer detection, and scoring

pub mod finder;
pub mod scorer;
pub mod transfer;

pub use finder::CandidateFinder;
pub use scorer::{Classification, Scorer};
pub use transfer::TransferDetector;

use serde::{Deserialize, Serialize};

use crate::traits::LedgerQuery;
use crate::types::{LedgerEntry, MatchType, ReconcileResult, TransactionRecord};

/// Configuration for the matching engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Days +/- around the statement date for regular candidate search,
    /// and the decay range of the date factor
    pub date_range_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { date_range_days: 30 }
    }
}

/// Where a candidate was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateSource {
    /// Regular amount search over eligible entries
    AmountSearch,
    /// Mirrored leg in a sibling bank journal
    InternalTransfer,
    /// External reconcile-model provider
    ReconcileModel,
}

/// A scored candidate pairing one ledger entry with one statement line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub entry: LedgerEntry,
    pub score: f64,
    pub source: CandidateSource,
    pub reason: String,
}

impl Candidate {
    /// Proposal type this candidate produces: a perfect score is always an
    /// exact match, below that the origin tag wins
    pub fn match_type(&self) -> MatchType {
        if self.score == 100.0 {
            return MatchType::Exact;
        }
        match self.source {
            CandidateSource::InternalTransfer => MatchType::InternalTransfer,
            CandidateSource::ReconcileModel => MatchType::ReconcileModel,
            CandidateSource::AmountSearch => MatchType::Partial,
        }
    }
}

/// Engine for finding and scoring reconciliation candidates
///
/// Combines the amount-candidate search and the internal-transfer search
/// into one ranked candidate list per statement line.
pub struct MatchEngine<S: LedgerQuery> {
    finder: CandidateFinder<S>,
    transfers: TransferDetector<S>,
    scorer: Scorer,
}

impl<S: LedgerQuery + Clone> MatchEngine<S> {
    /// Create an engine over the given ledger store
    pub fn new(store: S, config: EngineConfig) -> Self {
        let scorer = Scorer::new(config.date_range_days);
        Self {
            finder: CandidateFinder::new(store.clone(), config.date_range_days),
            transfers: TransferDetector::new(store, scorer.clone()),
            scorer,
        }
    }

    /// The scorer this engine was built with
    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Find and score all candidates for one statement line
    ///
    /// Returns regular amount candidates and internal-transfer candidates,
    /// sorted by score descending. Ties keep discovery order.
    pub async fn find_candidates(
        &self,
        record: &TransactionRecord,
    ) -> ReconcileResult<Vec<Candidate>> {
        let mut candidates = Vec::new();

        for entry in self.finder.find_amount_candidates(record).await? {
            let score = self.scorer.calculate_score(record, &entry);
            let reason = build_reason(record, &entry, score);
            candidates.push(Candidate {
                entry,
                score,
                source: CandidateSource::AmountSearch,
                reason,
            });
        }

        candidates.extend(self.transfers.detect_internal_transfers(record).await?);

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(candidates)
    }
}

/// Build the human-readable reason string for a regular candidate
fn build_reason(record: &TransactionRecord, entry: &LedgerEntry, score: f64) -> String {
    let mut parts = Vec::new();

    if score >= 80.0 {
        parts.push(format!("Amount match (±{})", record.amount));
    }
    if let (Some(rec_party), Some(ent_party)) = (&record.counterparty, &entry.counterparty) {
        if rec_party.id == ent_party.id {
            parts.push(format!("Counterparty: {}", ent_party.name));
        }
    }
    if let (Some(rec_ref), Some(ent_ref)) =
        (record.payment_ref.as_deref(), entry.payment_ref.as_deref())
    {
        if rec_ref.to_lowercase().contains(&ent_ref.to_lowercase()) {
            parts.push(format!("Reference: {ent_ref}"));
        }
    }

    if parts.is_empty() {
        "Amount match".to_string()
    } else {
        parts.join(" | ")
    }
}
