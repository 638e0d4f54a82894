//! Internal-transfer detection across sibling bank journals

use std::collections::HashMap;

use chrono::Duration;
use tracing::debug;
use uuid::Uuid;

use super::scorer::Scorer;
use super::{Candidate, CandidateSource};
use crate::traits::{EntryQuery, LedgerQuery};
use crate::types::{ReconcileResult, TransactionRecord};
use crate::utils::amount::amounts_equal;

/// Transfers are expected to post near-simultaneously, so the window is
/// fixed and much narrower than the general candidate range.
const TRANSFER_WINDOW_DAYS: i64 = 7;

/// Flat boost applied to transfer candidates, capped at 100. A transfer
/// that already scores well on its own merits gets nudged into the safe
/// bucket.
const TRANSFER_SCORE_BOOST: f64 = 5.0;

/// Detects candidate self-transfers between bank accounts of one company
pub struct TransferDetector<S: LedgerQuery> {
    store: S,
    scorer: Scorer,
}

impl<S: LedgerQuery> TransferDetector<S> {
    pub fn new(store: S, scorer: Scorer) -> Self {
        Self { store, scorer }
    }

    /// Look for the mirrored leg of `record` in other bank journals
    ///
    /// An entry qualifies when its signed amount equals the negation of the
    /// record's amount at currency precision and it lies within the
    /// transfer window. Matches are scored normally plus the transfer
    /// boost.
    pub async fn detect_internal_transfers(
        &self,
        record: &TransactionRecord,
    ) -> ReconcileResult<Vec<Candidate>> {
        let journals = self.store.bank_journals(record.company_id).await?;
        let siblings: Vec<_> = journals
            .into_iter()
            .filter(|j| j.id != record.journal_id)
            .collect();
        if siblings.is_empty() {
            return Ok(Vec::new());
        }

        let journal_names: HashMap<Uuid, String> =
            siblings.iter().map(|j| (j.id, j.name.clone())).collect();

        let window = Duration::days(TRANSFER_WINDOW_DAYS);
        let query = EntryQuery {
            company_id: record.company_id,
            date_from: record.date - window,
            date_to: record.date + window,
            counterparty_id: None,
            journal_ids: Some(siblings.iter().map(|j| j.id).collect()),
        };

        let potential = self.store.eligible_entries(&query).await?;
        let opposite = -&record.amount;

        let candidates: Vec<Candidate> = potential
            .into_iter()
            .filter(|entry| amounts_equal(&entry.signed_amount(), &opposite, &record.currency))
            .map(|entry| {
                let score =
                    (self.scorer.calculate_score(record, &entry) + TRANSFER_SCORE_BOOST).min(100.0);
                let source_journal = journal_names
                    .get(&entry.journal_id)
                    .cloned()
                    .unwrap_or_else(|| entry.journal_id.to_string());
                Candidate {
                    reason: format!("Internal transfer from {source_journal}"),
                    score,
                    source: CandidateSource::InternalTransfer,
                    entry,
                }
            })
            .collect();

        debug!(
            record = %record.id,
            transfers = candidates.len(),
            "internal transfer search"
        );
        Ok(candidates)
    }
}
