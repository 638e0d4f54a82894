//! Candidate search over eligible ledger entries

use chrono::Duration;
use tracing::debug;

use crate::traits::{EntryQuery, LedgerQuery};
use crate::types::{LedgerEntry, ReconcileResult, TransactionRecord};
use crate::utils::amount::amounts_equal;

/// Searches the ledger for entries whose amount matches a statement line
///
/// The search is a two-step: all exact-comparable predicates (company, date
/// window, counterparty, eligibility) are pushed into the query layer, then
/// the currency-precision amount test runs in process over the retrieved
/// set.
pub struct CandidateFinder<S: LedgerQuery> {
    store: S,
    date_range_days: i64,
}

impl<S: LedgerQuery> CandidateFinder<S> {
    pub fn new(store: S, date_range_days: i64) -> Self {
        Self {
            store,
            date_range_days,
        }
    }

    /// Return the eligible entries matching `record`'s amount
    ///
    /// When the record carries a counterparty the search is restricted to
    /// it; otherwise all counterparties are considered. Output is an
    /// unordered set with no scores attached.
    pub async fn find_amount_candidates(
        &self,
        record: &TransactionRecord,
    ) -> ReconcileResult<Vec<LedgerEntry>> {
        let range = Duration::days(self.date_range_days);
        let query = EntryQuery {
            company_id: record.company_id,
            date_from: record.date - range,
            date_to: record.date + range,
            counterparty_id: record.counterparty.as_ref().map(|c| c.id),
            journal_ids: None,
        };

        let broad = self.store.eligible_entries(&query).await?;
        let target = record.amount.abs();
        let matching: Vec<LedgerEntry> = broad
            .into_iter()
            .filter(|entry| amounts_equal(&entry.magnitude(), &target, &record.currency))
            .collect();

        debug!(
            record = %record.id,
            candidates = matching.len(),
            "amount candidate search"
        );
        Ok(matching)
    }
}
