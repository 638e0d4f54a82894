//! Weighted confidence scoring for match candidates

use serde::{Deserialize, Serialize};

use crate::types::{LedgerEntry, TransactionRecord};
use crate::utils::amount::amounts_equal;

/// Scoring weights (must sum to 1.0)
const WEIGHT_AMOUNT: f64 = 0.50;
const WEIGHT_COUNTERPARTY: f64 = 0.25;
const WEIGHT_REFERENCE: f64 = 0.20;
const WEIGHT_DATE: f64 = 0.05;

/// Coarse confidence bucket for a score, used for batch-level reporting
///
/// Not stored on proposals — a proposal's [`MatchType`] encodes origin,
/// while classification is derived from the score whenever needed.
///
/// [`MatchType`]: crate::types::MatchType
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// Perfect score; eligible for automatic acceptance
    Safe,
    /// Strong signal (80 or above) but worth a glance
    Probable,
    /// Needs human review
    Doubtful,
}

impl Classification {
    /// Classify a confidence score
    pub fn from_score(score: f64) -> Self {
        if score == 100.0 {
            Classification::Safe
        } else if score >= 80.0 {
            Classification::Probable
        } else {
            Classification::Doubtful
        }
    }
}

/// Calculates weighted confidence scores for reconciliation candidates
///
/// Scoring is a pure function of the statement line, the ledger entry, and
/// the configured date range — no hidden state, fully reproducible in
/// tests.
#[derive(Debug, Clone)]
pub struct Scorer {
    date_range_days: i64,
}

impl Scorer {
    /// Create a scorer with the given date-decay range in days
    pub fn new(date_range_days: i64) -> Self {
        Self { date_range_days }
    }

    /// Calculate the weighted confidence score (0-100) for a candidate match
    pub fn calculate_score(&self, record: &TransactionRecord, entry: &LedgerEntry) -> f64 {
        let amount_score = self.score_amount(record, entry);
        let counterparty_score = self.score_counterparty(record, entry);
        let reference_score = self.score_reference(record, entry);
        let date_score = self.score_date(record, entry);

        amount_score * WEIGHT_AMOUNT
            + counterparty_score * WEIGHT_COUNTERPARTY
            + reference_score * WEIGHT_REFERENCE
            + date_score * WEIGHT_DATE
    }

    /// Amount factor: 100 when magnitudes match at currency precision
    ///
    /// Regular candidates are pre-filtered on amount, but transfer and
    /// reconcile-model candidates are not, so the factor stays
    /// independently correct.
    fn score_amount(&self, record: &TransactionRecord, entry: &LedgerEntry) -> f64 {
        if amounts_equal(&record.amount.abs(), &entry.magnitude(), &record.currency) {
            100.0
        } else {
            0.0
        }
    }

    /// Counterparty factor: 100 both set and equal, 50 when only the entry
    /// carries one, 0 otherwise
    fn score_counterparty(&self, record: &TransactionRecord, entry: &LedgerEntry) -> f64 {
        match (&record.counterparty, &entry.counterparty) {
            (Some(rec), Some(ent)) if rec.id == ent.id => 100.0,
            (Some(_), Some(_)) => 0.0,
            (None, Some(_)) => 50.0,
            _ => 0.0,
        }
    }

    /// Reference factor: 100 exact, 75 substring either way, 0 otherwise
    fn score_reference(&self, record: &TransactionRecord, entry: &LedgerEntry) -> f64 {
        let rec_ref = normalize_reference(record.payment_ref.as_deref());
        let ent_ref = normalize_reference(entry.effective_reference());

        if rec_ref.is_empty() || ent_ref.is_empty() {
            return 0.0;
        }
        if rec_ref == ent_ref {
            return 100.0;
        }
        if rec_ref.contains(&ent_ref) || ent_ref.contains(&rec_ref) {
            return 75.0;
        }
        0.0
    }

    /// Date factor: 100 same day, linear decay to 0 at the range boundary
    fn score_date(&self, record: &TransactionRecord, entry: &LedgerEntry) -> f64 {
        let day_diff = (record.date - entry.date).num_days().abs();
        if day_diff == 0 {
            return 100.0;
        }

        let max_days = self.date_range_days.max(1);
        if day_diff >= max_days {
            return 0.0;
        }

        100.0 * (1.0 - day_diff as f64 / max_days as f64)
    }
}

/// Trim and case-fold a reference for comparison
fn normalize_reference(reference: Option<&str>) -> String {
    reference.unwrap_or_default().trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountRef, Counterparty, Currency, MatchState, MoveState};
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(amount: &str, d: NaiveDate) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            batch_id: None,
            journal_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            amount: BigDecimal::from_str(amount).unwrap(),
            date: d,
            currency: Currency::new("USD", 2),
            counterparty: None,
            payment_ref: None,
            match_state: MatchState::Unmatched,
            match_score: None,
            suggested_move_id: None,
        }
    }

    fn entry(debit: &str, credit: &str, d: NaiveDate) -> LedgerEntry {
        LedgerEntry {
            id: Uuid::new_v4(),
            move_id: Uuid::new_v4(),
            journal_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            account: AccountRef {
                id: Uuid::new_v4(),
                reconcilable: true,
            },
            date: d,
            debit: BigDecimal::from_str(debit).unwrap(),
            credit: BigDecimal::from_str(credit).unwrap(),
            counterparty: None,
            payment_ref: None,
            move_ref: None,
            move_state: MoveState::Posted,
            full_reconcile_id: None,
        }
    }

    #[test]
    fn perfect_match_scores_exactly_100() {
        let d = date(2024, 3, 15);
        let party = Counterparty::new(Uuid::new_v4(), "Acme");

        let mut rec = record("1000.00", d);
        rec.counterparty = Some(party.clone());
        rec.payment_ref = Some("INV-12345".to_string());

        let mut ent = entry("1000.00", "0", d);
        ent.counterparty = Some(party);
        ent.payment_ref = Some("INV-12345".to_string());

        let score = Scorer::new(30).calculate_score(&rec, &ent);
        assert_eq!(score, 100.0);
    }

    #[test]
    fn amount_and_date_only_scores_55() {
        let d = date(2024, 3, 15);
        let rec = record("500.00", d);
        let ent = entry("500.00", "0", d);

        let score = Scorer::new(30).calculate_score(&rec, &ent);
        assert_eq!(score, 55.0);
    }

    #[test]
    fn amount_mismatch_zeroes_the_amount_factor() {
        let d = date(2024, 3, 15);
        let rec = record("500.00", d);
        let ent = entry("600.00", "0", d);

        let score = Scorer::new(30).calculate_score(&rec, &ent);
        assert_eq!(score, 5.0); // date factor only
    }

    #[test]
    fn counterparty_only_on_entry_scores_half() {
        let d = date(2024, 3, 15);
        let rec = record("100.00", d);
        let mut ent = entry("100.00", "0", d);
        ent.counterparty = Some(Counterparty::new(Uuid::new_v4(), "Acme"));

        let scorer = Scorer::new(30);
        assert_eq!(scorer.score_counterparty(&rec, &ent), 50.0);
    }

    #[test]
    fn counterparty_mismatch_scores_zero() {
        let d = date(2024, 3, 15);
        let mut rec = record("100.00", d);
        rec.counterparty = Some(Counterparty::new(Uuid::new_v4(), "Acme"));
        let mut ent = entry("100.00", "0", d);
        ent.counterparty = Some(Counterparty::new(Uuid::new_v4(), "Globex"));

        let scorer = Scorer::new(30);
        assert_eq!(scorer.score_counterparty(&rec, &ent), 0.0);
    }

    #[test]
    fn reference_exact_match_scores_100() {
        let d = date(2024, 3, 15);
        let mut rec = record("100.00", d);
        rec.payment_ref = Some("  INV-12345 ".to_string());
        let mut ent = entry("100.00", "0", d);
        ent.payment_ref = Some("inv-12345".to_string());

        let scorer = Scorer::new(30);
        assert_eq!(scorer.score_reference(&rec, &ent), 100.0);
    }

    #[test]
    fn reference_substring_scores_75() {
        let d = date(2024, 3, 15);
        let mut rec = record("100.00", d);
        rec.payment_ref = Some("Payment for INV-12345".to_string());
        let mut ent = entry("100.00", "0", d);
        ent.payment_ref = Some("INV-12345".to_string());

        let scorer = Scorer::new(30);
        assert_eq!(scorer.score_reference(&rec, &ent), 75.0);
    }

    #[test]
    fn reference_disjoint_or_empty_scores_zero() {
        let d = date(2024, 3, 15);
        let scorer = Scorer::new(30);

        let mut rec = record("100.00", d);
        rec.payment_ref = Some("INV-1".to_string());
        let mut ent = entry("100.00", "0", d);
        ent.payment_ref = Some("PO-999".to_string());
        assert_eq!(scorer.score_reference(&rec, &ent), 0.0);

        ent.payment_ref = None;
        assert_eq!(scorer.score_reference(&rec, &ent), 0.0);

        rec.payment_ref = None;
        assert_eq!(scorer.score_reference(&rec, &ent), 0.0);
    }

    #[test]
    fn reference_falls_back_to_move_ref() {
        let d = date(2024, 3, 15);
        let mut rec = record("100.00", d);
        rec.payment_ref = Some("INV-12345".to_string());
        let mut ent = entry("100.00", "0", d);
        ent.move_ref = Some("INV-12345".to_string());

        let scorer = Scorer::new(30);
        assert_eq!(scorer.score_reference(&rec, &ent), 100.0);
    }

    #[test]
    fn date_decay_is_linear_over_the_range() {
        let scorer = Scorer::new(30);
        let rec = record("100.00", date(2024, 3, 15));

        let same_day = entry("100.00", "0", date(2024, 3, 15));
        assert_eq!(scorer.score_date(&rec, &same_day), 100.0);

        let fifteen_off = entry("100.00", "0", date(2024, 3, 30));
        assert_eq!(scorer.score_date(&rec, &fifteen_off), 50.0);

        let at_boundary = entry("100.00", "0", date(2024, 4, 14));
        assert_eq!(scorer.score_date(&rec, &at_boundary), 0.0);

        let beyond = entry("100.00", "0", date(2024, 5, 15));
        assert_eq!(scorer.score_date(&rec, &beyond), 0.0);
    }

    #[test]
    fn score_is_always_within_bounds() {
        let scorer = Scorer::new(30);
        let d = date(2024, 3, 15);

        let mut rec = record("100.00", d);
        rec.counterparty = Some(Counterparty::new(Uuid::new_v4(), "Acme"));
        rec.payment_ref = Some("REF".to_string());

        for offset in [0i64, 1, 10, 29, 30, 100] {
            let ent = entry("100.00", "0", d + chrono::Duration::days(offset));
            let score = scorer.calculate_score(&rec, &ent);
            assert!((0.0..=100.0).contains(&score), "score {score} out of range");
        }
    }

    #[test]
    fn classify_boundaries() {
        assert_eq!(Classification::from_score(100.0), Classification::Safe);
        assert_eq!(Classification::from_score(99.9), Classification::Probable);
        assert_eq!(Classification::from_score(85.0), Classification::Probable);
        assert_eq!(Classification::from_score(80.0), Classification::Probable);
        assert_eq!(Classification::from_score(79.9), Classification::Doubtful);
        assert_eq!(Classification::from_score(60.0), Classification::Doubtful);
        assert_eq!(Classification::from_score(0.0), Classification::Doubtful);
    }
}
