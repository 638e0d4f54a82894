//! Reconciliation batches: state machine and matching orchestration

use std::collections::HashMap;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::{Candidate, CandidateSource, Classification, EngineConfig, MatchEngine};
use crate::traits::{LedgerQuery, NotificationSink, ProposalStore, ReconcileModelProvider};
use crate::types::{
    MatchProposal, MatchSummary, ReconcileError, ReconcileResult, TransactionRecord,
};

/// Lifecycle state of a reconciliation batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    /// Being assembled; lines can be added
    Draft,
    /// A matching run is in progress (or was aborted mid-run; restarting
    /// is always safe and regenerates from scratch)
    Matching,
    /// Proposals are generated and awaiting review
    Review,
    /// Reconciliation has been committed externally
    Reconciled,
}

/// A batch of statement lines matched together
///
/// All state transitions go through the guarded methods below so the
/// batch invariants (no matching or reconciling without lines) are
/// enforced in one place. A rejected transition leaves the batch in its
/// prior state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub name: String,
    pub company_id: Uuid,
    /// Optional bank journal this batch draws its lines from
    pub journal_id: Option<Uuid>,
    pub notes: Option<String>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    state: BatchState,
    records: Vec<TransactionRecord>,
    /// Number of proposals generated by the last matching run
    proposal_count: u32,
}

impl Batch {
    pub fn new(name: impl Into<String>, company_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            company_id,
            journal_id: None,
            notes: None,
            date_from: None,
            date_to: None,
            state: BatchState::Draft,
            records: Vec::new(),
            proposal_count: 0,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn line_count(&self) -> usize {
        self.records.len()
    }

    pub fn proposal_count(&self) -> u32 {
        self.proposal_count
    }

    pub fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.date_from, self.date_to)
    }

    /// Percentage of lines covered by proposals (proposals / lines)
    ///
    /// Can exceed 100 when lines attract multiple proposals each.
    pub fn matched_percentage(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.proposal_count as f64 / self.records.len() as f64 * 100.0
    }

    /// Set the statement-line date filter; `from` must not be after `to`
    pub fn set_date_range(
        &mut self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ReconcileResult<()> {
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(ReconcileError::Validation(
                    "Date From must be before or equal to Date To".to_string(),
                ));
            }
        }
        self.date_from = from;
        self.date_to = to;
        Ok(())
    }

    /// Add a statement line to the batch, taking ownership of it
    pub fn add_record(&mut self, mut record: TransactionRecord) {
        record.batch_id = Some(self.id);
        self.records.push(record);
    }

    /// Transition into `Matching`
    ///
    /// Valid from `Draft`, from `Review` (re-match), and from `Matching`
    /// itself (restart of an aborted run). Rejected on an empty batch and
    /// on a reconciled batch.
    pub fn begin_matching(&mut self) -> ReconcileResult<()> {
        if self.records.is_empty() {
            return Err(ReconcileError::Validation(
                "Cannot start matching without statement lines".to_string(),
            ));
        }
        match self.state {
            BatchState::Draft | BatchState::Matching | BatchState::Review => {
                self.state = BatchState::Matching;
                Ok(())
            }
            BatchState::Reconciled => Err(ReconcileError::InvalidTransition(
                "cannot start matching on a reconciled batch; reset it to draft first".to_string(),
            )),
        }
    }

    /// Transition `Matching` -> `Review`
    pub fn move_to_review(&mut self) -> ReconcileResult<()> {
        match self.state {
            BatchState::Matching => {
                self.state = BatchState::Review;
                Ok(())
            }
            other => Err(ReconcileError::InvalidTransition(format!(
                "cannot move to review from {other:?}"
            ))),
        }
    }

    /// Transition `Review` -> `Reconciled`
    ///
    /// A batch can never be reconciled without lines.
    pub fn mark_reconciled(&mut self) -> ReconcileResult<()> {
        if self.records.is_empty() {
            return Err(ReconcileError::Validation(
                "Cannot reconcile a batch with no statement lines".to_string(),
            ));
        }
        match self.state {
            BatchState::Review => {
                self.state = BatchState::Reconciled;
                Ok(())
            }
            other => Err(ReconcileError::InvalidTransition(format!(
                "cannot reconcile from {other:?}"
            ))),
        }
    }

    /// Return to `Draft` from any state, including `Reconciled`
    ///
    /// Deliberately unguarded: this is the explicit undo action.
    pub fn reset_to_draft(&mut self) {
        self.state = BatchState::Draft;
    }

    fn set_proposal_count(&mut self, count: u32) {
        self.proposal_count = count;
    }
}

/// Configuration for a matching run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub engine: EngineConfig,
    /// Largest batch the orchestrator will accept; the feature is designed
    /// around modest batches
    pub max_batch_lines: usize,
    /// Upper bound on concurrently matched lines
    pub max_concurrent_lines: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            max_batch_lines: 80,
            max_concurrent_lines: 8,
        }
    }
}

/// Outcome of matching a single line, computed concurrently and merged
/// after all lines complete
struct LineOutcome {
    record_id: Uuid,
    proposals: Vec<MatchProposal>,
    /// Best candidate's score and move, when any proposals exist
    best: Option<(f64, Uuid)>,
}

/// Drives the batch state machine and the per-line matching pipeline
///
/// Lines within a batch are matched independently of each other, so the
/// candidate-search-and-score step runs across a bounded worker pool.
/// Only after every line completes are the results persisted and the
/// summary counters accumulated, from a single task.
pub struct BatchOrchestrator<S, M, N>
where
    S: LedgerQuery + ProposalStore + Clone,
    M: ReconcileModelProvider,
    N: NotificationSink,
{
    store: S,
    engine: MatchEngine<S>,
    models: M,
    notifier: N,
    config: MatchingConfig,
}

impl<S, M, N> BatchOrchestrator<S, M, N>
where
    S: LedgerQuery + ProposalStore + Clone,
    M: ReconcileModelProvider,
    N: NotificationSink,
{
    pub fn new(store: S, models: M, notifier: N, config: MatchingConfig) -> Self {
        let engine = MatchEngine::new(store.clone(), config.engine.clone());
        Self {
            store,
            engine,
            models,
            notifier,
            config,
        }
    }

    /// Run one full matching pass over the batch
    ///
    /// Discards any prior proposals, matches every line, persists ranked
    /// proposals per line, moves the batch to `Review`, and emits the
    /// summary to the notification sink. Invoking this again on a batch
    /// already in `Review` is a valid re-match and fully regenerates the
    /// proposals.
    pub async fn start_matching(&mut self, batch: &mut Batch) -> ReconcileResult<MatchSummary> {
        if batch.line_count() > self.config.max_batch_lines {
            return Err(ReconcileError::Validation(format!(
                "Batch has {} lines, more than the configured maximum of {}",
                batch.line_count(),
                self.config.max_batch_lines
            )));
        }
        batch.begin_matching()?;
        info!(batch = %batch.id, lines = batch.line_count(), "matching started");

        // Idempotent re-match: drop prior proposals, reset every line.
        self.store.discard_batch_proposals(batch.id).await?;
        batch.set_proposal_count(0);
        for record in &mut batch.records {
            record.reset_match();
        }

        let limit = self
            .config
            .max_concurrent_lines
            .min(batch.records.len())
            .max(1);
        let engine = &self.engine;
        let models = &self.models;
        let batch_id = batch.id;

        let outcomes: Vec<ReconcileResult<LineOutcome>> = stream::iter(batch.records.iter())
            .map(|record| async move { Self::match_line(engine, models, batch_id, record).await })
            .buffer_unordered(limit)
            .collect()
            .await;

        let mut summary = MatchSummary::default();
        let mut proposal_count = 0u32;

        for outcome in outcomes {
            let outcome = outcome?;
            let record = batch
                .records
                .iter_mut()
                .find(|r| r.id == outcome.record_id)
                .ok_or(ReconcileError::RecordNotFound(outcome.record_id))?;

            let (best_score, best_move) = match outcome.best {
                Some(best) => best,
                None => {
                    summary.unmatched += 1;
                    continue;
                }
            };

            // Persist first, then update the owned line, so a storage
            // failure cannot leave the line pointing at unpersisted
            // proposals.
            let mut updated = record.clone();
            updated.apply_match(best_score, best_move);
            self.store
                .persist_line_match(&updated, &outcome.proposals)
                .await?;
            *record = updated;
            proposal_count += outcome.proposals.len() as u32;

            match Classification::from_score(best_score) {
                Classification::Safe => summary.safe += 1,
                Classification::Probable => summary.probable += 1,
                Classification::Doubtful => summary.doubtful += 1,
            }
        }

        batch.set_proposal_count(proposal_count);
        batch.move_to_review()?;

        info!(
            batch = %batch.id,
            safe = summary.safe,
            probable = summary.probable,
            doubtful = summary.doubtful,
            unmatched = summary.unmatched,
            "matching completed"
        );
        self.notifier.matching_completed(batch.id, &summary).await?;

        Ok(summary)
    }

    /// Gather, merge, dedupe, and rank all candidates for one line
    async fn match_line(
        engine: &MatchEngine<S>,
        models: &M,
        batch_id: Uuid,
        record: &TransactionRecord,
    ) -> ReconcileResult<LineOutcome> {
        let mut candidates = engine.find_candidates(record).await?;

        let model_candidates = models.model_candidates(record).await?;
        candidates.extend(model_candidates.into_iter().map(|mc| Candidate {
            entry: mc.entry,
            score: mc.score,
            source: CandidateSource::ReconcileModel,
            reason: mc.reason,
        }));

        // The engine and the model provider may nominate the same entry;
        // only one proposal per (record, entry) pair may survive. Keep the
        // higher score, first discovered on ties.
        let mut index: HashMap<Uuid, usize> = HashMap::new();
        let mut deduped: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            match index.get(&candidate.entry.id) {
                Some(&i) if deduped[i].score >= candidate.score => {}
                Some(&i) => deduped[i] = candidate,
                None => {
                    index.insert(candidate.entry.id, deduped.len());
                    deduped.push(candidate);
                }
            }
        }

        let mut proposals = Vec::with_capacity(deduped.len());
        let mut best: Option<(f64, Uuid)> = None;
        for candidate in &deduped {
            let match_type = candidate.match_type();
            let proposal = MatchProposal::new(
                batch_id,
                record,
                &candidate.entry,
                candidate.score,
                match_type,
                candidate.reason.clone(),
            )?;
            if best.is_none_or(|(score, _)| candidate.score > score) {
                best = Some((candidate.score, candidate.entry.move_id));
            }
            proposals.push(proposal);
        }

        Ok(LineOutcome {
            record_id: record.id,
            proposals,
            best,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, MatchState};
    use bigdecimal::BigDecimal;

    fn sample_record() -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            batch_id: None,
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

    #[test]
    fn add_record_takes_ownership() {
        let mut batch = Batch::new("March", Uuid::new_v4());
        batch.add_record(sample_record());
        assert_eq!(batch.records()[0].batch_id, Some(batch.id));
        assert_eq!(batch.line_count(), 1);
    }

    #[test]
    fn matching_requires_lines() {
        let mut batch = Batch::new("Empty", Uuid::new_v4());
        let err = batch.begin_matching();
        assert!(matches!(err, Err(ReconcileError::Validation(_))));
        assert_eq!(batch.state(), BatchState::Draft);
    }

    #[test]
    fn reconcile_requires_review_state_and_lines() {
        let mut batch = Batch::new("Guarded", Uuid::new_v4());
        assert!(batch.mark_reconciled().is_err());

        batch.add_record(sample_record());
        // Still in Draft, not Review
        let err = batch.mark_reconciled();
        assert!(matches!(err, Err(ReconcileError::InvalidTransition(_))));
        assert_eq!(batch.state(), BatchState::Draft);

        batch.begin_matching().unwrap();
        batch.move_to_review().unwrap();
        batch.mark_reconciled().unwrap();
        assert_eq!(batch.state(), BatchState::Reconciled);
    }

    #[test]
    fn rematch_is_allowed_from_review() {
        let mut batch = Batch::new("Rematch", Uuid::new_v4());
        batch.add_record(sample_record());
        batch.begin_matching().unwrap();
        batch.move_to_review().unwrap();

        batch.begin_matching().unwrap();
        assert_eq!(batch.state(), BatchState::Matching);
    }

    #[test]
    fn matching_rejected_once_reconciled() {
        let mut batch = Batch::new("Done", Uuid::new_v4());
        batch.add_record(sample_record());
        batch.begin_matching().unwrap();
        batch.move_to_review().unwrap();
        batch.mark_reconciled().unwrap();

        let err = batch.begin_matching();
        assert!(matches!(err, Err(ReconcileError::InvalidTransition(_))));
        assert_eq!(batch.state(), BatchState::Reconciled);
    }

    #[test]
    fn reset_to_draft_is_unconditional() {
        let mut batch = Batch::new("Undo", Uuid::new_v4());
        batch.add_record(sample_record());
        batch.begin_matching().unwrap();
        batch.move_to_review().unwrap();
        batch.mark_reconciled().unwrap();

        batch.reset_to_draft();
        assert_eq!(batch.state(), BatchState::Draft);
    }

    #[test]
    fn date_range_must_be_ordered() {
        let mut batch = Batch::new("Dates", Uuid::new_v4());
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        batch.set_date_range(Some(jan), Some(feb)).unwrap();
        let err = batch.set_date_range(Some(feb), Some(jan));
        assert!(matches!(err, Err(ReconcileError::Validation(_))));
        // Prior range untouched after the rejection
        assert_eq!(batch.date_range(), (Some(jan), Some(feb)));
    }

    #[test]
    fn matched_percentage_is_proposals_over_lines() {
        let mut batch = Batch::new("Pct", Uuid::new_v4());
        assert_eq!(batch.matched_percentage(), 0.0);

        batch.add_record(sample_record());
        batch.add_record(sample_record());
        batch.set_proposal_count(3);
        assert_eq!(batch.matched_percentage(), 150.0);
    }
}
