//! In-memory collaborator implementations for testing and development

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// In-memory ledger and proposal store
///
/// Implements the read side ([`LedgerQuery`]) and the write side
/// ([`ProposalStore`]) over shared maps, so a cloned handle can serve the
/// engine and the orchestrator at once.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    entries: Arc<RwLock<HashMap<Uuid, LedgerEntry>>>,
    journals: Arc<RwLock<HashMap<Uuid, Journal>>>,
    proposals: Arc<RwLock<HashMap<Uuid, Vec<MatchProposal>>>>,
    records: Arc<RwLock<HashMap<Uuid, TransactionRecord>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
        self.journals.write().unwrap().clear();
        self.proposals.write().unwrap().clear();
        self.records.write().unwrap().clear();
    }

    pub fn add_entry(&self, entry: LedgerEntry) {
        self.entries.write().unwrap().insert(entry.id, entry);
    }

    pub fn add_journal(&self, journal: Journal) {
        self.journals.write().unwrap().insert(journal.id, journal);
    }

    /// Mark a stored entry as settled so it drops out of eligibility
    pub fn settle_entry(&self, entry_id: Uuid, full_reconcile_id: Uuid) {
        if let Some(entry) = self.entries.write().unwrap().get_mut(&entry_id) {
            entry.full_reconcile_id = Some(full_reconcile_id);
        }
    }

    /// All persisted proposals for a batch, in persistence order
    pub fn proposals_for_batch(&self, batch_id: Uuid) -> Vec<MatchProposal> {
        self.proposals
            .read()
            .unwrap()
            .get(&batch_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Last persisted snapshot of a statement line
    pub fn persisted_record(&self, record_id: Uuid) -> Option<TransactionRecord> {
        self.records.read().unwrap().get(&record_id).cloned()
    }
}

#[async_trait]
impl LedgerQuery for MemoryLedgerStore {
    async fn eligible_entries(&self, query: &EntryQuery) -> ReconcileResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().unwrap();
        let matching = entries
            .values()
            .filter(|entry| {
                entry.is_open_for_matching()
                    && entry.company_id == query.company_id
                    && entry.date >= query.date_from
                    && entry.date <= query.date_to
                    && query
                        .counterparty_id
                        .is_none_or(|cp| entry.counterparty.as_ref().map(|c| c.id) == Some(cp))
                    && query
                        .journal_ids
                        .as_ref()
                        .is_none_or(|ids| ids.contains(&entry.journal_id))
            })
            .cloned()
            .collect();
        Ok(matching)
    }

    async fn bank_journals(&self, company_id: Uuid) -> ReconcileResult<Vec<Journal>> {
        let journals = self.journals.read().unwrap();
        let banks = journals
            .values()
            .filter(|j| j.company_id == company_id && j.kind == JournalKind::Bank)
            .cloned()
            .collect();
        Ok(banks)
    }
}

#[async_trait]
impl ProposalStore for MemoryLedgerStore {
    async fn discard_batch_proposals(&mut self, batch_id: Uuid) -> ReconcileResult<()> {
        self.proposals.write().unwrap().remove(&batch_id);
        Ok(())
    }

    async fn persist_line_match(
        &mut self,
        record: &TransactionRecord,
        proposals: &[MatchProposal],
    ) -> ReconcileResult<()> {
        let batch_id = record.batch_id.ok_or_else(|| {
            ReconcileError::Validation(format!("Record {} is not assigned to a batch", record.id))
        })?;

        let mut store = self.proposals.write().unwrap();
        let existing = store.entry(batch_id).or_default();

        // Validate the whole unit before touching anything, so the insert
        // is all-or-nothing.
        let mut seen_pairs: Vec<Uuid> = existing
            .iter()
            .filter(|p| p.record_id == record.id)
            .map(|p| p.entry_id)
            .collect();
        for proposal in proposals {
            if proposal.record_id != record.id || proposal.batch_id != batch_id {
                return Err(ReconcileError::Validation(format!(
                    "Proposal {} does not belong to record {} in batch {batch_id}",
                    proposal.id, record.id
                )));
            }
            if !(0.0..=100.0).contains(&proposal.score) {
                return Err(ReconcileError::Validation(format!(
                    "Match score must be between 0 and 100. Got: {}",
                    proposal.score
                )));
            }
            if seen_pairs.contains(&proposal.entry_id) {
                return Err(ReconcileError::Validation(format!(
                    "Cannot suggest entry {} twice for record {}",
                    proposal.entry_id, record.id
                )));
            }
            seen_pairs.push(proposal.entry_id);
        }

        existing.extend_from_slice(proposals);
        self.records
            .write()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(())
    }
}

/// Model provider that contributes nothing
///
/// Use when no external reconcile models are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReconcileModels;

#[async_trait]
impl ReconcileModelProvider for NoReconcileModels {
    async fn model_candidates(
        &self,
        _record: &TransactionRecord,
    ) -> ReconcileResult<Vec<ModelCandidate>> {
        Ok(Vec::new())
    }
}

/// Model provider backed by a fixed map, keyed by record id
#[derive(Debug, Clone, Default)]
pub struct StaticReconcileModels {
    candidates: HashMap<Uuid, Vec<ModelCandidate>>,
}

impl StaticReconcileModels {
    pub fn new(candidates: HashMap<Uuid, Vec<ModelCandidate>>) -> Self {
        Self { candidates }
    }
}

#[async_trait]
impl ReconcileModelProvider for StaticReconcileModels {
    async fn model_candidates(
        &self,
        record: &TransactionRecord,
    ) -> ReconcileResult<Vec<ModelCandidate>> {
        Ok(self.candidates.get(&record.id).cloned().unwrap_or_default())
    }
}

/// Notification sink that collects summaries for inspection
#[derive(Debug, Clone, Default)]
pub struct CollectingNotifier {
    notifications: Arc<Mutex<Vec<(Uuid, MatchSummary)>>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<(Uuid, MatchSummary)> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for CollectingNotifier {
    async fn matching_completed(
        &self,
        batch_id: Uuid,
        summary: &MatchSummary,
    ) -> ReconcileResult<()> {
        self.notifications
            .lock()
            .unwrap()
            .push((batch_id, summary.clone()));
        Ok(())
    }
}
