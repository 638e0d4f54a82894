//! Basic matching example: build a small ledger, run a batch, print the
//! ranked proposals.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use uuid::Uuid;

use reconcile_core::utils::{CollectingNotifier, MemoryLedgerStore, NoReconcileModels};
use reconcile_core::{
    AccountRef, Batch, BatchOrchestrator, Counterparty, Currency, Journal, JournalKind,
    LedgerEntry, MatchState, MatchingConfig, MoveState, TransactionRecord,
};

#[tokio::main]
async fn main() {
    let company_id = Uuid::new_v4();
    let main_bank = Journal::new(Uuid::new_v4(), "Main Bank", company_id, JournalKind::Bank);
    let savings = Journal::new(Uuid::new_v4(), "Savings", company_id, JournalKind::Bank);

    let store = MemoryLedgerStore::new();
    store.add_journal(main_bank.clone());
    store.add_journal(savings.clone());

    let statement_date = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
    let acme = Counterparty::new(Uuid::new_v4(), "Acme Corp");

    // An open receivable that matches the first statement line exactly
    store.add_entry(LedgerEntry {
        id: Uuid::new_v4(),
        move_id: Uuid::new_v4(),
        journal_id: main_bank.id,
        company_id,
        account: AccountRef {
            id: Uuid::new_v4(),
            reconcilable: true,
        },
        date: statement_date,
        debit: BigDecimal::from_str("1250.00").unwrap(),
        credit: BigDecimal::from(0),
        counterparty: Some(acme.clone()),
        payment_ref: Some("INV-2024-0042".to_string()),
        move_ref: None,
        move_state: MoveState::Posted,
        full_reconcile_id: None,
    });

    // The outgoing leg of a transfer to the savings account
    store.add_entry(LedgerEntry {
        id: Uuid::new_v4(),
        move_id: Uuid::new_v4(),
        journal_id: savings.id,
        company_id,
        account: AccountRef {
            id: Uuid::new_v4(),
            reconcilable: true,
        },
        date: statement_date,
        debit: BigDecimal::from(0),
        credit: BigDecimal::from_str("5000.00").unwrap(),
        counterparty: None,
        payment_ref: None,
        move_ref: None,
        move_state: MoveState::Posted,
        full_reconcile_id: None,
    });

    let mut batch = Batch::new("June statement", company_id);
    for (amount, counterparty, payment_ref) in [
        ("1250.00", Some(acme), Some("INV-2024-0042")),
        ("5000.00", None, None),
        ("73.10", None, None),
    ] {
        batch.add_record(TransactionRecord {
            id: Uuid::new_v4(),
            batch_id: None,
            journal_id: main_bank.id,
            company_id,
            amount: BigDecimal::from_str(amount).unwrap(),
            date: statement_date,
            currency: Currency::new("USD", 2),
            counterparty,
            payment_ref: payment_ref.map(str::to_string),
            match_state: MatchState::Unmatched,
            match_score: None,
            suggested_move_id: None,
        });
    }

    let mut orchestrator = BatchOrchestrator::new(
        store.clone(),
        NoReconcileModels,
        CollectingNotifier::new(),
        MatchingConfig::default(),
    );

    let summary = orchestrator
        .start_matching(&mut batch)
        .await
        .expect("matching failed");

    println!("Matching completed for '{}':", batch.name);
    println!("  safe:      {}", summary.safe);
    println!("  probable:  {}", summary.probable);
    println!("  doubtful:  {}", summary.doubtful);
    println!("  unmatched: {}", summary.unmatched);
    println!();

    for proposal in store.proposals_for_batch(batch.id) {
        println!(
            "  [{:>6.2}] {:?} - {}",
            proposal.score, proposal.match_type, proposal.reason
        );
    }
}
