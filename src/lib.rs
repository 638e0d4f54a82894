//! # Reconcile Core
//!
//! A bank reconciliation matching library providing candidate search,
//! weighted confidence scoring, and batch orchestration over unmatched
//! bank statement lines.
//!
//! ## Features
//!
//! - **Candidate search**: eligibility-filtered ledger queries with
//!   currency-precision amount matching
//! - **Confidence scoring**: weighted four-factor model (amount,
//!   counterparty, reference, date) producing scores in [0, 100]
//! - **Internal-transfer detection**: mirrored-leg search across sibling
//!   bank journals with a narrow date window
//! - **Batch orchestration**: guarded state machine, idempotent
//!   re-matching, and per-line parallel candidate search
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   collaborators
//!
//! ## Quick Start
//!
//! ```rust
//! use reconcile_core::{BatchOrchestrator, MatchingConfig};
//! use reconcile_core::utils::{CollectingNotifier, MemoryLedgerStore, NoReconcileModels};
//!
//! // Wire the orchestrator against any storage backend implementing the
//! // collaborator traits; the in-memory store works out of the box.
//! let store = MemoryLedgerStore::new();
//! let orchestrator = BatchOrchestrator::new(
//!     store,
//!     NoReconcileModels,
//!     CollectingNotifier::new(),
//!     MatchingConfig::default(),
//! );
//! # let _ = orchestrator;
//! ```

pub mod batch;
pub mod engine;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use batch::{Batch, BatchOrchestrator, BatchState, MatchingConfig};
pub use engine::{
    Candidate, CandidateSource, Classification, EngineConfig, MatchEngine, Scorer,
};
pub use traits::*;
pub use types::*;
