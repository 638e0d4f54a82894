//! Utility modules

pub mod amount;
pub mod memory_store;

pub use amount::{amounts_equal, round_to_precision};
pub use memory_store::{
    CollectingNotifier, MemoryLedgerStore, NoReconcileModels, StaticReconcileModels,
};
