//! Core engine: the quote, signal, ledger and alert cycle.

pub mod alerts;
pub mod ledger;
pub mod monitor;

pub use alerts::{AlertDispatcher, AlertEvent, PromptContext};
pub use ledger::{Ledger, LedgerError, Position, Valuation};
pub use monitor::{CycleReport, Monitor};
