//! Decision rules: moving-average signal and options screening.
//!
//! Both are pure: they read snapshots supplied by the engine and own no
//! persistent state.

pub mod options;
pub mod signal;

pub use options::{OptionCandidate, OptionsScreener, ScreenerConfig};
pub use signal::{Action, SignalConfig, SignalEvaluator, TradeSignal};
