//! End-to-end tests driving the monitor through whole polling cycles.

mod cycle;
mod mock_market;
