//! Pipeline orchestration
//!
//! Runs each tier on its own interval, hands results upward through shared
//! state and publishes them to the collaborators.

mod orchestrator;
mod scanner;
mod state;

pub use orchestrator::Pipeline;
pub use scanner::{ScanOutput, Scanner};
pub use state::ScanState;
