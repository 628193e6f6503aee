//! Session state: the in-memory history and the application state machine.

mod history;
mod state;

pub use history::SessionHistory;
pub use state::{AppState, SubmitOutcome, ValidationError, UNKNOWN_ERROR_MESSAGE};
