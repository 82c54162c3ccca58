//! HTTP surface for the annotation backend.
//!
//! # Responsibility
//! - Map the annotation UI's routes onto core use-cases.
//! - Own the process-wide state handed to every handler.

mod api;
mod state;

pub use api::{router, ApiError, BILUO_REJECTED_MESSAGE};
pub use state::AppState;
