//! Middlebox data plane
//!
//! - Denylist loading and keyword matching
//! - Pure per-frame verdicts
//! - Async capture loop with cooperative cancellation

mod denylist;
mod filter;
mod listener;

pub use denylist::Denylist;
pub use filter::{MiddleboxFilter, Verdict};
pub use listener::{MiddleboxListener, RECV_BUFFER_SIZE};
