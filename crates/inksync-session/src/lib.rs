//! Session identity and local undo history for inksync.

pub mod history;
pub mod identity;

pub use history::{History, DEFAULT_HISTORY_DEPTH};
pub use identity::{ClientId, Session};
