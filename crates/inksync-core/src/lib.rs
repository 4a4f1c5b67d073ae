//! Core types for inksync: the element model, gesture drafts and the
//! element collection shared between clients.

pub mod coalesce;
pub mod collection;
pub mod draft;
pub mod element;
pub mod error;

pub use coalesce::{MoveCoalescer, DEFAULT_MOVE_INTERVAL};
pub use collection::{Appended, Collection};
pub use draft::{Draft, Tool};
pub use element::{Element, ElementId, ElementPatch, FontStyle, Point, Shape, Style};
pub use error::SnapshotError;
