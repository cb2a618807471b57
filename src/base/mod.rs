//! Foundation types for the sylva engine.
//!
//! This module provides the primitives everything else builds on:
//! - [`TextRange`], [`TextSize`] - byte offsets and ranges (re-exported from
//!   `text-size`)
//! - [`Point`] - 0-indexed row/column coordinates
//! - [`InputEdit`], [`EditList`], [`EditError`] - validated text edits and
//!   old-to-new coordinate transforms
//!
//! This module has NO dependencies on other sylva modules.

mod edit;
mod point;

pub use edit::{EditError, EditList, InputEdit};
pub use point::Point;
pub use text_size::{TextRange, TextSize};

// Re-export the text-size crate for downstream type matching
pub use text_size;
