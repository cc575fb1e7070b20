//! Placeholder handling for PDF templates
//!
//! Templates mark fillable slots with `{{name}}`. This module finds those
//! markers in extracted text and substitutes caller-supplied values.

pub mod placeholder;
pub mod substitute;

pub use placeholder::scan;
pub use substitute::{substitute, FieldValues};
