//! PDF text extraction and flat re-rendering
//!
//! Both halves are thin wrappers over `lopdf`. Everything here is
//! synchronous and CPU-bound; callers in async context should run it on
//! `tokio::task::spawn_blocking`.

pub mod error;
pub mod extract;
pub mod render;

pub use error::{PdfError, PdfResult};
pub use extract::extract_text;
pub use render::{render_fresh, render_over, PageSize};
