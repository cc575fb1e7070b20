//! PDF Template Server Library
//!
//! Upload a PDF whose text contains `{{placeholder}}` markers, then fill it
//! with values and download the re-rendered result. The server binary is in
//! main.rs; the library exposes the pieces for integration tests.
//!
//! # Modules
//!
//! - `template`: Placeholder scanning and substitution
//! - `pdf`: Text extraction and flat re-rendering via lopdf
//! - `storage`: Uploaded templates, single-use artifacts, retention
//! - `routes`: HTTP endpoints

pub mod config;
pub mod error;
pub mod pdf;
pub mod routes;
pub mod state;
pub mod storage;
pub mod template;

pub use config::Config;
pub use routes::build_router;
pub use state::AppState;
