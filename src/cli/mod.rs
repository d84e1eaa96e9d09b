//! Command-line interface module
//!
//! Handles argument parsing and CLI commands

pub mod args;
pub mod commands;
pub mod document;

pub use args::*;
pub use commands::*;
pub use document::{Document, document_binder};
