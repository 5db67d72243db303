//! # folio-core
//!
//! Core types, traits, and abstractions for the folio document service.
//!
//! This crate provides the domain model of the document tree (documents with
//! materialized paths and sibling ordering, tags, metadata), the error
//! taxonomy, and the repository traits that storage backends implement.
//! It contains no database code.

pub mod defaults;
pub mod error;
pub mod ids;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use ids::{is_v7, new_v7};
pub use models::*;
pub use traits::*;
