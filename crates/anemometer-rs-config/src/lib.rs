//! Data-source definitions for slow-query-log monitoring.
//!
//! This crate owns the typed data-source record, its validation rules, and
//! the loader that turns JSON5 definitions (single files, layered files, or
//! rendered deployment templates) into immutable records.

mod error;
mod loader;
mod model;

/// Public error type returned by loading and validation APIs.
pub use error::{ConfigError, ErrorKind};
/// Loader, definition sources and template rendering.
pub use loader::{
    ConfigLoader, DefinitionLayer, DefinitionSet, DefinitionSource, LayerSource,
    LayeredDefinitionOptions, render_template,
};
/// Data-source record types.
pub use model::*;
