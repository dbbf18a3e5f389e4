//! ngrename: cross-file symbol rename for Angular-style component projects.
//!
//! Renames components, fields, template locals, pipes and modules across
//! TypeScript and HTML files, moving derived files along with their symbol.

// Core infrastructure - re-exported from ngrename-core
pub use ngrename_core::apply;
pub use ngrename_core::diff;
pub use ngrename_core::facts;
pub use ngrename_core::patch;
pub use ngrename_core::text;
pub use ngrename_core::types;
pub use ngrename_core::workspace;

// Angular support
pub use ngrename_angular as angular;

// Front door
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
