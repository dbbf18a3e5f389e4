//! Angular support for ngrename.
//!
//! - File handlers for TypeScript logic files and HTML templates
//! - Identifier grammar and naming-convention policy
//! - Rename validation and planning
//! - [`RenameEngine`]: the locked validate → confirm → plan → apply pipeline

pub mod engine;
pub mod handlers;
pub mod logic;
pub mod naming;
pub mod ops;
pub mod scan;
pub mod template;
pub mod validation;

pub use engine::{RenameEngine, RenameOutcome};
pub use handlers::{Handler, SUPPORTED_EXTENSIONS};
pub use naming::{FileNameStyle, NamingPolicy};
pub use ops::{
    ConfirmationHandler, ConfirmationReason, Decision, LiteralPolicy, RejectReason,
    RenameContext, RenameOptions,
};
