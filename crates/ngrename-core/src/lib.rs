//! Core infrastructure for ngrename.
//!
//! This crate provides language-agnostic infrastructure:
//! - Facts store: symbol table and reference index
//! - Rename plan IR (edits, file renames, preconditions)
//! - Transactional edit applier
//! - In-memory workspace buffers and on-disk persistence
//! - File lock table for serializing renames
//! - Error types and error codes
//! - Text utilities and diff generation
//! - File handler trait for pluggable file kinds

pub mod adapter;
pub mod apply;
pub mod diff;
pub mod error;
pub mod facts;
pub mod lock;
pub mod patch;
pub mod text;
pub mod types;
pub mod workspace;
