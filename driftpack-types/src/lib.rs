//! Core type definitions for Driftpack.
//!
//! This crate defines the fundamental, handler-agnostic types used throughout
//! the content engine:
//! - Document references ([`DocRef`]) — the (type, uuid, name) identity of a
//!   document wherever it travels: pipeline layers, descriptor files, the
//!   live hierarchy.
//! - Slash-delimited tree paths as used by descriptor files.
//! - Severity-tagged [`Message`]s for per-document reporting.
//!
//! Domain-specific document payloads and handler contracts belong in
//! `driftpack-model`, not here.

mod docref;
mod message;
mod path;

pub use docref::{DocRef, FOLDER_TYPE, SYSTEM_TYPE};
pub use message::{Message, Severity};
pub use path::{append_path, split_path};
