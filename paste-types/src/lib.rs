//! # paste-types
//!
//! Shared types for pastebin-sync.
//!
//! This crate provides the foundational types used across all pastebin-sync crates:
//! - [`Paste`], [`User`] - The cached entry and the single stored session
//! - [`Outcome`], [`Failure`], [`ClientFault`] - Cross-layer results
//! - [`api`] - Wire format of the remote pastebin API

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
mod model;
mod outcome;

pub use model::{is_valid_title, unix_now, Paste, User};
pub use outcome::{ClientFault, Failure, Outcome, RECOVERABLE_STATUS_CODES};
