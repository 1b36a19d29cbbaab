//! Scripta Shared Types and Utilities
//!
//! This crate contains database helpers and row types shared across the
//! Scripta platform.

pub mod db;
pub mod types;

pub use db::*;
pub use types::*;
