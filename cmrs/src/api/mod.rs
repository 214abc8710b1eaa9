//! Public API module.
//!
//! This module contains the high-level user-facing API for the `cmrs` crate.

pub mod builders;
pub mod config;
pub mod models;
pub mod panel;
