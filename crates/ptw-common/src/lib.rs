//! PTW Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling, logging, and warehouse vocabulary for the PTW
//! workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used across all PTW workspace
//! members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Centralized tracing setup for all binaries
//! - **Types**: Shared warehouse vocabulary (destination tables)

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{PtwError, Result};
