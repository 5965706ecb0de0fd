//! Database module for the PhotoFlow server
//!
//! This module handles database connections, migrations,
//! and data access layer operations.

pub mod models;
pub mod operations;

pub use models::{Image, RefreshTokenRecord, User};
pub use operations::DbOperations;
