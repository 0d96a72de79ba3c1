//! Core types for Pagermart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credential;
pub mod email;
pub mod id;
pub mod status;

pub use credential::Credential;
pub use email::{Email, EmailError};
pub use id::*;
pub use status::UnitStatus;
