//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Artifact question answering and rewrites.
pub mod artifact;
/// Collection listing and health check.
pub mod collections;
/// Query planning and report generation handlers.
pub mod research;
