//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate normalization, scheduling and repository calls into
//!   use-case level APIs.
//! - Keep the HTTP layer decoupled from storage details.

pub mod annotation_service;
