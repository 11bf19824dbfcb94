//! Domain model for course annotations.
//!
//! # Responsibility
//! - Define the canonical annotation record and its value types.
//! - Keep field-level validation next to the data it guards.
//!
//! # Invariants
//! - Every annotation is identified by a stable `AnnotationId`.
//! - `canonical_timestamp` is an absolute UTC instant, never local wall time.
//! - Deletion is a hard delete; there are no tombstones.

pub mod annotation;
