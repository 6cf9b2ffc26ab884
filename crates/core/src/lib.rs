//! Shared building blocks for the warehouse domain crates.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod concurrency;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use concurrency::ExpectedVersion;
pub use entity::{Entity, Versioned};
pub use error::{DomainError, DomainResult};
pub use id::{EntityId, UserId};
pub use value_object::ValueObject;
