//! `sharplite-core` — entity identity and domain-signature equality.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifier contracts, the per-type signature registry, and the equality/hash
//! rules for comparable objects and entities.

pub mod comparable;
pub mod entity;
pub mod error;
pub mod hash;
pub mod id;
pub mod proxy;
pub mod signature;

pub use comparable::ComparableObject;
pub use entity::{Entity, Identity};
pub use error::{DomainError, DomainResult};
pub use id::EntityId;
pub use proxy::Unproxy;
pub use signature::{
    DomainSignature, SignatureProperty, SignatureValue, signature_properties, signature_values,
};

#[doc(hidden)]
pub mod __private {
    pub use serde;
}
