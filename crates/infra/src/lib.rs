//! `sharplite-infra` — in-memory persistence collaborators for the identity engine.
//!
//! - `repository`: the persistence gateway (get/list/save-or-update/delete), choosing
//!   insert vs update from `Entity::is_transient`.
//! - `duplicate`: signature-based duplicate detection.
//! - `validation`: the unique-domain-signature rule built on a duplicate checker.

pub mod duplicate;
pub mod repository;
pub mod validation;

pub use duplicate::{EntityDuplicateChecker, Restriction, SignatureCriteria, SignatureCriterion};
pub use repository::{
    AssignedIds, IdAllocator, InMemoryRepository, Repository, RepositoryError, SequentialIds,
    UuidV7Ids,
};
pub use validation::{UniqueSignatureValidator, ValidationError};
