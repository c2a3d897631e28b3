//! Repository abstraction (persistence gateway) and identifier allocation.

mod in_memory;

pub use in_memory::InMemoryRepository;

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use sharplite_core::{DomainError, Entity};
use thiserror::Error;
use uuid::Uuid;

/// Repository operation error.
///
/// These are **infrastructure errors** (storage, id allocation) as opposed to the
/// domain errors raised by entities themselves, which are wrapped as `Domain`.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{entity_type} is transient and this repository does not allocate identifiers")]
    MissingId { entity_type: &'static str },

    #[error("identifier space exhausted for {entity_type}")]
    IdExhausted { entity_type: &'static str },

    #[error("{entity_type} with id {id} not found")]
    NotFound { entity_type: &'static str, id: String },

    #[error("storage failure: {0}")]
    Storage(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Persistence gateway for one entity type.
///
/// `save_or_update` decides between insert and update with `Entity::is_transient`:
/// transient entities receive an identifier and are inserted, persisted ones
/// replace the stored row with the same identifier.
pub trait Repository<E: Entity>: Send + Sync {
    /// Load an entity by identifier.
    fn get(&self, id: &E::Id) -> Result<Option<E>, RepositoryError>;

    /// Load every stored entity (no particular order).
    fn get_all(&self) -> Result<Vec<E>, RepositoryError>;

    /// Insert a transient entity or update a persisted one; returns the stored state.
    fn save_or_update(&self, entity: E) -> Result<E, RepositoryError>;

    fn delete(&self, entity: &E) -> Result<(), RepositoryError>;
}

impl<E, S> Repository<E> for Arc<S>
where
    E: Entity,
    S: Repository<E> + ?Sized,
{
    fn get(&self, id: &E::Id) -> Result<Option<E>, RepositoryError> {
        (**self).get(id)
    }

    fn get_all(&self) -> Result<Vec<E>, RepositoryError> {
        (**self).get_all()
    }

    fn save_or_update(&self, entity: E) -> Result<E, RepositoryError> {
        (**self).save_or_update(entity)
    }

    fn delete(&self, entity: &E) -> Result<(), RepositoryError> {
        (**self).delete(entity)
    }
}

/// Source of identifiers for newly inserted entities.
pub trait IdAllocator<Id>: Send + Sync {
    fn allocate(&self, entity_type: &'static str) -> Result<Id, RepositoryError>;
}

/// Database-sequence style identifiers: 1, 2, 3, ...
///
/// Works for any identifier convertible from `i64` (`i32`, `i64`, `u64`, integer
/// newtypes).
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicI64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: TryFrom<i64>> IdAllocator<Id> for SequentialIds {
    fn allocate(&self, entity_type: &'static str) -> Result<Id, RepositoryError> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        Id::try_from(raw).map_err(|_| RepositoryError::IdExhausted { entity_type })
    }
}

/// Time-ordered UUIDv7 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7Ids;

impl<Id: From<Uuid>> IdAllocator<Id> for UuidV7Ids {
    fn allocate(&self, _entity_type: &'static str) -> Result<Id, RepositoryError> {
        Ok(Id::from(Uuid::now_v7()))
    }
}

/// Identifiers are assigned by the caller; saving a transient entity is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssignedIds;

impl<Id> IdAllocator<Id> for AssignedIds {
    fn allocate(&self, entity_type: &'static str) -> Result<Id, RepositoryError> {
        Err(RepositoryError::MissingId { entity_type })
    }
}
