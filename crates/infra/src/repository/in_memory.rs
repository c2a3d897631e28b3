use core::any::type_name;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use sharplite_core::Entity;
use tracing::debug;

use super::{IdAllocator, Repository, RepositoryError, SequentialIds};
use crate::duplicate::{EntityDuplicateChecker, SignatureCriteria};

/// In-memory repository keyed by entity identifier.
///
/// Stores clones; callers get clones back. Intended for tests/dev.
#[derive(Debug)]
pub struct InMemoryRepository<E: Entity, A = SequentialIds> {
    rows: RwLock<HashMap<E::Id, E>>,
    ids: A,
}

impl<E: Entity> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self::with_allocator(SequentialIds::new())
    }
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity, A> InMemoryRepository<E, A> {
    pub fn with_allocator(ids: A) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            ids,
        }
    }

    pub fn len(&self) -> usize {
        // Every write is a single map operation, so a poisoned guard still holds whole rows.
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Storage("lock poisoned".to_string())
}

impl<E, A> Repository<E> for InMemoryRepository<E, A>
where
    E: Entity + Clone + Send + Sync,
    A: IdAllocator<E::Id>,
{
    fn get(&self, id: &E::Id) -> Result<Option<E>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(id).cloned())
    }

    fn get_all(&self) -> Result<Vec<E>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.values().cloned().collect())
    }

    fn save_or_update(&self, mut entity: E) -> Result<E, RepositoryError> {
        let entity_type = type_name::<E>();
        let inserting = entity.is_transient();
        if inserting {
            let id = self.ids.allocate(entity_type)?;
            entity.assign_id(id)?;
        }

        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let previous = rows.insert(entity.id().clone(), entity.clone());
        debug!(
            entity_type,
            id = ?entity.id(),
            inserted = inserting || previous.is_none(),
            "saved entity"
        );

        Ok(entity)
    }

    fn delete(&self, entity: &E) -> Result<(), RepositoryError> {
        let entity_type = type_name::<E>();
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        match rows.remove(entity.id()) {
            Some(_) => {
                debug!(entity_type, id = ?entity.id(), "deleted entity");
                Ok(())
            }
            None => Err(RepositoryError::NotFound {
                entity_type,
                id: format!("{:?}", entity.id()),
            }),
        }
    }
}

impl<E, A> EntityDuplicateChecker<E> for InMemoryRepository<E, A>
where
    E: Entity + Send + Sync,
    A: Send + Sync,
{
    fn does_duplicate_exist(&self, entity: &E) -> Result<bool, RepositoryError> {
        let criteria = SignatureCriteria::for_entity(entity);
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.values().any(|candidate| criteria.matches(candidate)))
    }
}
