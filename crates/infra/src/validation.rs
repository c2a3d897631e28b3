//! Unique domain signature validation.

use core::any::type_name;

use sharplite_core::{Entity, signature_values};
use thiserror::Error;
use tracing::debug;

use crate::duplicate::EntityDuplicateChecker;
use crate::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("another {entity_type} already has the domain signature {signature}")]
    DuplicateSignature {
        entity_type: &'static str,
        signature: String,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Rejects entities whose domain signature is already taken by another stored entity.
///
/// The checker is passed in explicitly; there is no ambient lookup.
#[derive(Debug, Clone)]
pub struct UniqueSignatureValidator<C> {
    checker: C,
}

impl<C> UniqueSignatureValidator<C> {
    pub fn new(checker: C) -> Self {
        Self { checker }
    }

    pub fn validate<E>(&self, entity: &E) -> Result<(), ValidationError>
    where
        E: Entity,
        C: EntityDuplicateChecker<E>,
    {
        if !self.checker.does_duplicate_exist(entity)? {
            return Ok(());
        }

        let entity_type = type_name::<E>();
        let signature = signature_values(entity)
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        debug!(entity_type, %signature, "duplicate domain signature");

        Err(ValidationError::DuplicateSignature {
            entity_type,
            signature: format!("{{{signature}}}"),
        })
    }
}
