//! Duplicate detection by domain signature.
//!
//! A duplicate is any *other* stored entity (different identifier) whose signature
//! values match the candidate's. Matching is deliberately looser than equality:
//! text compares case-insensitively, and unset timestamps match absent ones.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sharplite_core::{Entity, SignatureValue, signature_values};

use crate::repository::RepositoryError;

/// Answers whether another entity with the same domain signature is already stored.
pub trait EntityDuplicateChecker<E: Entity>: Send + Sync {
    fn does_duplicate_exist(&self, entity: &E) -> Result<bool, RepositoryError>;
}

impl<E, S> EntityDuplicateChecker<E> for Arc<S>
where
    E: Entity,
    S: EntityDuplicateChecker<E> + ?Sized,
{
    fn does_duplicate_exist(&self, entity: &E) -> Result<bool, RepositoryError> {
        (**self).does_duplicate_exist(entity)
    }
}

/// How one signature property of a stored row must look to count as a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restriction {
    Equals(SignatureValue),
    /// Exact text match ignoring case (stored lowercased).
    EqualsIgnoreCase(String),
    IsNull,
}

impl Restriction {
    fn for_value(value: SignatureValue) -> Self {
        match value {
            SignatureValue::Null => Self::IsNull,
            SignatureValue::Text(text) => Self::EqualsIgnoreCase(text.to_lowercase()),
            SignatureValue::Timestamp(at) if is_unset(&at) => Self::IsNull,
            other => Self::Equals(other),
        }
    }

    pub fn admits(&self, value: &SignatureValue) -> bool {
        match (self, value) {
            (Self::IsNull, SignatureValue::Null) => true,
            (Self::IsNull, SignatureValue::Timestamp(at)) => is_unset(at),
            (Self::IsNull, _) => false,
            (Self::EqualsIgnoreCase(expected), SignatureValue::Text(text)) => {
                text.to_lowercase() == *expected
            }
            (Self::EqualsIgnoreCase(_), _) => false,
            (Self::Equals(expected), value) => expected == value,
        }
    }
}

/// Only the default instant itself means "never set".
fn is_unset(at: &DateTime<Utc>) -> bool {
    *at == DateTime::<Utc>::default()
}

/// One named restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureCriterion {
    pub property: &'static str,
    pub restriction: Restriction,
}

/// Filter selecting rows that duplicate a given entity's signature.
#[derive(Debug, Clone)]
pub struct SignatureCriteria<E: Entity> {
    excluded_id: E::Id,
    criteria: Vec<SignatureCriterion>,
}

impl<E: Entity> SignatureCriteria<E> {
    /// Build the filter from the entity's current signature values, excluding the
    /// entity's own identifier.
    pub fn for_entity(entity: &E) -> Self {
        let criteria = signature_values(entity)
            .into_iter()
            .map(|(property, value)| SignatureCriterion {
                property,
                restriction: Restriction::for_value(value),
            })
            .collect();

        Self {
            excluded_id: entity.id().clone(),
            criteria,
        }
    }

    pub fn criteria(&self) -> &[SignatureCriterion] {
        &self.criteria
    }

    /// Whether `candidate` is a duplicate. With no signature properties every other
    /// row matches.
    pub fn matches(&self, candidate: &E) -> bool {
        if *candidate.id() == self.excluded_id {
            return false;
        }

        signature_values(candidate)
            .iter()
            .zip(&self.criteria)
            .all(|((_, value), criterion)| criterion.restriction.admits(value))
    }
}
