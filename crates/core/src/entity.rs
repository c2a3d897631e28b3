//! Entities: identity once persisted, domain signature before that.
//!
//! Equality for an entity follows two tiers:
//!
//! 1. values of different concrete types are never equal (proxies are resolved first);
//! 2. the same instance is always equal to itself;
//! 3. two persisted entities are equal iff their identifiers are equal;
//! 4. a persisted entity never equals a transient one;
//! 5. two transient entities are equal iff their signature values match. Without a
//!    declared signature, distinct transient instances are never equal.
//!
//! The hash is computed once per instance and then frozen. Transient entities hash
//! their signature (or their instance token without one); persisted entities hash
//! their type and identifier.

use core::any::{TypeId, type_name};
use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::{DomainError, DomainResult};
use crate::hash::{mix, type_hash, value_hash};
use crate::id::EntityId;
use crate::proxy::Unproxy;
use crate::signature::{
    DomainSignature, SignatureProperty, signature_eq, signature_hash, signature_properties,
};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

fn next_instance() -> u64 {
    NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)
}

/// Identity state embedded in every entity.
///
/// Holds the identifier, a per-instance token standing in for reference identity,
/// and the one-shot hash cache. Cloning produces a new instance: the clone gets a
/// fresh token and an empty cache.
pub struct Identity<Id> {
    id: Id,
    instance: u64,
    cached_hash: OnceLock<u64>,
}

impl<Id: EntityId> Identity<Id> {
    /// Identity of a not-yet-persisted entity.
    pub fn transient() -> Self {
        Self::with_id(Id::default())
    }

    /// Identity with a known identifier (loaded or assigned).
    pub fn with_id(id: Id) -> Self {
        Self {
            id,
            instance: next_instance(),
            cached_hash: OnceLock::new(),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn is_transient(&self) -> bool {
        self.id.is_default()
    }

    /// The memoized hash, if one has been computed.
    pub fn cached_hash(&self) -> Option<u64> {
        self.cached_hash.get().copied()
    }

    fn same_instance(&self, other: &Self) -> bool {
        self.instance == other.instance
    }
}

impl<Id: EntityId> Default for Identity<Id> {
    fn default() -> Self {
        Self::transient()
    }
}

impl<Id: EntityId> Clone for Identity<Id> {
    fn clone(&self) -> Self {
        Self::with_id(self.id.clone())
    }
}

impl<Id: fmt::Debug> fmt::Debug for Identity<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("cached_hash", &self.cached_hash.get())
            .finish()
    }
}

impl<Id: Serialize> Serialize for Identity<Id> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.id.serialize(serializer)
    }
}

impl<'de, Id: EntityId + Deserialize<'de>> Deserialize<'de> for Identity<Id> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Id::deserialize(deserializer).map(Self::with_id)
    }
}

/// An identified domain object.
///
/// Implementors embed an [`Identity`] and expose it; everything else has defaults.
///
/// ```ignore
/// struct Customer {
///     identity: Identity<i64>,
///     email: String,
/// }
///
/// impl DomainSignature for Customer {
///     fn declare_signature() -> Vec<SignatureProperty<Self>> {
///         vec![SignatureProperty::new("email", |c: &Customer| c.email.clone())]
///     }
/// }
///
/// impl Entity for Customer {
///     type Id = i64;
///     fn identity(&self) -> &Identity<i64> { &self.identity }
///     fn identity_mut(&mut self) -> &mut Identity<i64> { &mut self.identity }
/// }
///
/// sharplite_core::impl_entity_equality!(Customer);
/// ```
pub trait Entity: DomainSignature + Unproxy + Sized {
    /// Identifier type.
    type Id: EntityId;

    fn identity(&self) -> &Identity<Self::Id>;

    fn identity_mut(&mut self) -> &mut Identity<Self::Id>;

    fn id(&self) -> &Self::Id {
        self.identity().id()
    }

    /// Whether the identifier is still the type's default value.
    fn is_transient(&self) -> bool {
        self.identity().is_transient()
    }

    /// Overwrite the identifier without checks.
    ///
    /// Meant for assigned identifiers and test setup. Changing the identifier of a
    /// persisted entity whose hash is already cached leaves that hash stale.
    fn set_id(&mut self, id: Self::Id) {
        let identity = self.identity_mut();
        if !identity.is_transient() && identity.id != id && identity.cached_hash().is_some() {
            warn!(
                entity_type = type_name::<Self>(),
                old_id = ?identity.id,
                new_id = ?id,
                "persistent id changed after hash was cached"
            );
        }
        identity.id = id;
    }

    /// Set the identifier, refusing to change the identifier of a persisted entity.
    fn assign_id(&mut self, id: Self::Id) -> DomainResult<()> {
        if !self.is_transient() && *self.id() != id {
            return Err(DomainError::conflict(format!(
                "{} already has persistent id {:?}",
                type_name::<Self>(),
                self.id()
            )));
        }
        self.identity_mut().id = id;
        Ok(())
    }

    fn signature_properties(&self) -> Arc<[SignatureProperty<Self>]> {
        signature_properties::<Self>()
    }

    /// Both persisted and carrying the same identifier.
    fn has_same_non_default_id(&self, other: &Self) -> bool {
        !self.is_transient() && !other.is_transient() && self.id() == other.id()
    }

    /// Two-tier entity equality against any value (see the module docs).
    fn entity_eq(&self, other: &dyn Unproxy) -> bool {
        let Some(other) = other.unproxied().downcast_ref::<Self>() else {
            return false;
        };

        if self.identity().same_instance(other.identity()) {
            return true;
        }

        if self.has_same_non_default_id(other) {
            return true;
        }

        // A persisted entity cannot be the same object as a transient one, and two
        // persisted entities with different ids are different objects.
        if !self.is_transient() || !other.is_transient() {
            return false;
        }

        signature_eq(self, other).unwrap_or(false)
    }

    /// Memoized hash; computed on first call and never recomputed.
    fn entity_hash(&self) -> u64 {
        let identity = self.identity();
        *identity.cached_hash.get_or_init(|| {
            if identity.is_transient() {
                signature_hash(self).unwrap_or_else(|| value_hash(&identity.instance))
            } else {
                mix(type_hash(TypeId::of::<Self>()), value_hash(identity.id()))
            }
        })
    }
}

/// Implement `PartialEq`, `Eq`, `Hash` and [`Unproxy`] for entity types.
#[macro_export]
macro_rules! impl_entity_equality {
    ($($t:ty),+ $(,)?) => {
        $(
            impl $crate::Unproxy for $t {
                fn unproxied(&self) -> &dyn ::core::any::Any {
                    self
                }
            }

            impl ::core::cmp::PartialEq for $t {
                fn eq(&self, other: &Self) -> bool {
                    $crate::Entity::entity_eq(self, other)
                }
            }

            impl ::core::cmp::Eq for $t {}

            impl ::core::hash::Hash for $t {
                fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                    state.write_u64($crate::Entity::entity_hash(self));
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::any::Any;
    use std::collections::HashSet;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Customer {
        identity: Identity<i64>,
        email: Option<String>,
    }

    impl Customer {
        fn new(email: &str) -> Self {
            Self {
                identity: Identity::transient(),
                email: Some(email.to_string()),
            }
        }
    }

    impl DomainSignature for Customer {
        fn declare_signature() -> Vec<SignatureProperty<Self>> {
            vec![SignatureProperty::new("email", |c: &Customer| c.email.clone())]
        }
    }

    impl Entity for Customer {
        type Id = i64;

        fn identity(&self) -> &Identity<i64> {
            &self.identity
        }

        fn identity_mut(&mut self) -> &mut Identity<i64> {
            &mut self.identity
        }
    }

    crate::impl_entity_equality!(Customer);

    #[derive(Debug, Clone)]
    struct AuditEntry {
        identity: Identity<String>,
    }

    impl DomainSignature for AuditEntry {}

    impl Entity for AuditEntry {
        type Id = String;

        fn identity(&self) -> &Identity<String> {
            &self.identity
        }

        fn identity_mut(&mut self) -> &mut Identity<String> {
            &mut self.identity
        }
    }

    crate::impl_entity_equality!(AuditEntry);

    /// Stand-in handed out by a lazy loader.
    struct CustomerProxy {
        target: Customer,
    }

    impl Unproxy for CustomerProxy {
        fn unproxied(&self) -> &dyn Any {
            &self.target
        }
    }

    #[test]
    fn new_entities_are_transient() {
        let c = Customer::new("a@x.com");
        assert!(c.is_transient());
        assert_eq!(*c.id(), 0);
        assert_eq!(c.signature_properties().len(), 1);
    }

    #[test]
    fn transient_entities_compare_by_signature() {
        let a = Customer::new("a@x.com");
        let b = Customer::new("a@x.com");
        assert_eq!(a, b);
        assert_ne!(a, Customer::new("b@x.com"));
    }

    #[test]
    fn persisted_entities_compare_by_id() {
        let mut a = Customer::new("a@x.com");
        let mut b = Customer::new("b@x.com");
        a.set_id(5);
        b.set_id(5);
        assert_eq!(a, b);

        b.set_id(6);
        assert_ne!(a, b);
    }

    #[test]
    fn persisted_never_equals_transient() {
        let mut a = Customer::new("a@x.com");
        let b = Customer::new("a@x.com");
        a.set_id(1);
        assert_ne!(a, b);
        assert_ne!(b, a);
    }

    #[test]
    fn unsigned_transient_entities_are_only_equal_to_themselves() {
        let a = AuditEntry {
            identity: Identity::transient(),
        };
        let b = AuditEntry {
            identity: Identity::transient(),
        };
        assert_eq!(a, a);
        assert_ne!(a, b);
        assert_ne!(a, a.clone());
    }

    #[test]
    fn different_types_are_never_equal() {
        let c = Customer::new("a@x.com");
        let audit = AuditEntry {
            identity: Identity::with_id("a@x.com".to_string()),
        };
        assert!(!c.entity_eq(&audit));
    }

    #[test]
    fn proxies_resolve_to_the_real_type() {
        let mut real = Customer::new("a@x.com");
        real.set_id(9);
        let mut loaded = Customer::new("");
        loaded.set_id(9);
        let proxy = CustomerProxy { target: loaded };

        assert!(real.entity_eq(&proxy));
    }

    #[test]
    fn persisted_hash_is_type_and_id() {
        let mut c = Customer::new("a@x.com");
        c.set_id(5);
        let expected = mix(type_hash(TypeId::of::<Customer>()), value_hash(&5_i64));
        assert_eq!(c.entity_hash(), expected);
    }

    #[test]
    fn hash_is_frozen_after_first_computation() {
        let mut c = Customer::new("a@x.com");
        let transient_hash = c.entity_hash();
        c.email = Some("changed@x.com".to_string());
        c.set_id(3);
        assert_eq!(c.entity_hash(), transient_hash);
        assert_eq!(c.identity().cached_hash(), Some(transient_hash));
    }

    #[test]
    fn assign_id_refuses_to_change_a_persistent_id() {
        let mut c = Customer::new("a@x.com");
        c.assign_id(4).unwrap();
        c.assign_id(4).unwrap();
        let err = c.assign_id(8).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(*c.id(), 4);
    }

    #[test]
    fn clones_are_new_instances_with_empty_cache() {
        let c = Customer::new("a@x.com");
        let _ = c.entity_hash();
        let copy = c.clone();
        assert_eq!(copy.identity().cached_hash(), None);
        assert_eq!(copy, c);
    }

    #[test]
    fn entities_work_in_hash_sets() {
        let mut a = Customer::new("a@x.com");
        let mut b = Customer::new("other@x.com");
        a.set_id(1);
        b.set_id(1);
        let set: HashSet<Customer> = [a, b, Customer::new("c@x.com")].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn identity_serializes_as_its_id() {
        let mut c = Customer::new("a@x.com");
        c.set_id(12);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["identity"], serde_json::json!(12));

        let back: Customer = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }
}
