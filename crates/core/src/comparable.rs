//! Comparable objects: equality by domain signature, without identity.
//!
//! Value-like domain objects (addresses, money, date ranges) carry no identifier.
//! Two of them are equal when they have the same concrete type and the same values
//! for every signature property. A type that declares no signature falls back to
//! reference identity: each instance is only equal to itself.

use core::any::Any;
use core::ptr;

use crate::hash::value_hash;
use crate::proxy::Unproxy;
use crate::signature::{DomainSignature, signature_eq, signature_hash};

/// Signature-based equality and hashing for objects without an identifier.
///
/// Usually wired into `PartialEq`/`Eq`/`Hash` with
/// [`impl_comparable_equality!`](crate::impl_comparable_equality):
///
/// ```ignore
/// struct Money { amount: i64, currency: String }
///
/// impl DomainSignature for Money {
///     fn declare_signature() -> Vec<SignatureProperty<Self>> {
///         vec![
///             SignatureProperty::new("amount", |m: &Money| m.amount),
///             SignatureProperty::new("currency", |m: &Money| m.currency.clone()),
///         ]
///     }
/// }
///
/// impl ComparableObject for Money {}
/// sharplite_core::impl_comparable_equality!(Money);
/// ```
pub trait ComparableObject: DomainSignature + Unproxy + Sized {
    /// Whether `other` has the same signature values as `self`.
    ///
    /// Without declared signature properties this is reference identity.
    fn has_same_object_signature(&self, other: &Self) -> bool {
        signature_eq(self, other).unwrap_or_else(|| ptr::eq(self, other))
    }

    /// Equality against any value, resolving proxies to their real type first.
    fn comparable_eq(&self, other: &dyn Unproxy) -> bool {
        let Some(other) = other.unproxied().downcast_ref::<Self>() else {
            return false;
        };
        ptr::eq(self, other) || self.has_same_object_signature(other)
    }

    /// Type hash folded with each non-null signature value.
    ///
    /// Without declared signature properties this hashes the instance address,
    /// matching the reference-identity equality.
    fn comparable_hash(&self) -> u64 {
        signature_hash(self).unwrap_or_else(|| value_hash(&(self as *const Self as usize)))
    }
}

/// Implement `PartialEq`, `Eq`, `Hash` and [`Unproxy`] for comparable objects.
#[macro_export]
macro_rules! impl_comparable_equality {
    ($($t:ty),+ $(,)?) => {
        $(
            impl $crate::Unproxy for $t {
                fn unproxied(&self) -> &dyn ::core::any::Any {
                    self
                }
            }

            impl ::core::cmp::PartialEq for $t {
                fn eq(&self, other: &Self) -> bool {
                    $crate::ComparableObject::comparable_eq(self, other)
                }
            }

            impl ::core::cmp::Eq for $t {}

            impl ::core::hash::Hash for $t {
                fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                    state.write_u64($crate::ComparableObject::comparable_hash(self));
                }
            }
        )+
    };
}
