//! Identifier contract for entities.
//!
//! Any type that can be compared, hashed and defaulted can identify an entity:
//! integers, strings, UUIDs, `Option<T>`, or a domain-specific newtype declared with
//! [`entity_id!`](crate::entity_id). An entity whose identifier still equals the
//! type's default value is *transient*: it has not been persisted yet.

use core::fmt::Debug;
use core::hash::Hash;

/// Capability required of an entity identifier.
pub trait EntityId: Clone + Eq + Hash + Debug + Default + Send + Sync + 'static {
    /// Whether this value is the type's default (zero, empty, nil, `None`).
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl<T> EntityId for T where T: Clone + Eq + Hash + Debug + Default + Send + Sync + 'static {}

/// Declare a strongly-typed identifier wrapping an existing identifier type.
///
/// The generated type serializes transparently, converts to and from its inner
/// type, and parses from text (parse failures become [`DomainError::InvalidId`]).
/// It also converts into a [`SignatureValue`], so the inner type must be one that
/// does (integers, strings, UUIDs).
///
/// ```ignore
/// sharplite_core::entity_id! {
///     /// Identifier of a customer.
///     pub struct CustomerId(i64);
/// }
///
/// let id: CustomerId = "42".parse()?;
/// assert_eq!(id.into_inner(), 42);
/// ```
///
/// [`DomainError::InvalidId`]: crate::DomainError::InvalidId
/// [`SignatureValue`]: crate::SignatureValue
#[macro_export]
macro_rules! entity_id {
    ($(#[$meta:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $name($inner);

        impl $name {
            pub fn new(value: $inner) -> Self {
                Self(value)
            }

            pub fn as_inner(&self) -> &$inner {
                &self.0
            }

            pub fn into_inner(self) -> $inner {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::convert::From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl ::core::convert::From<$name> for $inner {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl ::core::convert::From<$name> for $crate::SignatureValue {
            fn from(value: $name) -> Self {
                $crate::SignatureValue::from(value.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                let inner = <$inner as ::core::str::FromStr>::from_str(s).map_err(|e| {
                    $crate::DomainError::invalid_id(format!("{}: {}", stringify!($name), e))
                })?;
                Ok(Self(inner))
            }
        }

        // Written out by hand: `#[serde(crate = "...")]` takes a string literal, in
        // which `$crate` is not expanded, and callers need not depend on serde.
        impl $crate::__private::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
            where
                S: $crate::__private::serde::Serializer,
            {
                <$inner as $crate::__private::serde::Serialize>::serialize(&self.0, serializer)
            }
        }

        impl<'de> $crate::__private::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: $crate::__private::serde::Deserializer<'de>,
            {
                <$inner as $crate::__private::serde::Deserialize<'de>>::deserialize(deserializer)
                    .map(Self)
            }
        }
    };
}
