//! Domain signatures: the properties that define value equality for a type.
//!
//! A type opts in by implementing [`DomainSignature`] and listing its signature
//! properties once. The list is resolved lazily into a process-wide registry keyed
//! by `TypeId` and shared from then on. Entries are never evicted.
//!
//! Signature properties are read as [`SignatureValue`]s, so comparison is null-safe
//! (`Null == Null`, `Null != anything else`) and hashing is uniform across types.

use core::any::{Any, TypeId, type_name};
use core::fmt;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::hash::{mix, type_hash, value_hash};

/// Value of one signature property, as seen by equality, hashing and duplicate checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SignatureValue {
    /// Absent value (`None`).
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    /// Discriminant of a fieldless enum.
    Enum(i64),
    /// Identifier of a referenced entity.
    Reference(Box<SignatureValue>),
}

impl SignatureValue {
    /// Reference to another entity, by that entity's identifier.
    pub fn reference(id: impl Into<SignatureValue>) -> Self {
        Self::Reference(Box::new(id.into()))
    }

    /// Discriminant of a fieldless enum (`Status::Active as i64`).
    pub fn discriminant(value: i64) -> Self {
        Self::Enum(value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for SignatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) | Self::Enum(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Reference(id) => write!(f, "ref({id})"),
        }
    }
}

macro_rules! impl_from_lossless {
    ($variant:ident: $($t:ty),+) => {
        $(
            impl From<$t> for SignatureValue {
                fn from(value: $t) -> Self {
                    Self::$variant(value.into())
                }
            }
        )+
    };
}

impl_from_lossless!(Int: i8, i16, i32, i64);
impl_from_lossless!(UInt: u8, u16, u32, u64);
impl_from_lossless!(Text: String, &str);

impl From<bool> for SignatureValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<usize> for SignatureValue {
    fn from(value: usize) -> Self {
        Self::UInt(value as u64)
    }
}

impl From<&String> for SignatureValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<Uuid> for SignatureValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<DateTime<Utc>> for SignatureValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<SignatureValue>> From<Option<T>> for SignatureValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

type Reader<T> = Arc<dyn Fn(&T) -> SignatureValue + Send + Sync>;

/// A named accessor for one signature property of `T`.
pub struct SignatureProperty<T: ?Sized> {
    name: &'static str,
    read: Reader<T>,
}

impl<T: ?Sized + 'static> SignatureProperty<T> {
    pub fn new<F, V>(name: &'static str, read: F) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<SignatureValue>,
    {
        Self {
            name,
            read: Arc::new(move |value: &T| read(value).into()),
        }
    }

    /// Lift a property declared on a contained part (the "base" of `T`) into `T`.
    pub fn inherited<P>(parent: SignatureProperty<P>, project: fn(&T) -> &P) -> Self
    where
        P: ?Sized + 'static,
    {
        Self {
            name: parent.name,
            read: Arc::new(move |value: &T| parent.read(project(value))),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn read(&self, value: &T) -> SignatureValue {
        (self.read)(value)
    }
}

impl<T: ?Sized> Clone for SignatureProperty<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            read: Arc::clone(&self.read),
        }
    }
}

impl<T: ?Sized> fmt::Debug for SignatureProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureProperty")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Static declaration of a type's domain signature.
///
/// ```ignore
/// impl DomainSignature for Customer {
///     fn declare_signature() -> Vec<SignatureProperty<Self>> {
///         vec![SignatureProperty::new("email", |c: &Customer| c.email.clone())]
///     }
/// }
/// ```
///
/// Types without a meaningful signature implement it with the default (empty) body.
pub trait DomainSignature: 'static {
    /// Signature properties in declaration order. Called at most a handful of times
    /// per process; use [`signature_properties`] to read the cached list.
    fn declare_signature() -> Vec<SignatureProperty<Self>>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

type Registry = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::default)
}

/// Signature properties of `T`, resolved once per process and cached.
///
/// Concurrent first calls for the same type may each build the list; the first one
/// stored wins and every caller receives that entry.
pub fn signature_properties<T: DomainSignature>() -> Arc<[SignatureProperty<T>]> {
    let key = TypeId::of::<T>();

    {
        // The map is append-only, so a poisoned guard still holds consistent entries.
        let map = registry().read().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = map
            .get(&key)
            .and_then(|entry| entry.downcast_ref::<Arc<[SignatureProperty<T>]>>())
        {
            return Arc::clone(found);
        }
    }

    let declared: Arc<[SignatureProperty<T>]> = T::declare_signature().into();

    let mut map = registry().write().unwrap_or_else(PoisonError::into_inner);
    let entry = map.entry(key).or_insert_with(|| {
        debug!(
            entity_type = type_name::<T>(),
            properties = declared.len(),
            "registered domain signature"
        );
        Arc::new(Arc::clone(&declared)) as Arc<dyn Any + Send + Sync>
    });

    entry
        .downcast_ref::<Arc<[SignatureProperty<T>]>>()
        .map(Arc::clone)
        .unwrap_or(declared)
}

/// Current signature values of `value`, in declaration order.
pub fn signature_values<T: DomainSignature>(value: &T) -> Vec<(&'static str, SignatureValue)> {
    signature_properties::<T>()
        .iter()
        .map(|p| (p.name(), p.read(value)))
        .collect()
}

/// Compare two values property by property.
///
/// Returns `None` when `T` declares no signature, leaving the caller to decide what
/// equality means without one.
pub fn signature_eq<T: DomainSignature>(a: &T, b: &T) -> Option<bool> {
    let properties = signature_properties::<T>();
    if properties.is_empty() {
        return None;
    }
    Some(properties.iter().all(|p| p.read(a) == p.read(b)))
}

/// Type hash folded with every non-null signature value, in declaration order.
///
/// Returns `None` when `T` declares no signature.
pub fn signature_hash<T: DomainSignature>(value: &T) -> Option<u64> {
    let properties = signature_properties::<T>();
    if properties.is_empty() {
        return None;
    }

    let hash = properties
        .iter()
        .map(|p| p.read(value))
        .filter(|v| !v.is_null())
        .fold(type_hash(TypeId::of::<T>()), |acc, v| mix(acc, value_hash(&v)));
    Some(hash)
}
