//! Hash mixing shared by comparable objects and entities.

use core::any::TypeId;
use core::hash::{Hash, Hasher};
use std::hash::DefaultHasher;

/// Multiplier applied to the running hash before each value is folded in.
///
/// 31 keeps collisions low for short property sequences (Goodrich & Tamassia).
pub const HASH_MULTIPLIER: u64 = 31;

/// Hash of a single value with the process-default hasher.
pub fn value_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hash of a concrete runtime type.
pub fn type_hash(type_id: TypeId) -> u64 {
    value_hash(&type_id)
}

/// Fold one more value hash into an accumulator: `(acc * 31) ^ next`.
pub fn mix(acc: u64, next: u64) -> u64 {
    acc.wrapping_mul(HASH_MULTIPLIER) ^ next
}
