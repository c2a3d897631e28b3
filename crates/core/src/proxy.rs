//! Proxy unwrapping hook.
//!
//! Lazy-loading layers may hand out a stand-in object instead of the real value.
//! Equality only considers the concrete type behind such a stand-in, which the
//! stand-in exposes through [`Unproxy`].

use core::any::Any;

/// Resolves a value to the real instance it stands for.
///
/// Plain domain types return themselves; the equality macros generate that impl.
/// A proxy returns the value it wraps.
pub trait Unproxy: Any {
    fn unproxied(&self) -> &dyn Any;
}
