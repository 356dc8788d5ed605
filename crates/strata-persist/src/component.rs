//! The [`Component`] trait.
//!
//! Components are plain Rust structs owned by the entity layer. The
//! persistence core only sees them as `dyn Component` and recovers the
//! concrete type through [`Any`] downcasts inside each field accessor.

use std::any::Any;

/// Type-erasure helper implemented for every `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Marker for types that can be described by a
/// [`ComponentMetadata`](crate::metadata::ComponentMetadata).
///
/// Implemented explicitly per type so that wrappers such as
/// `Box<dyn Component>` never count as components themselves.
///
/// ```
/// use strata_persist::component::Component;
///
/// #[derive(Default)]
/// struct Health {
///     current: u32,
/// }
///
/// impl Component for Health {}
///
/// let boxed: Box<dyn Component> = Box::new(Health { current: 3 });
/// assert_eq!(boxed.downcast_ref::<Health>().map(|h| h.current), Some(3));
/// ```
pub trait Component: AsAny + Send + Sync {}

impl dyn Component {
    /// Whether the concrete type behind this object is `T`.
    pub fn is<T: Component>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Recover the owned concrete value. Returns `None` (dropping the
    /// component) if the type does not match; check with [`is`](Self::is)
    /// first when the value must survive a mismatch.
    pub fn downcast<T: Component>(self: Box<Self>) -> Option<Box<T>> {
        self.into_any().downcast::<T>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker(u8);
    impl Component for Marker {}

    struct Other;
    impl Component for Other {}

    #[test]
    fn downcast_through_trait_object() {
        let mut boxed: Box<dyn Component> = Box::new(Marker(4));
        assert!(boxed.is::<Marker>());
        assert!(!boxed.is::<Other>());
        if let Some(m) = boxed.downcast_mut::<Marker>() {
            m.0 = 9;
        }
        let owned = boxed.downcast::<Marker>().unwrap();
        assert_eq!(owned.0, 9);
    }

    #[test]
    fn wrong_downcast_is_none() {
        let boxed: Box<dyn Component> = Box::new(Other);
        assert!(boxed.downcast_ref::<Marker>().is_none());
        assert!(boxed.downcast::<Marker>().is_none());
    }
}
