//! Per-instance handles.

use std::any::Any;

use crate::factory::Factory;

/// One instance bound to its type's factory.
///
/// Tags borrow the instance, so they cannot outlive it or be parked in
/// type-level storage on its behalf. When the factory caches hashes, the
/// cached value lives in the instance's own `HashCache`.
pub struct Tag<'a, T: 'static> {
    factory: &'a Factory<T>,
    instance: &'a T,
}

impl<'a, T: 'static> Tag<'a, T> {
    pub(crate) fn new(factory: &'a Factory<T>, instance: &'a T) -> Self {
        Self { factory, instance }
    }

    /// Equality of the tagged instance against any value.
    pub fn equal(&self, other: Option<&dyn Any>) -> bool {
        self.factory.equal_any(self.instance, other)
    }

    pub fn hash(&self) -> i32 {
        self.factory.hash(self.instance)
    }

    pub fn instance(&self) -> &'a T {
        self.instance
    }

    pub fn factory(&self) -> &'a Factory<T> {
        self.factory
    }
}

impl<T: 'static> Clone for Tag<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> Copy for Tag<'_, T> {}

impl<T: 'static> PartialEq for Tag<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.factory.equal(self.instance, other.instance)
    }
}

impl<T: 'static> Eq for Tag<'_, T> {}

impl<T: 'static> core::hash::Hash for Tag<'_, T> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        state.write_i32(Tag::hash(self));
    }
}

impl<T: 'static> core::fmt::Debug for Tag<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tag")
            .field("type", &self.factory.type_name())
            .field("hash", &Tag::hash(self))
            .finish()
    }
}
