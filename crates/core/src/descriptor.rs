//! Member descriptors: a member's name, value kind, order key and accessor.
//!
//! Accessors are erased here, once, so that the rest of the engine only deals
//! with a closed set of shapes. The typed constructors are where each value
//! kind's comparison semantics get bound to a concrete member type.

use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::array::{self, ArrayElement, ArrayView, ElementKind, Elements};
use crate::cache::HashCache;
use crate::value::{Equate, Scalar, ScalarKind, ScalarValue, fold_u64};

/// Order key given to inclusion-mode members without an explicit one.
pub const DEFAULT_ORDER: i32 = 1000;

/// How a member's value is classified for comparison.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Scalar(ScalarKind),
    Reference,
    Array(ElementKind),
}

pub(crate) type ScalarFn<T> = Box<dyn Fn(&T) -> ScalarValue + Send + Sync>;
pub(crate) type ArrayFn<T> = Box<dyn for<'a> Fn(&'a T) -> Option<ArrayView<'a>> + Send + Sync>;
pub(crate) type EqualFn<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;
pub(crate) type HashFn<T> = Box<dyn Fn(&T) -> i32 + Send + Sync>;
pub(crate) type SlotFn<T> = Box<dyn for<'a> Fn(&'a T) -> &'a HashCache + Send + Sync>;

/// Erased member accessor.
pub(crate) enum Access<T> {
    Scalar(ScalarFn<T>),
    Array(ArrayFn<T>),
    /// References and object arrays: comparison bound at construction.
    Pair { equal: EqualFn<T>, hash: HashFn<T> },
    Slot(SlotFn<T>),
    Opaque,
}

fn array_fn<T, F>(f: F) -> ArrayFn<T>
where
    F: for<'a> Fn(&'a T) -> Option<ArrayView<'a>> + Send + Sync + 'static,
{
    Box::new(f)
}

fn slot_fn<T, F>(f: F) -> SlotFn<T>
where
    F: for<'a> Fn(&'a T) -> &'a HashCache + Send + Sync + 'static,
{
    Box::new(f)
}

impl<T: 'static> Access<T> {
    pub(crate) fn scalar<S, F>(get: F) -> (ValueKind, Self)
    where
        S: Scalar,
        F: Fn(&T) -> S + Send + Sync + 'static,
    {
        let access = Access::Scalar(Box::new(move |v: &T| get(v).to_scalar()));
        (ValueKind::Scalar(S::KIND), access)
    }

    /// Reference compared through its own [`Equate`]: identity first, then
    /// both present and equal, or both absent.
    pub(crate) fn reference<R, F>(get: F) -> (ValueKind, Self)
    where
        R: Equate + ?Sized + 'static,
        F: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync + 'static,
    {
        let get = Arc::new(get);
        let for_hash = Arc::clone(&get);
        let access = Access::Pair {
            equal: Box::new(move |a: &T, b: &T| match (get(a), get(b)) {
                (Some(x), Some(y)) => std::ptr::eq(x, y) || x.equate(y),
                (None, None) => true,
                _ => false,
            }),
            hash: Box::new(move |v: &T| for_hash(v).map_or(0, R::equate_hash)),
        };
        (ValueKind::Reference, access)
    }

    /// Reference compared through its standard `PartialEq` and `Hash`.
    pub(crate) fn reference_by_eq<R, F>(get: F) -> (ValueKind, Self)
    where
        R: PartialEq + Hash + ?Sized + 'static,
        F: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync + 'static,
    {
        let get = Arc::new(get);
        let for_hash = Arc::clone(&get);
        let access = Access::Pair {
            equal: Box::new(move |a: &T, b: &T| match (get(a), get(b)) {
                (Some(x), Some(y)) => std::ptr::eq(x, y) || x == y,
                (None, None) => true,
                _ => false,
            }),
            hash: Box::new(move |v: &T| for_hash(v).map_or(0, std_hash)),
        };
        (ValueKind::Reference, access)
    }

    pub(crate) fn array<A, F>(get: F) -> (ValueKind, Self)
    where
        A: Elements + ?Sized + 'static,
        A::Element: ArrayElement,
        F: for<'a> Fn(&'a T) -> Option<&'a A> + Send + Sync + 'static,
    {
        let access = Access::Array(array_fn(move |v| {
            get(v).map(|a| <A::Element as ArrayElement>::view(a.elements()))
        }));
        (ValueKind::Array(<A::Element as ArrayElement>::KIND), access)
    }

    pub(crate) fn object_array<A, F>(get: F) -> (ValueKind, Self)
    where
        A: Elements + ?Sized + 'static,
        A::Element: Equate,
        F: for<'a> Fn(&'a T) -> Option<&'a A> + Send + Sync + 'static,
    {
        let get = Arc::new(get);
        let for_hash = Arc::clone(&get);
        let access = Access::Pair {
            equal: Box::new(move |a: &T, b: &T| {
                array::objects_equal(get(a).map(A::elements), get(b).map(A::elements))
            }),
            hash: Box::new(move |v: &T| array::objects_hash(for_hash(v).map(A::elements))),
        };
        (ValueKind::Array(ElementKind::Object), access)
    }

    pub(crate) fn slot<F>(get: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> &'a HashCache + Send + Sync + 'static,
    {
        Access::Slot(slot_fn(get))
    }

    /// Re-roots this accessor on an embedding type `O`.
    pub(crate) fn project<O, P>(self, project: Arc<P>) -> Access<O>
    where
        O: 'static,
        P: for<'a> Fn(&'a O) -> &'a T + Send + Sync + 'static,
    {
        match self {
            Access::Scalar(f) => Access::Scalar(Box::new(move |o: &O| f(project(o)))),
            Access::Array(f) => Access::Array(array_fn(move |o| f(project(o)))),
            Access::Pair { equal, hash } => {
                let for_hash = Arc::clone(&project);
                Access::Pair {
                    equal: Box::new(move |a: &O, b: &O| equal(project(a), project(b))),
                    hash: Box::new(move |o: &O| hash(for_hash(o))),
                }
            }
            Access::Slot(f) => Access::Slot(slot_fn(move |o| f(project(o)))),
            Access::Opaque => Access::Opaque,
        }
    }
}

fn std_hash<R: Hash + ?Sized>(value: &R) -> i32 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    fold_u64(hasher.finish())
}

/// One participating member, ready for dispatch.
pub(crate) struct MemberDescriptor<T> {
    pub(crate) name: Cow<'static, str>,
    pub(crate) kind: ValueKind,
    pub(crate) order: i32,
    pub(crate) access: Access<T>,
}

impl<T> core::fmt::Debug for MemberDescriptor<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}
