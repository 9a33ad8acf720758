//! Type layouts: the member table a type exposes for introspective building.
//!
//! A [`Layout`] answers two questions about a type: which members it declares
//! directly, and which parent type it embeds. It is usually generated by
//! `#[derive(Reflect)]`, but can be written by hand.
//!
//! ```ignore
//! impl Reflect for Circle {
//!     fn layout() -> Layout<Self> {
//!         Layout::new()
//!             .member(MemberDef::scalar("radius", |c: &Circle| c.radius))
//!             .member(MemberDef::hash_cache("hash", |c: &Circle| &c.hash))
//!             .parent(Shape::layout(), |c: &Circle| &c.shape)
//!     }
//! }
//! ```

use std::any::TypeId;
use std::borrow::Cow;
use std::hash::Hash;
use std::sync::Arc;

use crate::array::{ArrayElement, Elements};
use crate::cache::HashCache;
use crate::descriptor::{Access, ValueKind};
use crate::value::{Equate, Scalar};

/// Types that can describe their own members.
pub trait Reflect: Sized + 'static {
    fn layout() -> Layout<Self>;
}

/// Where a member's storage lives.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Storage {
    /// One value per instance.
    Instance,
    /// One value shared by the whole type.
    Shared,
}

/// What a member is for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    /// Per-instance state that may take part in equality.
    Data,
    /// A [`HashCache`] slot.
    HashCache,
    /// A factory for the type's equality.
    Factory,
}

/// One member declared on a type, with its selection metadata.
pub struct MemberDef<T> {
    pub(crate) name: Cow<'static, str>,
    pub(crate) kind: Option<ValueKind>,
    pub(crate) role: Role,
    pub(crate) storage: Storage,
    pub(crate) included: bool,
    pub(crate) order: Option<i32>,
    pub(crate) excluded: bool,
    pub(crate) transient: bool,
    pub(crate) mutable: bool,
    pub(crate) access: Access<T>,
}

impl<T: 'static> MemberDef<T> {
    fn data(name: impl Into<Cow<'static, str>>, (kind, access): (ValueKind, Access<T>)) -> Self {
        Self::with_role(name, Role::Data, Some(kind), access)
    }

    fn with_role(
        name: impl Into<Cow<'static, str>>,
        role: Role,
        kind: Option<ValueKind>,
        access: Access<T>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            role,
            storage: Storage::Instance,
            included: false,
            order: None,
            excluded: false,
            transient: false,
            mutable: false,
            access,
        }
    }

    pub fn scalar<S, F>(name: impl Into<Cow<'static, str>>, get: F) -> Self
    where
        S: Scalar,
        F: Fn(&T) -> S + Send + Sync + 'static,
    {
        Self::data(name, Access::scalar(get))
    }

    pub fn reference<R, F>(name: impl Into<Cow<'static, str>>, get: F) -> Self
    where
        R: Equate + ?Sized + 'static,
        F: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync + 'static,
    {
        Self::data(name, Access::reference(get))
    }

    pub fn reference_by_eq<R, F>(name: impl Into<Cow<'static, str>>, get: F) -> Self
    where
        R: PartialEq + Hash + ?Sized + 'static,
        F: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync + 'static,
    {
        Self::data(name, Access::reference_by_eq(get))
    }

    pub fn array<A, F>(name: impl Into<Cow<'static, str>>, get: F) -> Self
    where
        A: Elements + ?Sized + 'static,
        A::Element: ArrayElement,
        F: for<'a> Fn(&'a T) -> Option<&'a A> + Send + Sync + 'static,
    {
        Self::data(name, Access::array(get))
    }

    pub fn object_array<A, F>(name: impl Into<Cow<'static, str>>, get: F) -> Self
    where
        A: Elements + ?Sized + 'static,
        A::Element: Equate,
        F: for<'a> Fn(&'a T) -> Option<&'a A> + Send + Sync + 'static,
    {
        Self::data(name, Access::object_array(get))
    }

    /// The type's hash cache slot.
    pub fn hash_cache<F>(name: impl Into<Cow<'static, str>>, get: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> &'a HashCache + Send + Sync + 'static,
    {
        Self::with_role(name, Role::HashCache, None, Access::slot(get))
    }

    /// A factory declared on the type. Only valid together with [`shared`].
    ///
    /// [`shared`]: MemberDef::shared
    pub fn factory(name: impl Into<Cow<'static, str>>) -> Self {
        Self::with_role(name, Role::Factory, None, Access::Opaque)
    }

    /// Include-marks this member.
    pub fn include(mut self) -> Self {
        self.included = true;
        self
    }

    /// Include-marks this member with an explicit order key.
    pub fn order(mut self, order: i32) -> Self {
        self.included = true;
        self.order = Some(order);
        self
    }

    /// Exclude-marks this member.
    pub fn exclude(mut self) -> Self {
        self.excluded = true;
        self
    }

    /// Marks derived or scratch state, left out unless transient members are
    /// requested.
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Marks state that may change after construction.
    pub fn mutable(mut self) -> Self {
        self.mutable = true;
        self
    }

    /// Moves this member to type-level storage.
    pub fn shared(mut self) -> Self {
        self.storage = Storage::Shared;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Option<ValueKind> {
        self.kind
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn storage(&self) -> Storage {
        self.storage
    }

    fn project<O, P>(self, project: Arc<P>) -> MemberDef<O>
    where
        O: 'static,
        P: for<'a> Fn(&'a O) -> &'a T + Send + Sync + 'static,
    {
        MemberDef {
            name: self.name,
            kind: self.kind,
            role: self.role,
            storage: self.storage,
            included: self.included,
            order: self.order,
            excluded: self.excluded,
            transient: self.transient,
            mutable: self.mutable,
            access: self.access.project(project),
        }
    }
}

/// The members one type declares directly.
pub struct Level<T> {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) members: Vec<MemberDef<T>>,
}

impl<T> Level<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn members(&self) -> &[MemberDef<T>] {
        &self.members
    }

    /// Matches a boundary given by name, either the full type path or its
    /// last segment.
    pub(crate) fn is_named(&self, name: &str) -> bool {
        self.type_name == name || self.type_name.rsplit("::").next() == Some(name)
    }
}

/// A type's levels, the type itself first and its outermost ancestor last.
pub struct Layout<T> {
    pub(crate) levels: Vec<Level<T>>,
}

impl<T: 'static> Layout<T> {
    pub fn new() -> Self {
        Self {
            levels: vec![Level {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                members: Vec::new(),
            }],
        }
    }

    /// Declares a member on the type itself.
    pub fn member(mut self, def: MemberDef<T>) -> Self {
        self.levels[0].members.push(def);
        self
    }

    /// Declares the parent type, embedded in `T` and reached through `project`.
    pub fn parent<P, F>(mut self, parent: Layout<P>, project: F) -> Self
    where
        P: 'static,
        F: for<'a> Fn(&'a T) -> &'a P + Send + Sync + 'static,
    {
        let project = Arc::new(project);
        for level in parent.levels {
            self.levels.push(Level {
                type_id: level.type_id,
                type_name: level.type_name,
                members: level
                    .members
                    .into_iter()
                    .map(|m| m.project(Arc::clone(&project)))
                    .collect(),
            });
        }
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.levels[0].type_name
    }

    pub fn levels(&self) -> &[Level<T>] {
        &self.levels
    }
}

impl<T: 'static> Default for Layout<T> {
    fn default() -> Self {
        Self::new()
    }
}
