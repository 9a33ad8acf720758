//! Factory builders: introspective ([`ReflectBuilder`]) and explicit
//! ([`Builder`]).
//!
//! Both validate everything up front and return an error instead of a
//! factory that would misbehave later. Both also remember where they were
//! called from and with which options: an identical factory for the same type
//! built again at the same call site means the factory is being rebuilt per
//! instance instead of living in type-level storage, and is rejected. Helpers
//! that build differently configured factories from one line are fine.

use std::any::TypeId;
use std::borrow::Cow;
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::panic::Location;
use std::sync::{LazyLock, Mutex, PoisonError};

use crate::array::{ArrayElement, Elements};
use crate::cache::HashCache;
use crate::config::EquateConfig;
use crate::descriptor::{Access, DEFAULT_ORDER, MemberDescriptor, SlotFn, ValueKind};
use crate::dispatch::{Strategy, dispatch};
use crate::error::{EquateError, EquateResult};
use crate::factory::{Factory, HashRule};
use crate::layout::Reflect;
use crate::selector::{Boundary, Mode, Policy, select};
use crate::value::{Equate, Scalar};

/// Type, call site and options fingerprint of one successful build.
type BuildSite = (TypeId, &'static Location<'static>, u64);

static BUILD_SITES: LazyLock<Mutex<HashSet<BuildSite>>> = LazyLock::new(Default::default);

fn claim_site<T: 'static>(site: &'static Location<'static>, fingerprint: u64) -> EquateResult<()> {
    let mut sites = BUILD_SITES.lock().unwrap_or_else(PoisonError::into_inner);
    if sites.insert((TypeId::of::<T>(), site, fingerprint)) {
        Ok(())
    } else {
        Err(EquateError::misplaced_factory(
            std::any::type_name::<T>(),
            site.to_string(),
        ))
    }
}

fn finish<T: 'static>(
    strategies: Vec<Strategy<T>>,
    rule: HashRule,
    cache: Option<SlotFn<T>>,
    site: &'static Location<'static>,
    fingerprint: u64,
) -> EquateResult<Factory<T>> {
    claim_site::<T>(site, fingerprint)?;
    let factory = Factory::from_parts(strategies, rule, cache);
    tracing::debug!(
        type_name = factory.type_name(),
        members = ?factory.members().map(|(name, _)| name).collect::<Vec<_>>(),
        caches_hash = factory.caches_hash(),
        %site,
        "equality factory built"
    );
    Ok(factory)
}

fn rejected<T>(err: EquateError) -> EquateError {
    tracing::warn!(
        type_name = std::any::type_name::<T>(),
        error = %err,
        "rejected equality configuration"
    );
    err
}

impl<T: 'static> Factory<T> {
    /// Explicit registration: one accessor per member, evaluated in
    /// registration order.
    pub fn builder() -> Builder<T> {
        Builder::new()
    }

    /// Introspective building from the type's [`Layout`](crate::Layout).
    pub fn reflect() -> ReflectBuilder<T>
    where
        T: Reflect,
    {
        ReflectBuilder::new()
    }
}

/// Builds a factory from explicitly registered accessors.
///
/// Accessors must be plain functions of their argument: closures that
/// capture anything are rejected. Fn pointers count as capturing; pass the
/// function item or a non-capturing closure instead.
pub struct Builder<T: 'static> {
    members: Vec<MemberDescriptor<T>>,
    rule: HashRule,
    cache: Option<SlotFn<T>>,
    error: Option<EquateError>,
}

impl<T: 'static> Builder<T> {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            rule: HashRule::default(),
            cache: None,
            error: None,
        }
    }

    fn register<F>(mut self, name: Cow<'static, str>, (kind, access): (ValueKind, Access<T>)) -> Self {
        if self.error.is_some() {
            return self;
        }
        let type_name = std::any::type_name::<T>();
        if std::mem::size_of::<F>() != 0 {
            self.error = Some(EquateError::capturing(type_name, name));
        } else if self.members.iter().any(|m| m.name == name) {
            self.error = Some(EquateError::duplicate(type_name, name));
        } else {
            self.members.push(MemberDescriptor {
                name,
                kind,
                order: DEFAULT_ORDER,
                access,
            });
        }
        self
    }

    pub fn scalar<S, F>(self, name: impl Into<Cow<'static, str>>, get: F) -> Self
    where
        S: Scalar,
        F: Fn(&T) -> S + Send + Sync + 'static,
    {
        self.register::<F>(name.into(), Access::scalar(get))
    }

    pub fn reference<R, F>(self, name: impl Into<Cow<'static, str>>, get: F) -> Self
    where
        R: Equate + ?Sized + 'static,
        F: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync + 'static,
    {
        self.register::<F>(name.into(), Access::reference(get))
    }

    pub fn reference_by_eq<R, F>(self, name: impl Into<Cow<'static, str>>, get: F) -> Self
    where
        R: PartialEq + Hash + ?Sized + 'static,
        F: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync + 'static,
    {
        self.register::<F>(name.into(), Access::reference_by_eq(get))
    }

    pub fn array<A, F>(self, name: impl Into<Cow<'static, str>>, get: F) -> Self
    where
        A: Elements + ?Sized + 'static,
        A::Element: ArrayElement,
        F: for<'a> Fn(&'a T) -> Option<&'a A> + Send + Sync + 'static,
    {
        self.register::<F>(name.into(), Access::array(get))
    }

    pub fn object_array<A, F>(self, name: impl Into<Cow<'static, str>>, get: F) -> Self
    where
        A: Elements + ?Sized + 'static,
        A::Element: Equate,
        F: for<'a> Fn(&'a T) -> Option<&'a A> + Send + Sync + 'static,
    {
        self.register::<F>(name.into(), Access::object_array(get))
    }

    pub fn hash_rule(mut self, rule: HashRule) -> Self {
        self.rule = rule;
        self
    }

    /// Memoizes hashes in the slot `get` returns. Registering the slot
    /// declares that every registered member is immutable for the lifetime
    /// of an instance.
    pub fn cache_hash<F>(mut self, get: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> &'a HashCache + Send + Sync + 'static,
    {
        if self.error.is_none() && std::mem::size_of::<F>() != 0 {
            self.error = Some(EquateError::capturing(std::any::type_name::<T>(), "hash cache"));
        }
        self.cache = Some(Box::new(get));
        self
    }

    /// Finishes the factory.
    ///
    /// Building the same registrations twice from one call site is rejected
    /// as [`EquateError::MisplacedFactory`]: keep the factory in a
    /// [`StaticFactory`](crate::StaticFactory) instead of rebuilding it.
    #[track_caller]
    pub fn build(self) -> EquateResult<Factory<T>> {
        let site = Location::caller();
        if let Some(err) = self.error {
            return Err(rejected::<T>(err));
        }
        if self.members.is_empty() {
            return Err(rejected::<T>(EquateError::no_members(std::any::type_name::<T>())));
        }
        let mut state = DefaultHasher::new();
        for member in &self.members {
            member.name.hash(&mut state);
            member.kind.hash(&mut state);
        }
        self.rule.fingerprint(&mut state);
        self.cache.is_some().hash(&mut state);
        let fingerprint = state.finish();

        let strategies = self.members.into_iter().filter_map(dispatch).collect();
        finish(strategies, self.rule, self.cache, site, fingerprint).map_err(rejected::<T>)
    }
}

impl<T: 'static> Default for Builder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a factory by selecting members from the type's layout.
pub struct ReflectBuilder<T> {
    policy: Policy,
    rule: HashRule,
    cache: bool,
    _type: PhantomData<fn() -> T>,
}

impl<T: Reflect> ReflectBuilder<T> {
    pub fn new() -> Self {
        Self {
            policy: Policy::default(),
            rule: HashRule::default(),
            cache: false,
            _type: PhantomData,
        }
    }

    /// Highest ancestor level whose members are eligible.
    pub fn boundary<B: 'static>(mut self) -> Self {
        self.policy.boundary = Some(Boundary::Type {
            id: TypeId::of::<B>(),
            name: std::any::type_name::<B>(),
        });
        self
    }

    /// Like [`boundary`](Self::boundary), naming the level by type path or
    /// by its last path segment.
    pub fn boundary_named(mut self, name: impl Into<String>) -> Self {
        self.policy.boundary = Some(Boundary::Named(name.into()));
        self
    }

    pub fn include_transient(mut self) -> Self {
        self.policy.include_transient = true;
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.excluded.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.included.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.policy.mode = Some(mode);
        self
    }

    pub fn hash_rule(mut self, rule: HashRule) -> Self {
        self.rule = rule;
        self
    }

    /// Memoizes hashes in the type's `HashCache` member. Fails to build if
    /// the type has none, or if a contributing member is marked mutable.
    pub fn cache_hash(mut self) -> Self {
        self.cache = true;
        self
    }

    /// Applies a configuration document on top of the current options. A
    /// configured seed keeps the current combining function.
    pub fn configure(mut self, config: &EquateConfig) -> Self {
        if let Some(name) = &config.boundary {
            self = self.boundary_named(name.clone());
        }
        if let Some(mode) = config.mode {
            self = self.mode(mode);
        }
        if let Some(seed) = config.hash_seed {
            self.rule = self.rule.reseeded(seed);
        }
        self.policy.include_transient |= config.include_transient;
        self.cache |= config.cache_hash;
        self.exclude(config.exclude.iter().cloned())
            .include(config.include.iter().cloned())
    }

    /// Selects members and finishes the factory.
    ///
    /// Building with the same options twice from one call site is rejected
    /// as [`EquateError::MisplacedFactory`]; differently configured builds
    /// from one site are independent factories.
    #[track_caller]
    pub fn build(self) -> EquateResult<Factory<T>> {
        let site = Location::caller();
        let type_name = std::any::type_name::<T>();
        let selection = select(T::layout(), &self.policy).map_err(rejected::<T>)?;

        let cache = if self.cache {
            if let Some(member) = selection.mutable.first() {
                return Err(rejected::<T>(EquateError::mutable_member(type_name, member.clone())));
            }
            match selection.cache_slot {
                Some(slot) => Some(slot),
                None => return Err(rejected::<T>(EquateError::missing_cache_slot(type_name))),
            }
        } else {
            None
        };

        let mut state = DefaultHasher::new();
        self.policy.fingerprint(&mut state);
        self.rule.fingerprint(&mut state);
        self.cache.hash(&mut state);
        let fingerprint = state.finish();

        tracing::trace!(type_name, mode = ?selection.mode, "members selected");
        let strategies = selection.members.into_iter().filter_map(dispatch).collect();
        finish(strategies, self.rule, cache, site, fingerprint).map_err(rejected::<T>)
    }
}

impl<T: Reflect> Default for ReflectBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
