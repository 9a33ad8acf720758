//! The factory: an immutable, type-bound table of comparison strategies.

use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use crate::descriptor::{SlotFn, ValueKind};
use crate::dispatch::Strategy;
use crate::error::EquateResult;
use crate::tag::Tag;

/// Default starting value of a hash.
pub const DEFAULT_SEED: i32 = 17;
/// Default multiplier applied to the running hash before each contribution.
pub const DEFAULT_MULTIPLIER: i32 = 39;

fn default_combine(running: i32, contribution: i32) -> i32 {
    running
        .wrapping_mul(DEFAULT_MULTIPLIER)
        .wrapping_add(contribution)
}

/// How member contributions fold into one hash.
#[derive(Debug, Copy, Clone)]
pub struct HashRule {
    seed: i32,
    combine: fn(i32, i32) -> i32,
}

impl HashRule {
    pub fn new(seed: i32, combine: fn(i32, i32) -> i32) -> Self {
        Self { seed, combine }
    }

    /// Default combination with another seed.
    pub fn with_seed(seed: i32) -> Self {
        Self::new(seed, default_combine)
    }

    pub fn seed(&self) -> i32 {
        self.seed
    }

    pub fn combine(&self, running: i32, contribution: i32) -> i32 {
        (self.combine)(running, contribution)
    }

    /// Same combination, another seed.
    pub fn reseeded(self, seed: i32) -> Self {
        Self { seed, ..self }
    }

    pub(crate) fn fingerprint<H: Hasher>(&self, state: &mut H) {
        self.seed.hash(state);
        (self.combine as usize).hash(state);
    }
}

/// `running * 39 + contribution`, starting from `17`.
impl Default for HashRule {
    fn default() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }
}

/// Immutable equality/hash table for `T`.
///
/// Build one per type, once, and keep it in type-level storage (see
/// [`StaticFactory`]). `equal` and `hash` are pure functions of their
/// arguments; a factory can be shared across threads freely.
///
/// A factory is not itself a value: it implements neither `PartialEq` nor
/// `Hash`.
///
/// ```compile_fail
/// # struct Point { x: i32 }
/// let a = equate_core::Factory::<Point>::builder().scalar("x", |p: &Point| p.x).build().unwrap();
/// let b = equate_core::Factory::<Point>::builder().scalar("x", |p: &Point| p.x).build().unwrap();
/// let _ = a == b;
/// ```
pub struct Factory<T: 'static> {
    type_name: &'static str,
    strategies: Vec<Strategy<T>>,
    rule: HashRule,
    cache: Option<SlotFn<T>>,
}

impl<T: 'static> Factory<T> {
    pub(crate) fn from_parts(
        strategies: Vec<Strategy<T>>,
        rule: HashRule,
        cache: Option<SlotFn<T>>,
    ) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            strategies,
            rule,
            cache,
        }
    }

    /// Equality of two instances of `T`.
    pub fn equal(&self, a: &T, b: &T) -> bool {
        if std::ptr::eq(a, b) {
            return true;
        }
        self.strategies.iter().all(|s| s.equal(a, b))
    }

    /// Equality against an arbitrary value. `None` and values of any other
    /// type are never equal.
    pub fn equal_any(&self, a: &T, b: Option<&dyn Any>) -> bool {
        match b.and_then(|b| b.downcast_ref::<T>()) {
            Some(b) => self.equal(a, b),
            None => false,
        }
    }

    /// Hash of an instance, served from its cache when caching is enabled.
    pub fn hash(&self, value: &T) -> i32 {
        match &self.cache {
            Some(slot) => slot(value).get_or_init(|| self.compute_hash(value)),
            None => self.compute_hash(value),
        }
    }

    fn compute_hash(&self, value: &T) -> i32 {
        self.strategies
            .iter()
            .fold(self.rule.seed(), |running, s| self.rule.combine(running, s.hash(value)))
    }

    /// Binds this factory to one instance.
    pub fn tag<'a>(&'a self, instance: &'a T) -> Tag<'a, T> {
        Tag::new(self, instance)
    }

    /// Participating members in evaluation order.
    pub fn members(&self) -> impl ExactSizeIterator<Item = (&str, ValueKind)> + '_ {
        self.strategies.iter().map(|s| (s.name(), s.kind()))
    }

    pub fn hash_rule(&self) -> HashRule {
        self.rule
    }

    pub fn caches_hash(&self) -> bool {
        self.cache.is_some()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl<T: 'static> core::fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Factory")
            .field("type", &self.type_name)
            .field("members", &self.members().map(|(name, _)| name).collect::<Vec<_>>())
            .field("rule", &self.rule)
            .field("caches_hash", &self.caches_hash())
            .finish()
    }
}

/// Type-level home of a [`Factory`], built on first use.
///
/// ```ignore
/// static POINT_EQ: StaticFactory<Point> = StaticFactory::new(|| {
///     Factory::reflect().exclude(["label"]).build()
/// });
///
/// assert!(POINT_EQ.equal(&a, &b));
/// ```
///
/// An invalid configuration is fatal: the first access panics with the build
/// error, the way a failing type initializer would.
pub struct StaticFactory<T: 'static> {
    cell: OnceLock<Factory<T>>,
    init: fn() -> EquateResult<Factory<T>>,
}

impl<T: 'static> StaticFactory<T> {
    pub const fn new(init: fn() -> EquateResult<Factory<T>>) -> Self {
        Self {
            cell: OnceLock::new(),
            init,
        }
    }

    pub fn get(&self) -> &Factory<T> {
        self.cell.get_or_init(|| match (self.init)() {
            Ok(factory) => factory,
            Err(err) => panic!("equality for {} is misconfigured: {err}", std::any::type_name::<T>()),
        })
    }
}

impl<T: 'static> core::ops::Deref for StaticFactory<T> {
    type Target = Factory<T>;

    fn deref(&self) -> &Factory<T> {
        self.get()
    }
}
