//! `equate-core`: derived equality and hashing for value-like types.
//!
//! A [`Factory`] holds, per type, the ordered list of member comparisons that
//! define equality and the hash. It is built once, either from the type's
//! [`Layout`] (usually generated with `#[derive(Reflect)]`) or from explicitly
//! registered accessors, and then reused for every pair of instances.
//!
//! ```ignore
//! #[derive(Reflect)]
//! struct Reading {
//!     sensor: String,
//!     value: f64,
//!     samples: Vec<f32>,
//!     #[equate(transient)]
//!     received_at: u64,
//! }
//!
//! static READING_EQ: StaticFactory<Reading> = StaticFactory::new(|| Factory::reflect().build());
//!
//! equate_core::impl_equate!(Reading, READING_EQ);
//! ```

extern crate self as equate_core;

pub mod array;
pub mod builder;
pub mod cache;
pub mod config;
pub mod descriptor;
mod dispatch;
pub mod error;
pub mod factory;
pub mod layout;
pub mod selector;
pub mod tag;
pub mod value;

pub use array::{ArrayElement, ArrayView, ElementKind, Elements, TextView};
pub use builder::{Builder, ReflectBuilder};
pub use cache::HashCache;
pub use config::EquateConfig;
pub use descriptor::{DEFAULT_ORDER, ValueKind};
pub use equate_derive::Reflect;
pub use error::{EquateError, EquateResult};
pub use factory::{DEFAULT_MULTIPLIER, DEFAULT_SEED, Factory, HashRule, StaticFactory};
pub use layout::{Layout, Level, MemberDef, Reflect, Role, Storage};
pub use selector::Mode;
pub use tag::Tag;
pub use value::{Equate, Scalar, ScalarKind, ScalarValue};
