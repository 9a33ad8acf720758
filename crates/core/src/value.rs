//! Value contracts: boxed scalar semantics and a type's own equality.
//!
//! Scalars are compared the way boxed values compare, not the way raw numeric
//! operators do: every NaN equals every other NaN of the same width, and
//! `0.0` is distinct from `-0.0`. This keeps equality reflexive for all values,
//! which a derived `Eq`/`Hash` pair depends on.

use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

const CANONICAL_NAN_F32: u32 = 0x7fc0_0000;
const CANONICAL_NAN_F64: u64 = 0x7ff8_0000_0000_0000;

/// Hash of a boolean `true`.
pub const TRUE_HASH: i32 = 1231;
/// Hash of a boolean `false`.
pub const FALSE_HASH: i32 = 1237;

/// Scalar kinds a member may hold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

/// A scalar read out of a member, carrying its kind.
#[derive(Debug, Copy, Clone)]
pub enum ScalarValue {
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl ScalarValue {
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarValue::Bool(_) => ScalarKind::Bool,
            ScalarValue::Char(_) => ScalarKind::Char,
            ScalarValue::I8(_) => ScalarKind::I8,
            ScalarValue::I16(_) => ScalarKind::I16,
            ScalarValue::I32(_) => ScalarKind::I32,
            ScalarValue::I64(_) => ScalarKind::I64,
            ScalarValue::U8(_) => ScalarKind::U8,
            ScalarValue::U16(_) => ScalarKind::U16,
            ScalarValue::U32(_) => ScalarKind::U32,
            ScalarValue::U64(_) => ScalarKind::U64,
            ScalarValue::F32(_) => ScalarKind::F32,
            ScalarValue::F64(_) => ScalarKind::F64,
        }
    }

    /// Hash contribution of this scalar.
    pub fn contribution(&self) -> i32 {
        match *self {
            ScalarValue::Bool(v) => bool_hash(v),
            ScalarValue::Char(v) => v as i32,
            ScalarValue::I8(v) => v as i32,
            ScalarValue::I16(v) => v as i32,
            ScalarValue::I32(v) => v,
            ScalarValue::I64(v) => fold_u64(v as u64),
            ScalarValue::U8(v) => v as i32,
            ScalarValue::U16(v) => v as i32,
            ScalarValue::U32(v) => v as i32,
            ScalarValue::U64(v) => fold_u64(v),
            ScalarValue::F32(v) => f32_bits(v) as i32,
            ScalarValue::F64(v) => fold_u64(f64_bits(v)),
        }
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        use ScalarValue::*;
        match (*self, *other) {
            (Bool(a), Bool(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (I8(a), I8(b)) => a == b,
            (I16(a), I16(b)) => a == b,
            (I32(a), I32(b)) => a == b,
            (I64(a), I64(b)) => a == b,
            (U8(a), U8(b)) => a == b,
            (U16(a), U16(b)) => a == b,
            (U32(a), U32(b)) => a == b,
            (U64(a), U64(b)) => a == b,
            (F32(a), F32(b)) => f32_bits(a) == f32_bits(b),
            (F64(a), F64(b)) => f64_bits(a) == f64_bits(b),
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

/// Bit pattern of an `f32`, with every NaN collapsed onto one encoding.
pub fn f32_bits(v: f32) -> u32 {
    if v.is_nan() { CANONICAL_NAN_F32 } else { v.to_bits() }
}

/// Bit pattern of an `f64`, with every NaN collapsed onto one encoding.
pub fn f64_bits(v: f64) -> u64 {
    if v.is_nan() { CANONICAL_NAN_F64 } else { v.to_bits() }
}

pub(crate) fn fold_u64(bits: u64) -> i32 {
    (bits ^ (bits >> 32)) as u32 as i32
}

pub(crate) fn bool_hash(v: bool) -> i32 {
    if v { TRUE_HASH } else { FALSE_HASH }
}

/// Hash of a text value over its UTF-16 code units.
pub fn text_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Copyable values that compare with boxed-scalar semantics.
pub trait Scalar: Copy + 'static {
    const KIND: ScalarKind;

    fn to_scalar(self) -> ScalarValue;
}

macro_rules! impl_scalar {
    ($t:ty, $kind:ident) => {
        impl_scalar!($t, $kind, $t);
    };
    ($t:ty, $kind:ident, $as:ty) => {
        impl Scalar for $t {
            const KIND: ScalarKind = ScalarKind::$kind;

            fn to_scalar(self) -> ScalarValue {
                ScalarValue::$kind(self as $as)
            }
        }

        impl Equate for $t {
            fn equate(&self, other: &Self) -> bool {
                self.to_scalar() == other.to_scalar()
            }

            fn equate_hash(&self) -> i32 {
                self.to_scalar().contribution()
            }
        }
    };
}

impl_scalar!(bool, Bool);
impl_scalar!(char, Char);
impl_scalar!(i8, I8);
impl_scalar!(i16, I16);
impl_scalar!(i32, I32);
impl_scalar!(i64, I64);
impl_scalar!(isize, I64, i64);
impl_scalar!(u8, U8);
impl_scalar!(u16, U16);
impl_scalar!(u32, U32);
impl_scalar!(u64, U64);
impl_scalar!(usize, U64, u64);
impl_scalar!(f32, F32);
impl_scalar!(f64, F64);

/// A type's own equality contract.
///
/// This is what reference members and object-array elements are compared
/// with. Implementations must keep `equate_hash` consistent with `equate`.
/// Types with a [`Factory`](crate::Factory) usually get this from
/// [`impl_equate!`](crate::impl_equate).
pub trait Equate {
    fn equate(&self, other: &Self) -> bool;

    fn equate_hash(&self) -> i32;
}

impl Equate for str {
    fn equate(&self, other: &Self) -> bool {
        self == other
    }

    fn equate_hash(&self) -> i32 {
        text_hash(self)
    }
}

impl Equate for String {
    fn equate(&self, other: &Self) -> bool {
        self == other
    }

    fn equate_hash(&self) -> i32 {
        text_hash(self)
    }
}

impl<E: Equate + ?Sized> Equate for &E {
    fn equate(&self, other: &Self) -> bool {
        (**self).equate(*other)
    }

    fn equate_hash(&self) -> i32 {
        (**self).equate_hash()
    }
}

impl<E: Equate + ?Sized> Equate for Box<E> {
    fn equate(&self, other: &Self) -> bool {
        (**self).equate(&**other)
    }

    fn equate_hash(&self) -> i32 {
        (**self).equate_hash()
    }
}

impl<E: Equate + ?Sized> Equate for Arc<E> {
    fn equate(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other) || (**self).equate(&**other)
    }

    fn equate_hash(&self) -> i32 {
        (**self).equate_hash()
    }
}

impl<E: Equate + ?Sized> Equate for Rc<E> {
    fn equate(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || (**self).equate(&**other)
    }

    fn equate_hash(&self) -> i32 {
        (**self).equate_hash()
    }
}

impl<E: Equate> Equate for Option<E> {
    fn equate(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.equate(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn equate_hash(&self) -> i32 {
        self.as_ref().map_or(0, |v| v.equate_hash())
    }
}

impl<E: Equate> Equate for [E] {
    fn equate(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.equate(b))
    }

    fn equate_hash(&self) -> i32 {
        self.iter()
            .fold(1i32, |h, e| h.wrapping_mul(31).wrapping_add(e.equate_hash()))
    }
}

impl<E: Equate> Equate for Vec<E> {
    fn equate(&self, other: &Self) -> bool {
        self.as_slice().equate(other.as_slice())
    }

    fn equate_hash(&self) -> i32 {
        self.as_slice().equate_hash()
    }
}

impl<E: Equate, const N: usize> Equate for [E; N] {
    fn equate(&self, other: &Self) -> bool {
        self.as_slice().equate(other.as_slice())
    }

    fn equate_hash(&self) -> i32 {
        self.as_slice().equate_hash()
    }
}

/// Implements `PartialEq`, `Eq`, `Hash` and [`Equate`] for a type by
/// delegating to its type-level factory.
///
/// ```ignore
/// static POINT_EQ: StaticFactory<Point> = StaticFactory::new(|| {
///     Factory::builder().scalar("x", |p: &Point| p.x).build()
/// });
///
/// equate_core::impl_equate!(Point, POINT_EQ);
/// ```
#[macro_export]
macro_rules! impl_equate {
    ($t:ty, $factory:expr) => {
        impl ::core::cmp::PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                $factory.equal(self, other)
            }
        }

        impl ::core::cmp::Eq for $t {}

        impl ::core::hash::Hash for $t {
            fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                state.write_i32($factory.hash(self));
            }
        }

        impl $crate::Equate for $t {
            fn equate(&self, other: &Self) -> bool {
                $factory.equal(self, other)
            }

            fn equate_hash(&self) -> i32 {
                $factory.hash(self)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_nan_encodings_compare_equal() {
        let quiet = f64::NAN;
        let other = f64::from_bits(0x7ff0_0000_0000_0001);
        assert!(other.is_nan());
        assert_ne!(quiet.to_bits(), other.to_bits());

        assert!(quiet.equate(&other));
        assert_eq!(quiet.equate_hash(), other.equate_hash());

        let narrow = f32::from_bits(0x7f80_0001);
        assert!(f32::NAN.equate(&narrow));
    }

    #[test]
    fn signed_zeroes_are_distinct() {
        assert!(!0.0f64.equate(&-0.0f64));
        assert!(!0.0f32.equate(&-0.0f32));
    }

    #[test]
    fn scalar_hashes_follow_boxed_conventions() {
        assert_eq!(true.equate_hash(), 1231);
        assert_eq!(false.equate_hash(), 1237);
        assert_eq!('A'.equate_hash(), 65);
        assert_eq!((-7i32).equate_hash(), -7);
        assert_eq!((-1i64).equate_hash(), 0);
        assert_eq!(1.5f64.equate_hash(), 1_073_217_536);
    }

    #[test]
    fn scalars_of_different_kinds_differ() {
        assert_ne!(ScalarValue::I32(1), ScalarValue::I64(1));
        assert_eq!(ScalarValue::U8(9).kind(), ScalarKind::U8);
        assert_eq!(5usize.to_scalar().kind(), ScalarKind::U64);
    }

    #[test]
    fn text_hash_uses_utf16_units() {
        assert_eq!(text_hash(""), 0);
        assert_eq!(text_hash("hello"), 99_162_322);
        // Classic collision pair.
        assert_eq!(text_hash("Aa"), text_hash("BB"));
        assert_eq!("hello".to_string().equate_hash(), text_hash("hello"));
    }

    #[test]
    fn nested_sequences_compare_deeply() {
        let a = vec![vec![1, 2], vec![3]];
        let b = vec![vec![1, 2], vec![3]];
        let c = vec![vec![1, 2], vec![4]];
        assert!(a.equate(&b));
        assert_eq!(a.equate_hash(), b.equate_hash());
        assert!(!a.equate(&c));
        assert!(!a.equate(&vec![vec![1, 2]]));
    }

    #[test]
    fn options_compare_presence_first() {
        let none: Option<String> = None;
        assert!(none.equate(&None));
        assert!(!none.equate(&Some(String::new())));
        assert_eq!(none.equate_hash(), 0);
    }
}
