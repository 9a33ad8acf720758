//! Array members: value-wise comparison over typed element slices.

use serde::{Deserialize, Serialize};

use crate::value::{Equate, Scalar, text_hash};

/// Element kinds an array member may hold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Text,
    /// Elements compared through their own [`Equate`] contract.
    Object,
}

/// Borrowed view over the elements of a primitive or text array.
#[derive(Debug, Copy, Clone)]
pub enum ArrayView<'a> {
    Bool(&'a [bool]),
    Char(&'a [char]),
    I8(&'a [i8]),
    I16(&'a [i16]),
    I32(&'a [i32]),
    I64(&'a [i64]),
    F32(&'a [f32]),
    F64(&'a [f64]),
    Text(TextView<'a>),
}

/// Text element storage shapes.
#[derive(Debug, Copy, Clone)]
pub enum TextView<'a> {
    Owned(&'a [String]),
    Nullable(&'a [Option<String>]),
    Static(&'a [&'static str]),
}

impl TextView<'_> {
    fn len(&self) -> usize {
        match self {
            TextView::Owned(s) => s.len(),
            TextView::Nullable(s) => s.len(),
            TextView::Static(s) => s.len(),
        }
    }

    fn get(&self, index: usize) -> Option<&str> {
        match self {
            TextView::Owned(s) => s.get(index).map(String::as_str),
            TextView::Nullable(s) => s.get(index).and_then(|v| v.as_deref()),
            TextView::Static(s) => s.get(index).copied(),
        }
    }
}

impl ArrayView<'_> {
    pub fn kind(&self) -> ElementKind {
        match self {
            ArrayView::Bool(_) => ElementKind::Bool,
            ArrayView::Char(_) => ElementKind::Char,
            ArrayView::I8(_) => ElementKind::I8,
            ArrayView::I16(_) => ElementKind::I16,
            ArrayView::I32(_) => ElementKind::I32,
            ArrayView::I64(_) => ElementKind::I64,
            ArrayView::F32(_) => ElementKind::F32,
            ArrayView::F64(_) => ElementKind::F64,
            ArrayView::Text(_) => ElementKind::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayView::Bool(s) => s.len(),
            ArrayView::Char(s) => s.len(),
            ArrayView::I8(s) => s.len(),
            ArrayView::I16(s) => s.len(),
            ArrayView::I32(s) => s.len(),
            ArrayView::I64(s) => s.len(),
            ArrayView::F32(s) => s.len(),
            ArrayView::F64(s) => s.len(),
            ArrayView::Text(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Element types with a dedicated array comparison.
pub trait ArrayElement: Sized + 'static {
    const KIND: ElementKind;

    fn view(slice: &[Self]) -> ArrayView<'_>;
}

macro_rules! impl_array_element {
    ($t:ty, $kind:ident) => {
        impl ArrayElement for $t {
            const KIND: ElementKind = ElementKind::$kind;

            fn view(slice: &[Self]) -> ArrayView<'_> {
                ArrayView::$kind(slice)
            }
        }
    };
}

impl_array_element!(bool, Bool);
impl_array_element!(char, Char);
impl_array_element!(i8, I8);
impl_array_element!(i16, I16);
impl_array_element!(i32, I32);
impl_array_element!(i64, I64);
impl_array_element!(f32, F32);
impl_array_element!(f64, F64);

impl ArrayElement for String {
    const KIND: ElementKind = ElementKind::Text;

    fn view(slice: &[Self]) -> ArrayView<'_> {
        ArrayView::Text(TextView::Owned(slice))
    }
}

impl ArrayElement for Option<String> {
    const KIND: ElementKind = ElementKind::Text;

    fn view(slice: &[Self]) -> ArrayView<'_> {
        ArrayView::Text(TextView::Nullable(slice))
    }
}

impl ArrayElement for &'static str {
    const KIND: ElementKind = ElementKind::Text;

    fn view(slice: &[Self]) -> ArrayView<'_> {
        ArrayView::Text(TextView::Static(slice))
    }
}

/// Containers that expose their contents as a contiguous slice.
pub trait Elements {
    type Element;

    fn elements(&self) -> &[Self::Element];
}

impl<E> Elements for [E] {
    type Element = E;

    fn elements(&self) -> &[E] {
        self
    }
}

impl<E> Elements for Vec<E> {
    type Element = E;

    fn elements(&self) -> &[E] {
        self
    }
}

impl<E> Elements for Box<[E]> {
    type Element = E;

    fn elements(&self) -> &[E] {
        self
    }
}

impl<E, const N: usize> Elements for [E; N] {
    type Element = E;

    fn elements(&self) -> &[E] {
        self
    }
}

fn slices_equal<E>(a: &[E], b: &[E], eq: impl Fn(&E, &E) -> bool) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| eq(x, y))
}

fn slice_hash<E>(s: &[E], hash: impl Fn(&E) -> i32) -> i32 {
    s.iter()
        .fold(1i32, |h, e| h.wrapping_mul(31).wrapping_add(hash(e)))
}

fn scalar_slices_equal<S: Scalar>(a: &[S], b: &[S]) -> bool {
    slices_equal(a, b, |x, y| x.to_scalar() == y.to_scalar())
}

fn scalar_slice_hash<S: Scalar>(s: &[S]) -> i32 {
    slice_hash(s, |e| e.to_scalar().contribution())
}

fn text_equal(a: &TextView<'_>, b: &TextView<'_>) -> bool {
    a.len() == b.len() && (0..a.len()).all(|i| a.get(i) == b.get(i))
}

fn text_view_hash(s: &TextView<'_>) -> i32 {
    (0..s.len()).fold(1i32, |h, i| {
        h.wrapping_mul(31)
            .wrapping_add(s.get(i).map_or(0, text_hash))
    })
}

/// Value-wise array equality: both absent, or both present with equal length
/// and pairwise-equal elements.
pub fn views_equal(a: Option<ArrayView<'_>>, b: Option<ArrayView<'_>>) -> bool {
    let (a, b) = match (a, b) {
        (None, None) => return true,
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };
    match (a, b) {
        (ArrayView::Bool(x), ArrayView::Bool(y)) => scalar_slices_equal(x, y),
        (ArrayView::Char(x), ArrayView::Char(y)) => scalar_slices_equal(x, y),
        (ArrayView::I8(x), ArrayView::I8(y)) => scalar_slices_equal(x, y),
        (ArrayView::I16(x), ArrayView::I16(y)) => scalar_slices_equal(x, y),
        (ArrayView::I32(x), ArrayView::I32(y)) => scalar_slices_equal(x, y),
        (ArrayView::I64(x), ArrayView::I64(y)) => scalar_slices_equal(x, y),
        (ArrayView::F32(x), ArrayView::F32(y)) => scalar_slices_equal(x, y),
        (ArrayView::F64(x), ArrayView::F64(y)) => scalar_slices_equal(x, y),
        (ArrayView::Text(x), ArrayView::Text(y)) => text_equal(&x, &y),
        _ => false,
    }
}

/// Hash over the ordered elements; an absent array hashes to `0`.
pub fn view_hash(view: Option<ArrayView<'_>>) -> i32 {
    match view {
        None => 0,
        Some(ArrayView::Bool(s)) => scalar_slice_hash(s),
        Some(ArrayView::Char(s)) => scalar_slice_hash(s),
        Some(ArrayView::I8(s)) => scalar_slice_hash(s),
        Some(ArrayView::I16(s)) => scalar_slice_hash(s),
        Some(ArrayView::I32(s)) => scalar_slice_hash(s),
        Some(ArrayView::I64(s)) => scalar_slice_hash(s),
        Some(ArrayView::F32(s)) => scalar_slice_hash(s),
        Some(ArrayView::F64(s)) => scalar_slice_hash(s),
        Some(ArrayView::Text(s)) => text_view_hash(&s),
    }
}

/// Object-array equality; each element uses its own [`Equate`].
pub fn objects_equal<E: Equate>(a: Option<&[E]>, b: Option<&[E]>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => std::ptr::eq(a, b) || slices_equal(a, b, E::equate),
        _ => false,
    }
}

pub fn objects_hash<E: Equate>(s: Option<&[E]>) -> i32 {
    s.map_or(0, |s| slice_hash(s, E::equate_hash))
}
