//! Procedural macros for `equate-core`.
//!
//! - `#[derive(Reflect)]` - generates a type's member layout

use proc_macro::TokenStream;

/// Reflect derive implementation.
mod reflect;

/// Generates `equate_core::Reflect` for a struct.
///
/// Every field becomes a member of the type's own level, in declaration
/// order. The member's value kind follows from the field type: numeric,
/// `bool` and `char` fields are scalars, vectors/boxed slices/arrays of
/// primitives or strings are arrays, sequences of other types are object
/// arrays, `Option<_>` is an absent-able reference and everything else a
/// present reference compared through its `Equate` impl.
///
/// Field attributes:
/// - `#[equate(include)]`, `#[equate(order = 10)]` - include-mark
/// - `#[equate(exclude)]` - exclude-mark
/// - `#[equate(transient)]` - derived state, skipped unless requested
/// - `#[equate(mutable)]` - may change after construction
/// - `#[equate(by_eq)]` - compare through `PartialEq` + `Hash`
/// - `#[equate(parent)]` - embedded parent type, contributes its own levels
/// - `#[equate(skip)]` - not part of the layout at all
///
/// ```ignore
/// #[derive(Reflect)]
/// struct Circle {
///     #[equate(parent)]
///     shape: Shape,
///     radius: f64,
///     #[equate(transient)]
///     area: f64,
///     hash: HashCache,
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(equate))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    reflect::derive_reflect(input)
}
