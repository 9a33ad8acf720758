//! Reflect derive macro implementation.
//!
//! Turns a struct's fields into `MemberDef` declarations on its own level and
//! `#[equate(parent)]` fields into ancestor levels.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, Field, Fields, GenericArgument, Member, PathArguments, PathSegment, Type,
    parse_macro_input,
};

/// Field types compared as scalars.
const SCALARS: &[&str] = &[
    "bool", "char", "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize", "f32",
    "f64",
];

/// Element types with a dedicated array comparison.
const ARRAY_ELEMENTS: &[&str] = &["bool", "char", "i8", "i16", "i32", "i64", "f32", "f64", "String"];

#[derive(Default)]
struct FieldOptions {
    include: bool,
    order: Option<i32>,
    exclude: bool,
    transient: bool,
    mutable: bool,
    by_eq: bool,
    parent: bool,
    skip: bool,
}

enum Shape {
    Scalar,
    Array { optional: bool },
    ObjectArray { optional: bool },
    Reference { optional: bool },
    HashCache,
    Factory,
}

/// Entry point for the `#[derive(Reflect)]` macro.
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Reflect can only be derived for structs",
        ));
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Reflect cannot be derived for generic types",
        ));
    }

    let fields: Vec<(Member, &Field)> = match &data.fields {
        Fields::Named(named) => named
            .named
            .iter()
            .filter_map(|f| f.ident.clone().map(|ident| (Member::Named(ident), f)))
            .collect(),
        Fields::Unnamed(unnamed) => unnamed
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, f)| (Member::Unnamed(i.into()), f))
            .collect(),
        Fields::Unit => Vec::new(),
    };

    let mut members = Vec::new();
    let mut parents = Vec::new();
    for (member, field) in &fields {
        let options = field_options(field)?;
        if options.skip {
            continue;
        }
        if options.parent {
            if options.include || options.order.is_some() || options.exclude || options.transient
                || options.mutable || options.by_eq
            {
                return Err(syn::Error::new_spanned(
                    field,
                    "a parent field takes no other equate attributes",
                ));
            }
            let ty = &field.ty;
            parents.push(quote! {
                .parent(<#ty as ::equate_core::Reflect>::layout(), |__v| &__v.#member)
            });
            continue;
        }
        members.push(member_def(member, field, &options));
    }

    let ident = &input.ident;
    Ok(quote! {
        impl ::equate_core::Reflect for #ident {
            fn layout() -> ::equate_core::Layout<Self> {
                ::equate_core::Layout::<Self>::new()
                    #(.member(#members))*
                    #(#parents)*
            }
        }
    })
}

fn field_options(field: &Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("equate")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("include") {
                options.include = true;
            } else if meta.path.is_ident("order") {
                let lit: syn::LitInt = meta.value()?.parse()?;
                options.order = Some(lit.base10_parse()?);
            } else if meta.path.is_ident("exclude") {
                options.exclude = true;
            } else if meta.path.is_ident("transient") {
                options.transient = true;
            } else if meta.path.is_ident("mutable") {
                options.mutable = true;
            } else if meta.path.is_ident("by_eq") {
                options.by_eq = true;
            } else if meta.path.is_ident("parent") {
                options.parent = true;
            } else if meta.path.is_ident("skip") {
                options.skip = true;
            } else {
                return Err(meta.error("unknown equate attribute"));
            }
            Ok(())
        })?;
    }
    Ok(options)
}

fn member_def(member: &Member, field: &Field, options: &FieldOptions) -> TokenStream2 {
    let name = match member {
        Member::Named(ident) => {
            let name = ident.to_string();
            name.strip_prefix("r#").map(str::to_owned).unwrap_or(name)
        }
        Member::Unnamed(index) => index.index.to_string(),
    };
    let shape = classify(&field.ty);
    let mut def = if options.by_eq {
        let get = accessor(member, matches!(
            shape,
            Shape::Array { optional: true }
                | Shape::ObjectArray { optional: true }
                | Shape::Reference { optional: true }
        ));
        quote!(::equate_core::MemberDef::<Self>::reference_by_eq(#name, #get))
    } else {
        match shape {
            Shape::Scalar => quote!(::equate_core::MemberDef::<Self>::scalar(#name, |__v| __v.#member)),
            Shape::Array { optional } => {
                let get = accessor(member, optional);
                quote!(::equate_core::MemberDef::<Self>::array(#name, #get))
            }
            Shape::ObjectArray { optional } => {
                let get = accessor(member, optional);
                quote!(::equate_core::MemberDef::<Self>::object_array(#name, #get))
            }
            Shape::Reference { optional } => {
                let get = accessor(member, optional);
                quote!(::equate_core::MemberDef::<Self>::reference(#name, #get))
            }
            Shape::HashCache => {
                quote!(::equate_core::MemberDef::<Self>::hash_cache(#name, |__v| &__v.#member))
            }
            Shape::Factory => quote!(::equate_core::MemberDef::<Self>::factory(#name)),
        }
    };

    if let Some(order) = options.order {
        def = quote!(#def.order(#order));
    } else if options.include {
        def = quote!(#def.include());
    }
    if options.exclude {
        def = quote!(#def.exclude());
    }
    if options.transient {
        def = quote!(#def.transient());
    }
    if options.mutable {
        def = quote!(#def.mutable());
    }
    def
}

/// `Option<&Field>` for the field, as-is when it already is an `Option`.
fn accessor(member: &Member, optional: bool) -> TokenStream2 {
    if optional {
        quote!(|__v| __v.#member.as_ref())
    } else {
        quote!(|__v| ::core::option::Option::Some(&__v.#member))
    }
}

/// Classifies a field by its written type. Type aliases are not resolved, so
/// an alias of a scalar is treated as a reference.
fn classify(ty: &Type) -> Shape {
    if let Some(element) = sequence_element(ty) {
        return sequence(element, false);
    }
    let Some(segment) = last_segment(ty) else {
        return Shape::Reference { optional: false };
    };
    let ident = segment.ident.to_string();
    match ident.as_str() {
        "HashCache" => Shape::HashCache,
        "Factory" | "StaticFactory" => Shape::Factory,
        "Option" => match first_type_arg(segment).and_then(sequence_element) {
            Some(element) => sequence(element, true),
            None => Shape::Reference { optional: true },
        },
        name if segment.arguments.is_empty() && SCALARS.contains(&name) => Shape::Scalar,
        _ => Shape::Reference { optional: false },
    }
}

fn sequence(element: &Type, optional: bool) -> Shape {
    if is_array_element(element) {
        Shape::Array { optional }
    } else {
        Shape::ObjectArray { optional }
    }
}

/// Element type of `Vec<E>`, `Box<[E]>` and `[E; N]`.
fn sequence_element(ty: &Type) -> Option<&Type> {
    match ty {
        Type::Array(array) => Some(&array.elem),
        Type::Group(group) => sequence_element(&group.elem),
        _ => {
            let segment = last_segment(ty)?;
            if segment.ident == "Vec" {
                first_type_arg(segment)
            } else if segment.ident == "Box" {
                match first_type_arg(segment)? {
                    Type::Slice(slice) => Some(&slice.elem),
                    _ => None,
                }
            } else {
                None
            }
        }
    }
}

fn is_array_element(ty: &Type) -> bool {
    match ty {
        Type::Reference(reference) => {
            reference.mutability.is_none()
                && reference
                    .lifetime
                    .as_ref()
                    .is_some_and(|lifetime| lifetime.ident == "static")
                && matches!(&*reference.elem, Type::Path(path) if path.path.is_ident("str"))
        }
        _ => match last_segment(ty) {
            Some(segment) if segment.ident == "Option" => first_type_arg(segment)
                .and_then(last_segment)
                .is_some_and(|inner| inner.ident == "String"),
            Some(segment) => {
                segment.arguments.is_empty()
                    && ARRAY_ELEMENTS.iter().any(|name| segment.ident == *name)
            }
            None => false,
        },
    }
}

fn last_segment(ty: &Type) -> Option<&PathSegment> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        Type::Group(group) => last_segment(&group.elem),
        _ => None,
    }
}

fn first_type_arg(segment: &PathSegment) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape_of(ty: &str) -> Shape {
        classify(&syn::parse_str::<Type>(ty).unwrap())
    }

    #[test]
    fn classifies_field_types() {
        assert!(matches!(shape_of("f64"), Shape::Scalar));
        assert!(matches!(shape_of("usize"), Shape::Scalar));
        assert!(matches!(shape_of("String"), Shape::Reference { optional: false }));
        assert!(matches!(shape_of("Option<String>"), Shape::Reference { optional: true }));
        assert!(matches!(shape_of("Vec<i32>"), Shape::Array { optional: false }));
        assert!(matches!(shape_of("[f32; 3]"), Shape::Array { optional: false }));
        assert!(matches!(shape_of("Box<[String]>"), Shape::Array { optional: false }));
        assert!(matches!(shape_of("Vec<Option<String>>"), Shape::Array { optional: false }));
        assert!(matches!(shape_of("Vec<&'static str>"), Shape::Array { optional: false }));
        assert!(matches!(shape_of("Option<Vec<char>>"), Shape::Array { optional: true }));
        assert!(matches!(shape_of("Vec<u8>"), Shape::ObjectArray { optional: false }));
        assert!(matches!(shape_of("Vec<Point>"), Shape::ObjectArray { optional: false }));
        assert!(matches!(shape_of("equate_core::HashCache"), Shape::HashCache));
        assert!(matches!(shape_of("StaticFactory<Point>"), Shape::Factory));
    }

    #[test]
    fn rejects_enums_and_generics() {
        let input: DeriveInput = syn::parse_str("enum Choice { A, B }").unwrap();
        assert!(expand(&input).is_err());
        let input: DeriveInput = syn::parse_str("struct Wrapper<T> { inner: T }").unwrap();
        assert!(expand(&input).is_err());
    }

    #[test]
    fn parent_fields_take_no_markers() {
        let input: DeriveInput =
            syn::parse_str("struct Circle { #[equate(parent, include)] shape: Shape }").unwrap();
        let err = expand(&input).unwrap_err();
        assert!(err.to_string().contains("parent"));
    }

    #[test]
    fn unknown_attributes_are_reported() {
        let input: DeriveInput =
            syn::parse_str("struct Point { #[equate(sorted)] x: i32 }").unwrap();
        let err = expand(&input).unwrap_err();
        assert!(err.to_string().contains("unknown equate attribute"));
    }
}
