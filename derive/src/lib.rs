//! Derive macro for strata's `Populate` trait.
//!
//! The derive turns a plain struct definition into the runtime type
//! descriptor and generated accessors the engine walks: `shape()` describes
//! the fields, `vacant()` builds the all-`None` placeholder, and
//! `probe`/`apply` navigate a value by field-index path without the engine
//! knowing the concrete type.
//!
//! Field rules:
//! - a plain field is a leaf and must be `Option<T>`;
//! - `#[strata(nested)]` marks a nested section, `Option<S>` where
//!   `S: Populate`;
//! - `#[strata(flatten)]` embeds a bare struct's fields into the parent
//!   (never `Option` — the engine has no way to represent a missing
//!   embedded block);
//! - `#[strata(rename = "...")]` overrides the key segment;
//! - `#[strata(skip)]` hides a field from the engine entirely (it is
//!   `Default`-initialized by `vacant()`).

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, Type, parse_macro_input, spanned::Spanned};

#[proc_macro_derive(Populate, attributes(strata))]
pub fn derive_populate(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_populate_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Per-field facts extracted from the struct definition and its
/// `#[strata(...)]` attributes.
struct FieldInfo {
    ident: syn::Ident,
    ty: Type,
    rename: Option<String>,
    nested: bool,
    flatten: bool,
    skip: bool,
}

impl FieldInfo {
    fn from_field(field: &syn::Field) -> syn::Result<Self> {
        let ident = field
            .ident
            .clone()
            .expect("named fields are checked by the caller");
        let mut info = FieldInfo {
            ident,
            ty: field.ty.clone(),
            rename: None,
            nested: false,
            flatten: false,
            skip: false,
        };

        for attr in &field.attrs {
            if !attr.path().is_ident("strata") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("nested") {
                    info.nested = true;
                    Ok(())
                } else if meta.path.is_ident("flatten") {
                    info.flatten = true;
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    info.skip = true;
                    Ok(())
                } else if meta.path.is_ident("rename") {
                    let lit: LitStr = meta.value()?.parse()?;
                    info.rename = Some(lit.value());
                    Ok(())
                } else {
                    Err(meta.error("unknown strata attribute; expected nested, flatten, rename, or skip"))
                }
            })?;
        }

        if info.nested && info.flatten {
            return Err(syn::Error::new(
                field.span(),
                "a field cannot be both #[strata(nested)] and #[strata(flatten)]",
            ));
        }
        if info.flatten && info.rename.is_some() {
            return Err(syn::Error::new(
                field.span(),
                "#[strata(rename)] has no effect on flattened fields",
            ));
        }
        Ok(info)
    }
}

/// Extract `T` from `Option<T>` (also matches `std::option::Option<T>`).
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(tp) = ty else { return None };
    if tp.qself.is_some() {
        return None;
    }
    let seg = tp.path.segments.last()?;
    if seg.ident != "Option" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first()? {
        syn::GenericArgument::Type(t) => Some(t),
        _ => None,
    }
}

fn derive_populate_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "Populate cannot be derived for generic types",
        ));
    }

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "Populate can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new(
            input.span(),
            "Populate requires named fields",
        ));
    };

    let mut field_shapes: Vec<TokenStream2> = Vec::new();
    let mut vacant_inits: Vec<TokenStream2> = Vec::new();
    let mut probe_arms: Vec<TokenStream2> = Vec::new();
    let mut apply_arms: Vec<TokenStream2> = Vec::new();

    // Index space covers only the fields the engine can see; skipped fields
    // are invisible to index paths.
    let mut index = 0usize;

    for field in &named.named {
        let info = FieldInfo::from_field(field)?;
        let ident = &info.ident;

        if info.skip {
            vacant_inits.push(quote! { #ident: ::core::default::Default::default() });
            continue;
        }

        let ident_str = info.ident.to_string();
        let rename_tokens = match &info.rename {
            Some(r) => quote! { ::core::option::Option::Some(#r) },
            None => quote! { ::core::option::Option::None },
        };

        if info.flatten {
            let ty = &info.ty;
            if option_inner(ty).is_some() {
                return Err(syn::Error::new(
                    field.span(),
                    "#[strata(flatten)] requires a bare struct, not Option<_>",
                ));
            }
            field_shapes.push(quote! {
                ::strata::shape::FieldShape {
                    ident: #ident_str,
                    rename: #rename_tokens,
                    index: #index,
                    role: ::strata::shape::FieldRole::Embedded(
                        <#ty as ::strata::Populate>::shape,
                    ),
                }
            });
            vacant_inits.push(quote! { #ident: <#ty as ::strata::Populate>::vacant() });
            probe_arms.push(quote! {
                #index => {
                    if rest.is_empty() {
                        ::core::result::Result::Ok(::strata::shape::Probe::Struct { occupied: true })
                    } else {
                        ::strata::Populate::probe(&self.#ident, rest)
                    }
                }
            });
            apply_arms.push(quote! {
                #index => {
                    if rest.is_empty() {
                        match op {
                            ::strata::shape::Apply::Allocate => ::core::result::Result::Ok(()),
                            ::strata::shape::Apply::Set(_) => ::core::result::Result::Err(
                                ::strata::shape::AccessError::SetStruct { index: head },
                            ),
                        }
                    } else {
                        ::strata::Populate::apply(&mut self.#ident, rest, op)
                    }
                }
            });
            index += 1;
            continue;
        }

        let Some(inner) = option_inner(&info.ty) else {
            return Err(syn::Error::new(
                field.span(),
                "Populate fields must be Option<_>; mark sections #[strata(nested)], \
                 embedded structs #[strata(flatten)], or hide the field with #[strata(skip)]",
            ));
        };

        if info.nested {
            field_shapes.push(quote! {
                ::strata::shape::FieldShape {
                    ident: #ident_str,
                    rename: #rename_tokens,
                    index: #index,
                    role: ::strata::shape::FieldRole::Nested(
                        <#inner as ::strata::Populate>::shape,
                    ),
                }
            });
            vacant_inits.push(quote! { #ident: ::core::option::Option::None });
            probe_arms.push(quote! {
                #index => match &self.#ident {
                    ::core::option::Option::Some(inner) => {
                        if rest.is_empty() {
                            ::core::result::Result::Ok(::strata::shape::Probe::Struct { occupied: true })
                        } else {
                            ::strata::Populate::probe(inner, rest)
                        }
                    }
                    ::core::option::Option::None => {
                        if rest.is_empty() {
                            ::core::result::Result::Ok(::strata::shape::Probe::Struct { occupied: false })
                        } else {
                            ::core::result::Result::Ok(::strata::shape::Probe::Vacant)
                        }
                    }
                },
            });
            apply_arms.push(quote! {
                #index => {
                    if rest.is_empty() {
                        match op {
                            ::strata::shape::Apply::Allocate => {
                                self.#ident = ::core::option::Option::Some(
                                    <#inner as ::strata::Populate>::vacant(),
                                );
                                ::core::result::Result::Ok(())
                            }
                            ::strata::shape::Apply::Set(_) => ::core::result::Result::Err(
                                ::strata::shape::AccessError::SetStruct { index: head },
                            ),
                        }
                    } else {
                        match &mut self.#ident {
                            ::core::option::Option::Some(inner) => {
                                ::strata::Populate::apply(inner, rest, op)
                            }
                            ::core::option::Option::None => ::core::result::Result::Err(
                                ::strata::shape::AccessError::Unallocated { index: head },
                            ),
                        }
                    }
                }
            });
        } else {
            field_shapes.push(quote! {
                ::strata::shape::FieldShape {
                    ident: #ident_str,
                    rename: #rename_tokens,
                    index: #index,
                    role: ::strata::shape::FieldRole::Leaf(::strata::shape::LeafShape {
                        type_id: ::core::any::TypeId::of::<#inner>(),
                        type_name: ::core::any::type_name::<#inner>(),
                    }),
                }
            });
            vacant_inits.push(quote! { #ident: ::core::option::Option::None });
            probe_arms.push(quote! {
                #index => {
                    if !rest.is_empty() {
                        return ::core::result::Result::Err(
                            ::strata::shape::AccessError::PastLeaf { index: head },
                        );
                    }
                    ::core::result::Result::Ok(::strata::shape::Probe::Leaf(
                        self.#ident.as_ref().map(|v| {
                            ::std::boxed::Box::new(v.clone()) as ::strata::shape::BoxedLeaf
                        }),
                    ))
                }
            });
            apply_arms.push(quote! {
                #index => {
                    if !rest.is_empty() {
                        return ::core::result::Result::Err(
                            ::strata::shape::AccessError::PastLeaf { index: head },
                        );
                    }
                    match op {
                        ::strata::shape::Apply::Allocate => ::core::result::Result::Err(
                            ::strata::shape::AccessError::AllocateLeaf { index: head },
                        ),
                        ::strata::shape::Apply::Set(value) => match value.downcast::<#inner>() {
                            ::core::result::Result::Ok(v) => {
                                self.#ident = ::core::option::Option::Some(*v);
                                ::core::result::Result::Ok(())
                            }
                            ::core::result::Result::Err(_) => ::core::result::Result::Err(
                                ::strata::shape::AccessError::ValueType {
                                    expected: ::core::any::type_name::<#inner>(),
                                },
                            ),
                        },
                    }
                }
            });
        }
        index += 1;
    }

    Ok(quote! {
        #[automatically_derived]
        impl ::strata::Populate for #struct_name {
            fn shape() -> ::strata::shape::StructShape {
                ::strata::shape::StructShape {
                    type_name: ::core::any::type_name::<Self>(),
                    type_id: ::core::any::TypeId::of::<Self>(),
                    fields: ::std::vec![#(#field_shapes),*],
                }
            }

            fn vacant() -> Self {
                Self { #(#vacant_inits),* }
            }

            fn probe(
                &self,
                path: &[usize],
            ) -> ::core::result::Result<::strata::shape::Probe, ::strata::shape::AccessError> {
                let ::core::option::Option::Some((&head, rest)) = path.split_first() else {
                    return ::core::result::Result::Ok(
                        ::strata::shape::Probe::Struct { occupied: true },
                    );
                };
                match head {
                    #(#probe_arms)*
                    other => ::core::result::Result::Err(
                        ::strata::shape::AccessError::IndexOutOfRange { index: other },
                    ),
                }
            }

            fn apply(
                &mut self,
                path: &[usize],
                op: ::strata::shape::Apply,
            ) -> ::core::result::Result<(), ::strata::shape::AccessError> {
                let ::core::option::Option::Some((&head, rest)) = path.split_first() else {
                    return ::core::result::Result::Err(::strata::shape::AccessError::EmptyPath);
                };
                match head {
                    #(#apply_arms)*
                    other => ::core::result::Result::Err(
                        ::strata::shape::AccessError::IndexOutOfRange { index: other },
                    ),
                }
            }
        }
    })
}
