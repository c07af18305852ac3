//! CallbackData derive macro implementation.
//!
//! # Generated items
//!
//! `#[derive(CallbackData)]` implements `CallbackPayload`:
//!
//! 1. `SHAPE` - type name, marker annotations and every named field with its
//!    visibility and exclusion flags
//! 2. `field_text` / `set_field_text` - one match arm per packed field,
//!    going through `CallbackValue`
//! 3. `matches_pattern` - compares every matched field whose pattern value
//!    differs from `Default::default()`
//!
//! # Struct-level attributes `#[callback(...)]`
//!
//! | Key | Example | Description |
//! |-----|---------|-------------|
//! | `prefix` | `"order"` | Wire prefix |
//! | `separator` | `"\|"` | Field separator |
//! | `crate` | `"::ferrogram::core"` | Path to the core crate |
//!
//! # Field-level attributes `#[callback(...)]`
//!
//! | Key | Description |
//! |-----|-------------|
//! | `skip` | Excluded from packing and parsing |
//! | `skip_match` | Excluded from pattern matching |

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, Path, Type, Visibility};

// ============================================================================
// Attribute structures
// ============================================================================

/// Struct-level `#[callback(...)]` values.
#[derive(Default)]
struct StructAttrs {
    prefix: Option<String>,
    separator: Option<String>,
    krate: Option<Path>,
}

/// Per-field `#[callback(...)]` markers.
#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    skip_match: bool,
}

struct FieldInfo {
    ident: Ident,
    ty: Type,
    visible: bool,
    attrs: FieldAttrs,
}

impl FieldInfo {
    fn is_packed(&self) -> bool {
        self.visible && !self.attrs.skip
    }

    fn is_matched(&self) -> bool {
        self.visible && !self.attrs.skip_match
    }
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_callback_data(input: &DeriveInput) -> syn::Result<TokenStream> {
    let attrs = parse_struct_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named
                .named
                .iter()
                .map(|f| {
                    Ok(FieldInfo {
                        ident: f
                            .ident
                            .clone()
                            .ok_or_else(|| syn::Error::new_spanned(f, "expected a named field"))?,
                        ty: f.ty.clone(),
                        visible: matches!(f.vis, Visibility::Public(_)),
                        attrs: parse_field_attrs(&f.attrs)?,
                    })
                })
                .collect::<syn::Result<Vec<_>>>()?,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "CallbackData can only be derived for structs with named fields",
                ));
            }
        },
        Data::Enum(_) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "CallbackData does not support enums",
            ));
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "CallbackData cannot be derived for unions",
            ));
        }
    };

    Ok(generate_impl(input, &attrs, &fields))
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_struct_attrs(attrs: &[Attribute]) -> syn::Result<StructAttrs> {
    let mut result = StructAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("callback") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("prefix") {
                result.prefix = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("separator") {
                let sep = meta.value()?.parse::<LitStr>()?;
                if sep.value().is_empty() {
                    return Err(syn::Error::new_spanned(sep, "separator cannot be empty"));
                }
                result.separator = Some(sep.value());
            } else if meta.path.is_ident("crate") {
                result.krate = Some(meta.value()?.parse::<LitStr>()?.parse::<Path>()?);
            } else {
                return Err(meta.error("unknown callback attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("callback") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("skip_match") {
                result.skip_match = true;
            } else {
                return Err(meta.error("unknown callback field attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

// ============================================================================
// Code generation
// ============================================================================

fn option_lit(value: &Option<String>) -> TokenStream {
    match value {
        Some(v) => quote! { ::core::option::Option::Some(#v) },
        None => quote! { ::core::option::Option::None },
    }
}

fn generate_impl(input: &DeriveInput, attrs: &StructAttrs, fields: &[FieldInfo]) -> TokenStream {
    let name = &input.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let krate = attrs
        .krate
        .clone()
        .map(|p| quote! { #p })
        .unwrap_or_else(|| quote! { ::ferrogram_core });
    let cb = quote! { #krate::callback };

    let prefix = option_lit(&attrs.prefix);
    let separator = option_lit(&attrs.separator);

    let field_shapes = fields.iter().map(|f| {
        let field_name = f.ident.to_string();
        let visible = f.visible;
        let skip = f.attrs.skip;
        let skip_match = f.attrs.skip_match;
        quote! {
            #cb::FieldShape {
                name: #field_name,
                visible: #visible,
                skip: #skip,
                skip_match: #skip_match,
            }
        }
    });

    let packed: Vec<&FieldInfo> = fields.iter().filter(|f| f.is_packed()).collect();

    let text_arms = packed.iter().map(|f| {
        let ident = &f.ident;
        let field_name = ident.to_string();
        quote! {
            #field_name => ::core::option::Option::Some(
                #cb::CallbackValue::to_callback_text(&self.#ident)
            ),
        }
    });

    let set_arms = packed.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let field_name = ident.to_string();
        quote! {
            #field_name => match <#ty as #cb::CallbackValue>::from_callback_text(raw) {
                ::core::option::Option::Some(value) => {
                    self.#ident = value;
                    true
                }
                ::core::option::Option::None => false,
            },
        }
    });

    let match_checks = fields.iter().filter(|f| f.is_matched()).map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        quote! {
            if pattern.#ident != <#ty as ::core::default::Default>::default()
                && pattern.#ident != self.#ident
            {
                return false;
            }
        }
    });

    quote! {
        impl #impl_generics #cb::CallbackPayload for #name #ty_generics #where_clause {
            const SHAPE: #cb::RecordShape = #cb::RecordShape {
                type_name: #name_str,
                marker: ::core::option::Option::Some(#cb::CallbackMarker {
                    prefix: #prefix,
                    separator: #separator,
                }),
                fields: &[#(#field_shapes),*],
            };

            fn field_text(&self, name: &str) -> ::core::option::Option<::std::string::String> {
                match name {
                    #(#text_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn set_field_text(&mut self, name: &str, raw: &str) -> bool {
                match name {
                    #(#set_arms)*
                    _ => false,
                }
            }

            #[allow(unused_variables)]
            fn matches_pattern(&self, pattern: &Self) -> bool {
                #(#match_checks)*
                true
            }
        }
    }
}
