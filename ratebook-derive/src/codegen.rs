use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{LitStr, Result};

use crate::model::{ContainerKind, Field, RecordDef};

/// Produces the `Record` implementation for a parsed struct description.
pub fn generate(record: RecordDef, crate_path: syn::Path) -> Result<TokenStream> {
    let RecordDef {
        ident,
        generics,
        constructor,
        key_field,
        key_name,
        fields,
    } = record;

    let constructor_lit = LitStr::new(&constructor, Span::call_site());
    let key_lit = LitStr::new(&key_name, key_field.span());
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let push_fields: Vec<_> = fields
        .iter()
        .filter(|field| !field.ignore)
        .map(|field| generate_push(field, &crate_path))
        .collect();

    let init_fields: Vec<_> = fields
        .iter()
        .map(|field| generate_init(field, &constructor_lit, &crate_path))
        .collect::<Result<_>>()?;

    let raw_record = quote! { #crate_path::listing::RawRecord };
    let result_type = quote! { #crate_path::Result };
    let error_type = quote! { #crate_path::RatebookError };

    Ok(quote! {
        impl #impl_generics #crate_path::record::Record for #ident #ty_generics #where_clause {
            const CONSTRUCTOR: &'static str = #constructor_lit;
            const KEY_FIELD: &'static str = #key_lit;

            fn key(&self) -> &str {
                &self.#key_field
            }

            fn to_raw(&self) -> #raw_record {
                let mut raw = #raw_record::new(#constructor_lit);
                #( #push_fields )*
                raw
            }

            fn from_raw(raw: &#raw_record) -> #result_type<Self> {
                if raw.constructor() != #constructor_lit {
                    return Err(#error_type::ConstructorMismatch {
                        expected: ::std::string::String::from(#constructor_lit),
                        found: ::std::string::String::from(raw.constructor()),
                    });
                }
                Ok(Self { #(#init_fields),* })
            }
        }
    })
}

/// Emits the statement appending one field to the raw record, in declaration order.
fn generate_push(field: &Field, crate_path: &syn::Path) -> TokenStream {
    let ident = &field.ident;
    let key_lit = LitStr::new(&field.key, field.span);
    quote! {
        raw.push(#key_lit, #crate_path::literal::FieldValue::to_literal(&self.#ident));
    }
}

/// Generates the initializer for one field when reading a raw record.
fn generate_init(field: &Field, constructor: &LitStr, crate_path: &syn::Path) -> Result<TokenStream> {
    let Field {
        ident,
        key,
        kind,
        default,
        init,
        ignore,
        span,
    } = field;

    if *ignore {
        return Ok(if let Some(init) = init {
            quote! { #ident: #init }
        } else if let Some(default) = default {
            quote! { #ident: #default }
        } else {
            quote! { #ident: ::core::default::Default::default() }
        });
    }

    let kind = kind
        .as_ref()
        .ok_or_else(|| syn::Error::new(*span, "internal error: missing field kind"))?;

    let key_lit = LitStr::new(key, *span);
    let on_missing = missing_behavior(kind.container, default.as_ref(), constructor, &key_lit, crate_path);

    Ok(quote! {
        #ident: match raw.get(#key_lit) {
            ::core::option::Option::Some(literal) => {
                #crate_path::literal::FieldValue::from_literal(literal)
                    .map_err(|err| err.into_error(#constructor, #key_lit))?
            }
            ::core::option::Option::None => { #on_missing }
        }
    })
}

/// Handles missing fields by applying defaults or converting to `None`.
fn missing_behavior(
    container: ContainerKind,
    default: Option<&TokenStream>,
    constructor: &LitStr,
    key: &LitStr,
    crate_path: &syn::Path,
) -> TokenStream {
    if let Some(default) = default {
        return quote! { #default };
    }

    match container {
        ContainerKind::Plain | ContainerKind::Vec => {
            quote! { return Err(#crate_path::RatebookError::missing_field(#constructor, #key)) }
        }
        ContainerKind::Option | ContainerKind::OptionVec => {
            quote! { ::core::option::Option::None }
        }
    }
}
