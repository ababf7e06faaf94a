use std::collections::HashMap;

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;
use syn::{Attribute, DeriveInput, Expr, Field as SynField, Fields, Ident, Lit, LitStr, Result, Type};

use crate::model::{ContainerKind, Field, FieldType, FloatKind, RecordDef, ScalarKind};

/// Parses the derive input into the intermediate `RecordDef` representation.
pub fn parse_record(input: DeriveInput) -> Result<RecordDef> {
    let DeriveInput {
        attrs,
        ident,
        generics,
        data,
        ..
    } = input;

    let constructor = parse_constructor_name(&attrs, &ident)?;

    let data = match data {
        syn::Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                ident.span(),
                "#[derive(Record)] can only be applied to structs",
            ))
        }
    };

    let fields = match data.fields {
        Fields::Named(named) => named.named,
        _ => {
            return Err(syn::Error::new(
                ident.span(),
                "#[derive(Record)] requires named fields",
            ))
        }
    };

    let mut result_fields = Vec::new();
    let mut seen_keys: HashMap<String, Span> = HashMap::new();
    let mut key_field: Option<(Ident, String, Span)> = None;

    for field in fields {
        let (parsed, is_key) = parse_field(&field, &mut seen_keys)?;
        if is_key {
            if let Some((_, _, prev_span)) = &key_field {
                return Err(syn::Error::new(
                    field.span(),
                    "only one field can be marked #[record(key)]",
                )
                .with_span(*prev_span));
            }
            let valid = parsed.kind.as_ref().is_some_and(FieldType::is_plain_string);
            if !valid {
                return Err(syn::Error::new(
                    field.span(),
                    "#[record(key)] field must be a non-ignored `String`",
                ));
            }
            key_field = Some((parsed.ident.clone(), parsed.key.clone(), parsed.span));
        }
        result_fields.push(parsed);
    }

    let (key_field, key_name, _) = key_field.ok_or_else(|| {
        syn::Error::new(
            ident.span(),
            "#[derive(Record)] requires one field marked #[record(key)]",
        )
    })?;

    Ok(RecordDef {
        ident,
        generics,
        constructor,
        key_field,
        key_name,
        fields: result_fields,
    })
}

/// Extracts the constructor name from `#[record(constructor = ...)]`, defaulting to the type name.
fn parse_constructor_name(attrs: &[Attribute], ident: &Ident) -> Result<String> {
    let mut constructor: Option<String> = None;

    for attr in attrs {
        if !is_record_attr(attr) {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("constructor") {
                if constructor.is_some() {
                    return Err(meta.error("duplicate #[record(constructor = ...)] attribute"));
                }
                let value: LitStr = meta.value()?.parse()?;
                if !is_identifier(&value.value()) {
                    return Err(syn::Error::new(
                        value.span(),
                        "constructor name must be a plain identifier",
                    ));
                }
                constructor = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported attribute on struct for #[derive(Record)]"))
            }
        })?;
    }

    Ok(constructor.unwrap_or_else(|| ident.to_string()))
}

/// Parses an individual struct field, tracking duplicate keys and metadata.
///
/// Returns the field along with whether it carries `#[record(key)]`.
fn parse_field(field: &SynField, seen_keys: &mut HashMap<String, Span>) -> Result<(Field, bool)> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new(field.span(), "expected named field"))?;

    let mut rename: Option<String> = None;
    let mut default_expr: Option<Expr> = None;
    let mut init_expr: Option<Expr> = None;
    let mut ignore = false;
    let mut is_key = false;

    for attr in &field.attrs {
        if !is_record_attr(attr) {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if rename.is_some() {
                    return Err(meta.error("duplicate #[record(rename = ...)] attribute"));
                }
                let value: LitStr = meta.value()?.parse()?;
                if !is_identifier(&value.value()) {
                    return Err(syn::Error::new(
                        value.span(),
                        "field names must be plain identifiers",
                    ));
                }
                rename = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("default") {
                if default_expr.is_some() {
                    return Err(meta.error("duplicate #[record(default = ...)] attribute"));
                }
                let expr: Expr = meta.value()?.parse()?;
                default_expr = Some(expr);
                Ok(())
            } else if meta.path.is_ident("init") {
                if init_expr.is_some() {
                    return Err(meta.error("duplicate #[record(init = ...)] attribute"));
                }
                init_expr = Some(parse_init_expr(&meta)?);
                Ok(())
            } else if meta.path.is_ident("ignore") {
                if ignore {
                    return Err(meta.error("duplicate #[record(ignore)] attribute"));
                }
                ignore = true;
                Ok(())
            } else if meta.path.is_ident("key") {
                if is_key {
                    return Err(meta.error("duplicate #[record(key)] attribute"));
                }
                is_key = true;
                Ok(())
            } else {
                Err(meta.error("unsupported attribute for #[derive(Record)]"))
            }
        })?;
    }

    if default_expr.is_some() && init_expr.is_some() {
        return Err(syn::Error::new(
            field.span(),
            "#[record(default = ...)] and #[record(init = ...)] cannot be combined",
        ));
    }

    if init_expr.is_some() && !ignore {
        return Err(syn::Error::new(
            field.span(),
            "#[record(init = ...)] is only valid together with #[record(ignore)]",
        ));
    }

    let key = rename.unwrap_or_else(|| ident.to_string());

    if !ignore {
        if let Some(prev_span) = seen_keys.insert(key.clone(), field.span()) {
            return Err(syn::Error::new(
                field.span(),
                format!("duplicate record field `{}` (previously declared here)", key),
            )
            .with_span(prev_span));
        }
    }

    let kind = if ignore {
        None
    } else {
        Some(classify_type(&field.ty)?)
    };

    let default_tokens = if let (Some(expr), Some(kind)) = (&default_expr, &kind) {
        Some(transform_default(expr.clone(), kind)?)
    } else if let Some(expr) = &default_expr {
        Some(quote! { #expr })
    } else {
        None
    };

    let init_tokens = init_expr.map(|expr| quote! { #expr });

    Ok((
        Field {
            ident,
            key,
            kind,
            default: default_tokens,
            init: init_tokens,
            ignore,
            span: field.span(),
        },
        is_key,
    ))
}

/// Returns `true` when the attribute is `#[record(...)]`.
fn is_record_attr(attr: &Attribute) -> bool {
    attr.path().is_ident("record")
}

/// Checks that `name` is usable as a bare identifier inside a listing.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Parses the `init` attribute, allowing either raw expressions or string literals.
fn parse_init_expr(meta: &ParseNestedMeta) -> Result<Expr> {
    let expr: Expr = meta.value()?.parse()?;
    if let Expr::Lit(expr_lit) = &expr {
        if let Lit::Str(lit) = &expr_lit.lit {
            return syn::parse_str::<Expr>(&lit.value());
        }
    }
    Ok(expr)
}

/// Classifies a field type into container and scalar components.
fn classify_type(ty: &Type) -> Result<FieldType> {
    let (container, inner) = classify_container(ty)?;
    let scalar = classify_scalar(inner)?;
    Ok(FieldType { container, scalar })
}

/// Determines the outer container kind and the innermost scalar type.
fn classify_container(ty: &Type) -> Result<(ContainerKind, &Type)> {
    if let Some(inner) = match_outer_type(ty, "Option") {
        let (inner_container, inner_ty) = classify_container(inner)?;
        return match inner_container {
            ContainerKind::Plain => Ok((ContainerKind::Option, inner_ty)),
            ContainerKind::Vec => Ok((ContainerKind::OptionVec, inner_ty)),
            _ => Err(syn::Error::new(
                inner.span(),
                "Option can only wrap scalar or Vec types",
            )),
        };
    }

    if let Some(inner) = match_outer_type(ty, "Vec") {
        return Ok((ContainerKind::Vec, inner));
    }

    Ok((ContainerKind::Plain, ty))
}

/// Resolves the scalar kind of the innermost type.
fn classify_scalar(ty: &Type) -> Result<ScalarKind> {
    let ident = type_ident(ty)?;
    match ident.as_str() {
        "String" => Ok(ScalarKind::String),
        "bool" => Ok(ScalarKind::Bool),
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" => Ok(ScalarKind::Integer),
        "u64" | "usize" | "isize" | "i128" | "u128" => Err(syn::Error::new_spanned(
            ty,
            "record integers are stored as i64; use i64 or a narrower integer type",
        )),
        "f32" => Ok(ScalarKind::Float(FloatKind::F32)),
        "f64" => Ok(ScalarKind::Float(FloatKind::F64)),
        _ => Ok(ScalarKind::Custom(ty.clone())),
    }
}

/// Extracts the terminal identifier from a type path.
fn type_ident(ty: &Type) -> Result<String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => {
            let ident = &path
                .path
                .segments
                .last()
                .ok_or_else(|| syn::Error::new(ty.span(), "invalid type path"))?
                .ident;
            Ok(ident.to_string())
        }
        _ => Err(syn::Error::new(
            ty.span(),
            "unsupported field type for #[derive(Record)]",
        )),
    }
}

/// Returns the inner generic type when `ty` matches the expected outer type.
fn match_outer_type<'a>(ty: &'a Type, expected: &str) -> Option<&'a Type> {
    let path = match ty {
        Type::Path(path) if path.qself.is_none() => path,
        _ => return None,
    };

    let last = path.path.segments.last()?;
    if last.ident == expected {
        if let syn::PathArguments::AngleBracketed(generic) = &last.arguments {
            if generic.args.len() == 1 {
                if let Some(syn::GenericArgument::Type(inner)) = generic.args.first() {
                    return Some(inner);
                }
            }
        }
    }

    None
}

/// Converts a literal default expression into tokens matching the field type.
fn transform_default(expr: Expr, field_type: &FieldType) -> Result<TokenStream> {
    match field_type.container {
        ContainerKind::Plain => literal_tokens(expr, &field_type.scalar),
        ContainerKind::Option => {
            let tokens = literal_tokens(expr, &field_type.scalar)?;
            Ok(quote! { ::core::option::Option::Some(#tokens) })
        }
        ContainerKind::Vec => transform_vec_default(expr, &field_type.scalar, false),
        ContainerKind::OptionVec => transform_vec_default(expr, &field_type.scalar, true),
    }
}

/// Validates and converts defaults specified for vector and option-vector fields.
fn transform_vec_default(
    expr: Expr,
    scalar: &ScalarKind,
    wrap_option: bool,
) -> Result<TokenStream> {
    match expr {
        Expr::Array(array) => {
            let elements: Vec<_> = array
                .elems
                .into_iter()
                .map(|element| literal_tokens(element, scalar))
                .collect::<Result<Vec<_>>>()?;
            if wrap_option {
                Ok(quote! { ::core::option::Option::Some(vec![#(#elements),*]) })
            } else {
                Ok(quote! { vec![#(#elements),*] })
            }
        }
        _ => Err(syn::Error::new(
            expr.span(),
            "defaults for Vec<T> must use [ ... ] syntax",
        )),
    }
}

/// Returns the literal inside `expr`, or an error naming what was expected.
fn expect_literal<'a>(expr: &'a Expr, expected: &str) -> Result<&'a Lit> {
    match expr {
        Expr::Lit(expr_lit) => Ok(&expr_lit.lit),
        _ => Err(syn::Error::new(expr.span(), format!("expected {expected}"))),
    }
}

/// Transforms validated literals into concrete tokens used in generated code.
fn literal_tokens(expr: Expr, scalar: &ScalarKind) -> Result<TokenStream> {
    match scalar {
        ScalarKind::String => match expect_literal(&expr, "string literal")? {
            Lit::Str(lit) => Ok(quote! { ::std::string::String::from(#lit) }),
            _ => Err(syn::Error::new(expr.span(), "expected string literal")),
        },
        ScalarKind::Bool => match expect_literal(&expr, "boolean literal")? {
            Lit::Bool(_) => Ok(quote! { #expr }),
            _ => Err(syn::Error::new(expr.span(), "expected boolean literal")),
        },
        ScalarKind::Integer => match expect_literal(&expr, "integer literal")? {
            Lit::Int(_) => Ok(quote! { #expr }),
            _ => Err(syn::Error::new(expr.span(), "expected integer literal")),
        },
        ScalarKind::Float(kind) => match expect_literal(&expr, "float literal")? {
            Lit::Float(_) | Lit::Int(_) => {
                let ty = kind.type_tokens();
                Ok(quote! { (#expr) as #ty })
            }
            _ => Err(syn::Error::new(expr.span(), "expected float literal")),
        },
        ScalarKind::Custom(ty) => {
            let text = match expect_literal(&expr, "literal")? {
                Lit::Str(lit) => lit.value(),
                Lit::Int(lit) => lit.base10_digits().to_string(),
                Lit::Float(lit) => lit.base10_digits().to_string(),
                Lit::Bool(lit) => lit.value.to_string(),
                _ => {
                    return Err(syn::Error::new(
                        expr.span(),
                        "expected string, number, or boolean literal",
                    ))
                }
            };
            let text = LitStr::new(&text, expr.span());
            Ok(quote! {
                <#ty as ::core::str::FromStr>::from_str(#text).expect("invalid default literal")
            })
        }
    }
}

/// Helper trait for enriching errors with additional span information.
trait ErrorWithSpan {
    /// Combines `self` with an extra error pointing at `span` for better diagnostics.
    fn with_span(self, span: Span) -> Self;
}

impl ErrorWithSpan for syn::Error {
    fn with_span(mut self, span: Span) -> Self {
        self.combine(syn::Error::new(span, "see previous definition"));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_integers_are_rejected() {
        let input: DeriveInput = syn::parse_quote! {
            struct Counter {
                #[record(key)]
                name: String,
                total: u64,
            }
        };
        let err = parse_record(input).err().map(|err| err.to_string());
        assert_eq!(
            err.as_deref(),
            Some("record integers are stored as i64; use i64 or a narrower integer type")
        );
    }

    #[test]
    fn narrow_integers_are_accepted() {
        let input: DeriveInput = syn::parse_quote! {
            struct Counter {
                #[record(key)]
                name: String,
                total: u32,
                samples: Option<Vec<i16>>,
            }
        };
        let record = parse_record(input).expect("record parses");
        assert_eq!(record.fields.len(), 3);
    }
}
