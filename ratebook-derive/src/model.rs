use proc_macro2::{Span, TokenStream};
use syn::{Ident, Type};

/// Intermediate representation of a struct annotated with `#[derive(Record)]`.
#[derive(Debug, Clone)]
pub struct RecordDef {
    pub ident: Ident,
    pub generics: syn::Generics,
    pub constructor: String,
    pub key_field: Ident,
    pub key_name: String,
    pub fields: Vec<Field>,
}

/// Description of a single field within a derived record.
#[derive(Debug, Clone)]
pub struct Field {
    pub ident: Ident,
    pub key: String,
    pub kind: Option<FieldType>,
    pub default: Option<TokenStream>,
    pub init: Option<TokenStream>,
    pub ignore: bool,
    pub span: Span,
}

/// Fully classified field type, including container and scalar information.
#[derive(Debug, Clone)]
pub struct FieldType {
    pub container: ContainerKind,
    pub scalar: ScalarKind,
}

/// High-level container category for a field (plain, option, vector, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Plain,
    Vec,
    Option,
    OptionVec,
}

/// Scalar category, used to turn `default = ...` literals into typed expressions.
#[derive(Debug, Clone)]
pub enum ScalarKind {
    String,
    Bool,
    Integer,
    Float(FloatKind),
    /// Any other type; literal defaults go through its `FromStr` implementation.
    Custom(Type),
}

/// Supported floating-point widths.
#[derive(Debug, Clone, Copy)]
pub enum FloatKind {
    F32,
    F64,
}

impl FloatKind {
    /// Returns the Rust type tokens for the floating-point variant.
    pub fn type_tokens(&self) -> TokenStream {
        match self {
            Self::F32 => quote::quote!(f32),
            Self::F64 => quote::quote!(f64),
        }
    }
}

impl FieldType {
    /// Returns `true` for a bare `String` field, the only shape allowed as a record key.
    pub fn is_plain_string(&self) -> bool {
        self.container == ContainerKind::Plain && matches!(self.scalar, ScalarKind::String)
    }
}
