mod codegen;
mod crate_path;
mod model;
mod parser;

use proc_macro::TokenStream;
use syn::DeriveInput;

/// Expands `#[derive(Record)]` into the mapping between a struct and a listing record.
#[proc_macro_derive(Record, attributes(record))]
pub fn record_derive(input: TokenStream) -> TokenStream {
    match expand(input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}

/// Parses the derive input and produces the final token stream.
fn expand(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = syn::parse(input)?;
    let record = parser::parse_record(input)?;
    let crate_path = crate_path::ratebook_path()?;
    let tokens = codegen::generate(record, crate_path)?;
    Ok(tokens.into())
}
