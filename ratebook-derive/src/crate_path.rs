use proc_macro2::Span;
use syn::{Error, Path};

/// Resolves the path to the `ratebook` crate, accommodating renamed dependencies.
pub fn ratebook_path() -> Result<Path, Error> {
    match proc_macro_crate::crate_name("ratebook") {
        Ok(proc_macro_crate::FoundCrate::Itself) => Ok(syn::parse_quote!(ratebook)),
        Ok(proc_macro_crate::FoundCrate::Name(name)) => {
            let ident = syn::Ident::new(&name, Span::call_site());
            let mut path = Path::from(ident);
            path.leading_colon = None;
            Ok(path)
        }
        Err(_) => Ok(syn::parse_quote!(ratebook)),
    }
}
