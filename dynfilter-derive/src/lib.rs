extern crate proc_macro;
use darling::FromDeriveInput;
use syn::DeriveInput;

mod filterable;
use filterable::FilterableInfo;

/// Implement `Filterable` and `FilterField` for a struct with named fields.
///
/// Field attributes: `#[filter(rename = "name")]` exposes the field under another name,
/// `#[filter(skip)]` hides it from filters.
#[proc_macro_derive(Filterable, attributes(filter))]
pub fn filterable(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let parsed: DeriveInput = match syn::parse(input) {
        Ok(parsed) => parsed,
        Err(err) => return err.to_compile_error().into(),
    };
    let gen = match FilterableInfo::from_derive_input(&parsed) {
        Ok(info) => info.to_tokens(),
        Err(err) => err.write_errors(),
    };
    gen.into()
}
