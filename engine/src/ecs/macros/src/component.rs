use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

pub fn derive_component(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let ast = parse_macro_input!(input as DeriveInput);

    // Get the type name and any generics we are annotating
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    // `::morph_engine` resolves inside the crate through `extern crate self as morph_engine;`
    // in lib.rs, and outside the crate through the normal dependency.
    TokenStream::from(quote! {
        impl #impl_generics ::morph_engine::ecs::Component for #name #ty_generics #where_clause {
        }
    })
}
