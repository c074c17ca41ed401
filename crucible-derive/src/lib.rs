//! Derive macros for Crucible property-based testing.
//!
//! This crate provides `#[derive(Arbitrary)]`, which gives a custom type a
//! canonical strategy built from the strategies of its fields.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, parse_quote, Data, DeriveInput, Fields, GenericParam};

/// Derive macro implementing `crucible::Arbitrary`.
///
/// Fields are drawn in declaration order from their own `Arbitrary`
/// strategies, so a derived value shrinks field by field. Enums draw a
/// variant index first and shrink toward the first variant.
///
/// # Example
///
/// ```rust,ignore
/// use crucible::*;
///
/// #[derive(Arbitrary, Debug, Clone, PartialEq)]
/// struct User {
///     name: String,
///     age: u32,
///     admin: bool,
/// }
///
/// let users = any::<User>();
/// ```
#[proc_macro_derive(Arbitrary)]
pub fn derive_arbitrary(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match arbitrary_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Generate the implementation for the Arbitrary trait.
fn arbitrary_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;
    let mut generics = input.generics.clone();
    for param in &mut generics.params {
        if let GenericParam::Type(type_param) = param {
            type_param.bounds.push(parse_quote!(crucible::Arbitrary));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => construct(quote!(Self), &data.fields),
        Data::Enum(data) => enum_body(input, data)?,
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Arbitrary derive macro does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics crucible::Arbitrary for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn arbitrary() -> crucible::Strategy<Self> {
                crucible::Strategy::new(|stream: &mut crucible::ByteStream| {
                    ::std::result::Result::Ok(#body)
                })
            }
        }
    })
}

/// Expression building `path` from fields drawn in order.
fn construct(path: TokenStream2, fields: &Fields) -> TokenStream2 {
    let draw = |ty: &syn::Type| {
        quote! {
            <#ty as crucible::Arbitrary>::arbitrary().draw(stream)?
        }
    };
    match fields {
        Fields::Named(named) => {
            let assignments = named.named.iter().map(|field| {
                let ident = &field.ident;
                let value = draw(&field.ty);
                quote!(#ident: #value)
            });
            quote!(#path { #(#assignments),* })
        }
        Fields::Unnamed(unnamed) => {
            let values = unnamed.unnamed.iter().map(|field| draw(&field.ty));
            quote!(#path(#(#values),*))
        }
        Fields::Unit => path,
    }
}

/// Generate the variant choice for enums.
fn enum_body(input: &DeriveInput, data: &syn::DataEnum) -> Result<TokenStream2, syn::Error> {
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            input,
            "Arbitrary cannot be derived for an enum without variants",
        ));
    }
    let count = data.variants.len();
    let arms = data.variants.iter().enumerate().map(|(index, variant)| {
        let ident = &variant.ident;
        let value = construct(quote!(Self::#ident), &variant.fields);
        if index + 1 == count {
            quote!(_ => #value)
        } else {
            quote!(#index => #value)
        }
    });
    Ok(quote! {
        match crucible::draw_index(stream, #count)? {
            #(#arms),*
        }
    })
}
