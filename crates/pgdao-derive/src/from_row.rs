//! FromRow derive macro implementation

use crate::attrs::{column_name, field_ident, named_fields};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let fields = named_fields(&input, "FromRow")?;
    let body = from_row_body(fields)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics pgdao::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &pgdao::Row) -> pgdao::OrmResult<Self> {
                #body
            }
        }
    })
}

/// `Ok(Self { field: row.try_get_column("column")?, .. })`
pub(crate) fn from_row_body<'a>(
    fields: impl IntoIterator<Item = &'a syn::Field>,
) -> Result<TokenStream> {
    let extracts = fields
        .into_iter()
        .map(|field| {
            let ident = field_ident(field)?;
            let column = column_name(field)?;
            Ok(quote! { #ident: row.try_get_column(#column)? })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(quote! {
        use pgdao::RowExt;
        Ok(Self {
            #(#extracts),*
        })
    })
}
