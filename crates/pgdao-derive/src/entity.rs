//! Entity derive macro implementation

use crate::attrs::{field_attr, field_ident, named_fields, table_name};
use crate::from_row::from_row_body;
use crate::syn_types::option_inner;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let table = table_name(&input)?;
    let fields = named_fields(&input, "Entity")?;
    if fields.is_empty() {
        return Err(syn::Error::new_spanned(
            &input,
            "Entity requires at least one field",
        ));
    }

    let mut column_defs = Vec::new();
    let mut params = Vec::new();
    let mut generated_key = None;

    for field in fields {
        let ident = field_ident(field)?;
        let attr = field_attr(field)?;
        let column = attr.column.clone().unwrap_or_else(|| ident.to_string());
        let field_name = ident.to_string();
        let inner = option_inner(&field.ty);

        let mut def = quote! { pgdao::ColumnDef::new(#column).field(#field_name) };
        if attr.auto_increment {
            let Some(inner) = inner else {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    "#[orm(auto_increment)] requires an Option<_> field",
                ));
            };
            if generated_key.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "only one field can be #[orm(auto_increment)]",
                ));
            }
            def = quote! { #def.auto_increment() };
            generated_key = Some(quote! {
                fn set_generated_key(&mut self, row: &pgdao::Row) -> pgdao::OrmResult<()> {
                    use pgdao::RowExt;
                    self.#ident = Some(row.try_get_column::<#inner>(#column)?);
                    Ok(())
                }
            });
        } else if attr.key {
            def = quote! { #def.key() };
        }
        if inner.is_some() && !attr.auto_increment {
            def = quote! { #def.nullable() };
        }
        column_defs.push(def);

        params.push(if inner.is_some() {
            quote! { pgdao::Param::from_option(::core::clone::Clone::clone(&self.#ident)) }
        } else {
            quote! { pgdao::Param::new(::core::clone::Clone::clone(&self.#ident)) }
        });
    }

    let from_row = from_row_body(fields)?;

    Ok(quote! {
        impl pgdao::Entity for #name {
            fn describe() -> pgdao::EntityDescriptor {
                const COLUMNS: &[pgdao::ColumnDef] = &[#(#column_defs),*];
                pgdao::EntityDescriptor {
                    table: #table,
                    columns: COLUMNS,
                }
            }

            fn meta_cell() -> &'static pgdao::MetaCell {
                static CELL: pgdao::MetaCell = pgdao::MetaCell::new();
                &CELL
            }

            fn params(&self) -> ::std::vec::Vec<pgdao::Param> {
                ::std::vec![#(#params),*]
            }

            #generated_key
        }

        impl pgdao::FromRow for #name {
            fn from_row(row: &pgdao::Row) -> pgdao::OrmResult<Self> {
                #from_row
            }
        }
    })
}
