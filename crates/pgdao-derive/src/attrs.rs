//! Parsing of `#[orm(...)]` attributes.

use syn::{Data, DeriveInput, Fields, Result};

/// Options of one field.
#[derive(Default)]
pub(crate) struct FieldAttr {
    pub key: bool,
    pub auto_increment: bool,
    pub column: Option<String>,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "id" || ident == "key" {
                attr.key = true;
            } else if ident == "auto_increment" {
                attr.key = true;
                attr.auto_increment = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                attr.column = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    format!("unknown orm field attribute `{ident}`"),
                ));
            }

            if input.is_empty() {
                break;
            }
            let _: syn::Token![,] = input.parse()?;
        }
        Ok(attr)
    }
}

/// Merge every `#[orm(...)]` on a field.
pub(crate) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let parsed: FieldAttr = attr.parse_args()?;
        merged.key |= parsed.key;
        merged.auto_increment |= parsed.auto_increment;
        if parsed.column.is_some() {
            merged.column = parsed.column;
        }
    }
    Ok(merged)
}

/// Column name of a field: `#[orm(column = "...")]` or the field name.
pub(crate) fn column_name(field: &syn::Field) -> Result<String> {
    let attr = field_attr(field)?;
    Ok(match attr.column {
        Some(column) => column,
        None => field_ident(field)?.to_string(),
    })
}

pub(crate) fn field_ident(field: &syn::Field) -> Result<&syn::Ident> {
    field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))
}

/// Extract table name from struct-level `#[orm(table = "...")]` attribute.
pub(crate) fn table_name(input: &DeriveInput) -> Result<String> {
    for attr in &input.attrs {
        if attr.path().is_ident("orm") {
            let nested = attr.parse_args::<syn::MetaNameValue>()?;
            if nested.path.is_ident("table") {
                if let syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(lit),
                    ..
                }) = &nested.value
                {
                    return Ok(lit.value());
                }
            }
            return Err(syn::Error::new_spanned(
                attr,
                "expected #[orm(table = \"table_name\")]",
            ));
        }
    }
    Err(syn::Error::new_spanned(
        input,
        "Entity requires #[orm(table = \"table_name\")] attribute",
    ))
}

/// Named fields of a struct.
pub(crate) fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> Result<&'a syn::punctuated::Punctuated<syn::Field, syn::Token![,]>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{derive} can only be derived for structs"),
        )),
    }
}
