//! Derive macros for pgdao
//!
//! Provides `#[derive(Entity)]` and `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod entity;
mod from_row;
mod syn_types;

/// Derive `FromRow` trait for a struct.
///
/// # Example
///
/// ```ignore
/// use pgdao::FromRow;
///
/// #[derive(FromRow)]
/// struct UserName {
///     id: i64,
///     #[orm(column = "user_name")]
///     name: Option<String>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Map field to a different column name
#[proc_macro_derive(FromRow, attributes(orm))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `Entity` (and `FromRow`) for a struct mapped to one table.
///
/// # Example
///
/// ```ignore
/// use pgdao::Entity;
///
/// #[derive(Entity)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(id, auto_increment)]
///     id: Option<i64>,
///     name: Option<String>,
///     #[orm(column = "age_years")]
///     age: Option<i32>,
/// }
/// ```
///
/// # Generated
///
/// - `Entity::describe()` - table name and ordered column declarations
/// - `Entity::meta_cell()` - a per-type metadata cell
/// - `Entity::params()` - one bound value per field, `Option::None` binding `NULL`
/// - `Entity::set_generated_key()` - when a field is `auto_increment`
/// - `FromRow` - by column name
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name, optionally schema-qualified (required)
/// - `#[orm(key)]` / `#[orm(id)]` - Field is (part of) the row key
/// - `#[orm(auto_increment)]` - Key generated by the database; the field must be an `Option`
/// - `#[orm(column = "name")]` - Map field to a different column name
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
