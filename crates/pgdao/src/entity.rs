//! The per-type capability interface implemented by every mapped entity.

use crate::error::OrmResult;
use crate::meta::{EntityDescriptor, MetaCell, TableMeta};
use crate::row::FromRow;
use crate::value::Param;
use tokio_postgres::Row;

/// A struct mapped to one table.
///
/// Usually derived:
///
/// ```ignore
/// use pgdao::Entity;
///
/// #[derive(Debug, Entity)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(id, auto_increment)]
///     id: Option<i64>,
///     name: Option<String>,
///     age: Option<i32>,
/// }
/// ```
///
/// The derive also implements [`FromRow`] using the declared column names.
pub trait Entity: FromRow + Send + Sync {
    /// Static table/column declaration for this type.
    fn describe() -> EntityDescriptor;

    /// The type's own metadata cell.
    fn meta_cell() -> &'static MetaCell;

    /// Resolved metadata, built once on first use.
    fn table_meta() -> OrmResult<&'static TableMeta> {
        Self::meta_cell().resolve(Self::describe)
    }

    /// Current field values, one per declared column and in declaration order.
    fn params(&self) -> Vec<Param>;

    /// Store the database-generated key returned by an insert.
    ///
    /// `row` holds a single column: the auto-increment key.
    fn set_generated_key(&mut self, row: &Row) -> OrmResult<()> {
        let _ = row;
        Ok(())
    }
}
