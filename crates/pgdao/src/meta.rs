//! Entity metadata registry.
//!
//! Each entity type statically declares an [`EntityDescriptor`]. The first time the type is
//! used, the descriptor is validated and turned into an immutable [`TableMeta`] that lives in
//! the type's own [`MetaCell`]. Later lookups are a single atomic load; a configuration error
//! is cached the same way and reported on every use.

use crate::error::{OrmError, OrmResult};
use crate::sql::is_valid_ident;
use std::sync::OnceLock;

/// Static declaration of one mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Database column name.
    pub column: &'static str,
    /// Rust field name the column maps to.
    pub field: &'static str,
    /// Whether the column is part of the row key.
    pub key: bool,
    /// Whether the database generates the value on insert.
    pub auto_increment: bool,
    /// Whether the field can hold `NULL`.
    pub nullable: bool,
}

impl ColumnDef {
    /// A plain non-key column whose field has the same name.
    pub const fn new(column: &'static str) -> Self {
        Self {
            column,
            field: column,
            key: false,
            auto_increment: false,
            nullable: false,
        }
    }

    pub const fn field(mut self, field: &'static str) -> Self {
        self.field = field;
        self
    }

    pub const fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// Database-generated key (implies `key` and `nullable`).
    pub const fn auto_increment(mut self) -> Self {
        self.key = true;
        self.auto_increment = true;
        self.nullable = true;
        self
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Static declaration of an entity's table mapping.
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    /// Table name, optionally schema-qualified (`schema.table`).
    pub table: &'static str,
    /// Mapped columns in declaration order.
    pub columns: &'static [ColumnDef],
}

/// Resolved metadata of one mapped column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: &'static str,
    pub field: &'static str,
    pub nullable: bool,
    pub key: bool,
    pub auto_increment: bool,
}

/// Validated, immutable table metadata shared by all callers.
#[derive(Debug)]
pub struct TableMeta {
    table: &'static str,
    columns: Vec<ColumnMeta>,
    key_indices: Vec<usize>,
    auto_key: Option<usize>,
    select_list: String,
}

impl TableMeta {
    /// Validate a descriptor and build its metadata.
    pub fn build(descriptor: &EntityDescriptor) -> OrmResult<Self> {
        let table = descriptor.table;
        if table.is_empty() {
            return Err(OrmError::config("entity declares no table name"));
        }
        if !table.split('.').all(is_valid_ident) {
            return Err(OrmError::config(format!("invalid table name '{table}'")));
        }
        if descriptor.columns.is_empty() {
            return Err(OrmError::config(format!("table '{table}' declares no columns")));
        }

        let mut columns: Vec<ColumnMeta> = Vec::with_capacity(descriptor.columns.len());
        let mut key_indices = Vec::new();
        let mut auto_key = None;

        for (idx, def) in descriptor.columns.iter().enumerate() {
            if !is_valid_ident(def.column) {
                return Err(OrmError::config(format!(
                    "table '{table}': invalid column name '{}'",
                    def.column
                )));
            }
            if columns.iter().any(|c| c.name == def.column) {
                return Err(OrmError::config(format!(
                    "table '{table}': column '{}' is declared twice",
                    def.column
                )));
            }
            if def.auto_increment {
                if !def.key {
                    return Err(OrmError::config(format!(
                        "table '{table}': auto-increment column '{}' must be a key",
                        def.column
                    )));
                }
                if auto_key.is_some() {
                    return Err(OrmError::config(format!(
                        "table '{table}': more than one auto-increment column"
                    )));
                }
                auto_key = Some(idx);
            }
            if def.key {
                key_indices.push(idx);
            }
            columns.push(ColumnMeta {
                name: def.column,
                field: def.field,
                nullable: def.nullable || def.auto_increment,
                key: def.key,
                auto_increment: def.auto_increment,
            });
        }

        let select_list = columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Self {
            table,
            columns,
            key_indices,
            auto_key,
            select_list,
        })
    }

    /// Table name as written in SQL.
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// All mapped columns in declaration order.
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Comma-separated column list for SELECT.
    pub fn select_list(&self) -> &str {
        &self.select_list
    }

    /// Positions of the key columns within [`TableMeta::columns`].
    pub fn key_indices(&self) -> &[usize] {
        &self.key_indices
    }

    /// The key columns in declaration order.
    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.key_indices.iter().map(|&i| &self.columns[i])
    }

    pub fn has_keys(&self) -> bool {
        !self.key_indices.is_empty()
    }

    /// Position of the database-generated key, if any.
    pub fn auto_key_index(&self) -> Option<usize> {
        self.auto_key
    }

    /// The database-generated key column, if any.
    pub fn auto_key(&self) -> Option<&ColumnMeta> {
        self.auto_key.map(|i| &self.columns[i])
    }

    /// Look up a column by its database name.
    pub fn column(&self, name: &str) -> Option<(usize, &ColumnMeta)> {
        self.columns.iter().enumerate().find(|(_, c)| c.name == name)
    }

    /// Key positions, failing when the entity declares no key at all.
    pub fn require_keys(&self) -> OrmResult<&[usize]> {
        if self.key_indices.is_empty() {
            return Err(OrmError::null_key(format!(
                "table '{}' declares no key column",
                self.table
            )));
        }
        Ok(&self.key_indices)
    }

    /// The single key column, failing for keyless and composite-key entities.
    pub fn single_key(&self) -> OrmResult<(usize, &ColumnMeta)> {
        match self.require_keys()? {
            [idx] => Ok((*idx, &self.columns[*idx])),
            keys => Err(OrmError::null_key(format!(
                "table '{}' has {} key columns; a single key value cannot address a row",
                self.table,
                keys.len()
            ))),
        }
    }
}

/// Per-type, build-once holder for [`TableMeta`].
///
/// ```ignore
/// fn meta_cell() -> &'static pgdao::MetaCell {
///     static CELL: pgdao::MetaCell = pgdao::MetaCell::new();
///     &CELL
/// }
/// ```
pub struct MetaCell {
    cell: OnceLock<Result<TableMeta, String>>,
}

impl MetaCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Resolve the metadata, building it from `describe` on first use.
    ///
    /// Concurrent first callers race to build; exactly one result is published and every
    /// caller observes it.
    pub fn resolve(
        &'static self,
        describe: impl FnOnce() -> EntityDescriptor,
    ) -> OrmResult<&'static TableMeta> {
        let built = self.cell.get_or_init(|| {
            let descriptor = describe();
            match TableMeta::build(&descriptor) {
                Ok(meta) => {
                    tracing::debug!(
                        table = meta.table(),
                        columns = meta.columns().len(),
                        keys = meta.key_indices().len(),
                        "resolved entity metadata"
                    );
                    Ok(meta)
                }
                Err(e) => {
                    tracing::error!(table = descriptor.table, error = %e, "invalid entity metadata");
                    Err(e.to_string())
                }
            }
        });
        built.as_ref().map_err(|msg| OrmError::Config(msg.clone()))
    }

    /// Whether resolution has already happened.
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl Default for MetaCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_COLUMNS: &[ColumnDef] = &[
        ColumnDef::new("id").auto_increment(),
        ColumnDef::new("name").nullable(),
        ColumnDef::new("age").nullable(),
    ];

    fn users() -> EntityDescriptor {
        EntityDescriptor {
            table: "users",
            columns: USER_COLUMNS,
        }
    }

    #[test]
    fn builds_select_list_and_keys() {
        let meta = TableMeta::build(&users()).unwrap();
        assert_eq!(meta.table(), "users");
        assert_eq!(meta.select_list(), "id, name, age");
        assert_eq!(meta.key_indices(), &[0]);
        assert_eq!(meta.auto_key().map(|c| c.name), Some("id"));
        assert_eq!(meta.single_key().unwrap().1.name, "id");
    }

    #[test]
    fn composite_key_rejects_single_key_lookup() {
        const COLS: &[ColumnDef] = &[
            ColumnDef::new("tenant_id").key(),
            ColumnDef::new("user_id").key(),
            ColumnDef::new("role"),
        ];
        let meta = TableMeta::build(&EntityDescriptor {
            table: "memberships",
            columns: COLS,
        })
        .unwrap();
        assert_eq!(meta.require_keys().unwrap(), &[0, 1]);
        assert!(meta.single_key().unwrap_err().is_null_key_value());
    }

    #[test]
    fn keyless_entity_fails_key_operations() {
        const COLS: &[ColumnDef] = &[ColumnDef::new("message")];
        let meta = TableMeta::build(&EntityDescriptor {
            table: "audit_log",
            columns: COLS,
        })
        .unwrap();
        assert!(!meta.has_keys());
        assert!(meta.require_keys().unwrap_err().is_null_key_value());
    }

    #[test]
    fn rejects_invalid_descriptors() {
        const DUP: &[ColumnDef] = &[ColumnDef::new("a"), ColumnDef::new("a")];
        const BAD_NAME: &[ColumnDef] = &[ColumnDef::new("a; drop table x")];
        const AUTO_NOT_KEY: &[ColumnDef] = &[ColumnDef {
            column: "id",
            field: "id",
            key: false,
            auto_increment: true,
            nullable: true,
        }];
        const TWO_AUTO: &[ColumnDef] = &[
            ColumnDef::new("a").auto_increment(),
            ColumnDef::new("b").auto_increment(),
        ];

        for (table, columns) in [
            ("t", DUP),
            ("t", BAD_NAME),
            ("t", AUTO_NOT_KEY),
            ("t", TWO_AUTO),
            ("t", &[][..]),
            ("", USER_COLUMNS),
            ("1t", USER_COLUMNS),
        ] {
            let err = TableMeta::build(&EntityDescriptor { table, columns }).unwrap_err();
            assert!(err.is_config(), "expected config error for {table:?}: {err}");
        }
    }

    #[test]
    fn accepts_schema_qualified_table() {
        let meta = TableMeta::build(&EntityDescriptor {
            table: "app.users",
            columns: USER_COLUMNS,
        })
        .unwrap();
        assert_eq!(meta.table(), "app.users");
    }

    #[test]
    fn cell_builds_once_and_caches_errors() {
        static GOOD: MetaCell = MetaCell::new();
        static BAD: MetaCell = MetaCell::new();

        assert!(!GOOD.is_resolved());
        let first = GOOD.resolve(users).unwrap();
        let second = GOOD.resolve(|| unreachable!("descriptor is only read once")).unwrap();
        assert!(std::ptr::eq(first, second));

        let bad = || EntityDescriptor {
            table: "",
            columns: USER_COLUMNS,
        };
        assert!(BAD.resolve(bad).unwrap_err().is_config());
        assert!(BAD.resolve(users).unwrap_err().is_config());
    }

    #[test]
    fn concurrent_first_resolution_publishes_one_value() {
        static CELL: MetaCell = MetaCell::new();
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| CELL.resolve(users).unwrap() as *const TableMeta as usize))
            .collect();
        let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addrs.windows(2).all(|w| w[0] == w[1]));
    }
}
