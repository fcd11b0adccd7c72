//! Parameter binder: turns an entity instance into ordered column/value pairs.
//!
//! The same instance drives several statement shapes (insert, insert-with-null, update,
//! update-with-null, key lookups); only the [`FieldPolicy`] differs.

use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::meta::TableMeta;
use crate::value::{KeyMap, Param};

/// Which columns of an instance take part in a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Every mapped column, `NULL`s included.
    AllFields,
    /// Only columns whose current value is not `NULL`.
    NonNullFields,
    /// Only key columns; every one of them must be non-null.
    KeysOnly,
}

/// One column selected by the binder.
#[derive(Debug, Clone)]
pub struct BoundColumn {
    /// Position within [`TableMeta::columns`].
    pub index: usize,
    pub column: &'static str,
    pub param: Param,
}

/// A complete, non-null set of key values identifying one row.
#[derive(Debug, Clone)]
pub struct KeySpec {
    columns: Vec<BoundColumn>,
}

impl KeySpec {
    pub fn columns(&self) -> &[BoundColumn] {
        &self.columns
    }
}

/// Read all of an instance's parameters, checking them against the metadata.
pub fn entity_params<E: Entity>(meta: &TableMeta, entity: &E) -> OrmResult<Vec<Param>> {
    let params = entity.params();
    if params.len() != meta.columns().len() {
        return Err(OrmError::config(format!(
            "table '{}': entity produced {} values for {} columns",
            meta.table(),
            params.len(),
            meta.columns().len()
        )));
    }
    Ok(params)
}

/// Bind an instance under the given policy.
pub fn bind<E: Entity>(
    meta: &TableMeta,
    entity: &E,
    policy: FieldPolicy,
) -> OrmResult<Vec<BoundColumn>> {
    let params = entity_params(meta, entity)?;
    bind_params(meta, params, policy)
}

/// Bind already extracted parameters under the given policy.
pub fn bind_params(
    meta: &TableMeta,
    params: Vec<Param>,
    policy: FieldPolicy,
) -> OrmResult<Vec<BoundColumn>> {
    if policy == FieldPolicy::KeysOnly {
        meta.require_keys()?;
    }

    let mut bound = Vec::with_capacity(params.len());
    for ((index, column), param) in meta.columns().iter().enumerate().zip(params) {
        let keep = match policy {
            FieldPolicy::AllFields => true,
            FieldPolicy::NonNullFields => !param.is_null(),
            FieldPolicy::KeysOnly => {
                if !column.key {
                    false
                } else if param.is_null() {
                    return Err(OrmError::null_key(format!(
                        "key column '{}.{}' (field '{}') is null",
                        meta.table(),
                        column.name,
                        column.field
                    )));
                } else {
                    true
                }
            }
        };
        if keep {
            bound.push(BoundColumn {
                index,
                column: column.name,
                param,
            });
        }
    }
    Ok(bound)
}

/// Resolve the key of an instance.
pub fn key_of<E: Entity>(meta: &TableMeta, entity: &E) -> OrmResult<KeySpec> {
    key_from_params(meta, entity_params(meta, entity)?)
}

/// Resolve the key from already extracted parameters.
pub fn key_from_params(meta: &TableMeta, params: Vec<Param>) -> OrmResult<KeySpec> {
    Ok(KeySpec {
        columns: bind_params(meta, params, FieldPolicy::KeysOnly)?,
    })
}

/// Resolve a single scalar key value; only valid for single-key entities.
pub fn scalar_key(meta: &TableMeta, value: Param) -> OrmResult<KeySpec> {
    let (index, column) = meta.single_key()?;
    if value.is_null() {
        return Err(OrmError::null_key(format!(
            "key value for '{}.{}' is null",
            meta.table(),
            column.name
        )));
    }
    Ok(KeySpec {
        columns: vec![BoundColumn {
            index,
            column: column.name,
            param: value,
        }],
    })
}

/// Resolve an explicit key-name → value mapping.
pub fn mapped_key(meta: &TableMeta, keys: &KeyMap) -> OrmResult<KeySpec> {
    meta.require_keys()?;

    if let Some(unknown) = keys
        .names()
        .find(|name| meta.column(name).is_none_or(|(_, c)| !c.key))
    {
        return Err(OrmError::precondition(format!(
            "'{unknown}' is not a key column of table '{}'",
            meta.table()
        )));
    }

    let mut columns = Vec::with_capacity(meta.key_indices().len());
    for &index in meta.key_indices() {
        let column = &meta.columns()[index];
        let param = keys
            .get(column.name)
            .filter(|p| !p.is_null())
            .ok_or_else(|| {
                OrmError::null_key(format!(
                    "missing or null value for key column '{}.{}'",
                    meta.table(),
                    column.name
                ))
            })?;
        columns.push(BoundColumn {
            index,
            column: column.name,
            param: param.clone(),
        });
    }
    Ok(KeySpec { columns })
}
