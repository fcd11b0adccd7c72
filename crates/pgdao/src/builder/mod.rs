//! Statement builder.
//!
//! Combines resolved [`TableMeta`], binder output and optional caller fragments into
//! [`Statement`]s. Nothing here touches the database, so every shape can be checked as text.
//!
//! ## Conventions
//!
//! - Generated arguments are bound first, fragment arguments follow, left to right.
//! - A fragment is validated (placeholder count vs. arguments) before anything is rendered.
//! - Malformed input is rejected with [`OrmError::Precondition`].

use crate::binder::{self, BoundColumn, FieldPolicy, KeySpec};
use crate::error::{OrmError, OrmResult};
use crate::meta::TableMeta;
use crate::sql::{Fragment, Sql, Statement, strip_leading_keyword};
use crate::value::Param;

/// PostgreSQL wire protocol limit on bound parameters per statement.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// An insert statement plus whether it returns the generated key.
#[derive(Debug)]
pub struct InsertPlan {
    pub statement: Statement,
    /// `true` when the statement ends in `RETURNING <auto key>`.
    pub returns_key: bool,
}

/// Columns to insert for one instance, minus a null auto-generated key.
///
/// Returns the columns and whether the auto key was left for the database to fill.
fn insert_columns(
    meta: &TableMeta,
    params: Vec<Param>,
    policy: FieldPolicy,
) -> OrmResult<(Vec<BoundColumn>, bool)> {
    let mut columns = binder::bind_params(meta, params, policy)?;
    let Some(auto) = meta.auto_key_index() else {
        return Ok((columns, false));
    };
    columns.retain(|c| !(c.index == auto && c.param.is_null()));
    let generated = !columns.iter().any(|c| c.index == auto);
    Ok((columns, generated))
}

fn push_column_list(q: &mut Sql, columns: &[BoundColumn]) {
    q.push(" (");
    for (i, c) in columns.iter().enumerate() {
        if i > 0 {
            q.push(", ");
        }
        q.push(c.column);
    }
    q.push(")");
}

fn push_returning_key(q: &mut Sql, meta: &TableMeta, generated: bool) -> bool {
    match meta.auto_key() {
        Some(auto) if generated => {
            q.push(" RETURNING ").push(auto.name);
            true
        }
        _ => false,
    }
}

/// `INSERT INTO t (c..) VALUES ($1..)`, returning a null auto-generated key.
pub fn insert(meta: &TableMeta, params: Vec<Param>, policy: FieldPolicy) -> OrmResult<InsertPlan> {
    let (columns, generated) = insert_columns(meta, params, policy)?;

    let mut q = Sql::new(format!("INSERT INTO {}", meta.table()));
    if columns.is_empty() {
        q.push(" DEFAULT VALUES");
    } else {
        push_column_list(&mut q, &columns);
        q.push(" VALUES (");
        q.push_param_list(columns.iter().map(|c| &c.param));
        q.push(")");
    }
    let returns_key = push_returning_key(&mut q, meta, generated);

    Ok(InsertPlan {
        statement: q.build(),
        returns_key,
    })
}

/// Strip an optional leading `WHERE` and require a non-empty predicate.
fn predicate_body<'a>(fragment: &'a Fragment, what: &str) -> OrmResult<&'a str> {
    fragment.validate()?;
    let body = strip_leading_keyword(fragment.sql(), "WHERE").unwrap_or(fragment.sql());
    if Fragment::new(body).is_blank() {
        return Err(OrmError::precondition(format!("{what} requires a non-empty predicate")));
    }
    Ok(body)
}

/// `INSERT INTO t (c..) SELECT $1.. WHERE NOT EXISTS (SELECT 1 FROM t WHERE <predicate>)`.
///
/// The guard and the insert run as one statement, but without isolation beyond it: two
/// concurrent callers can both pass the check.
pub fn insert_where_not_exist(
    meta: &TableMeta,
    params: Vec<Param>,
    policy: FieldPolicy,
    predicate: &Fragment,
) -> OrmResult<InsertPlan> {
    let body = predicate_body(predicate, "conditional insert")?;
    let (columns, generated) = insert_columns(meta, params, policy)?;
    if columns.is_empty() {
        return Err(OrmError::precondition(format!(
            "conditional insert into '{}' has no column to write",
            meta.table()
        )));
    }

    let mut q = Sql::new(format!("INSERT INTO {}", meta.table()));
    push_column_list(&mut q, &columns);
    q.push(" SELECT ");
    q.push_param_list(columns.iter().map(|c| &c.param));
    q.push(" WHERE NOT EXISTS (SELECT 1 FROM ")
        .push(meta.table())
        .push(" WHERE ");
    q.push_fragment_text(body.trim_start(), predicate)?;
    q.push(")");
    let returns_key = push_returning_key(&mut q, meta, generated);

    Ok(InsertPlan {
        statement: q.build(),
        returns_key,
    })
}

/// One multi-row `INSERT ... VALUES (..), (..)` writing every declared column.
///
/// A database-generated key is left out when it is null in every row and written when it is
/// set in every row; a mix cannot share one column list.
pub fn batch_insert(meta: &TableMeta, rows: Vec<Vec<Param>>) -> OrmResult<Statement> {
    if rows.is_empty() {
        return Err(OrmError::precondition(format!(
            "batch insert into '{}' needs at least one row",
            meta.table()
        )));
    }

    let width = meta.columns().len();
    if let Some(bad) = rows.iter().position(|r| r.len() != width) {
        return Err(OrmError::precondition(format!(
            "batch insert into '{}': row {} has {} values, expected {}",
            meta.table(),
            bad,
            rows[bad].len(),
            width
        )));
    }

    let skip_auto = match meta.auto_key_index() {
        Some(auto) => {
            let nulls = rows.iter().filter(|r| r[auto].is_null()).count();
            if nulls != 0 && nulls != rows.len() {
                return Err(OrmError::precondition(format!(
                    "batch insert into '{}': generated key '{}' is set in some rows only",
                    meta.table(),
                    meta.columns()[auto].name
                )));
            }
            (nulls == rows.len()).then_some(auto)
        }
        None => None,
    };

    let selected: Vec<usize> = (0..width).filter(|&i| Some(i) != skip_auto).collect();
    let total = selected.len() * rows.len();
    if total > MAX_BIND_PARAMS {
        return Err(OrmError::precondition(format!(
            "batch insert into '{}' needs {} parameters, more than {}",
            meta.table(),
            total,
            MAX_BIND_PARAMS
        )));
    }

    if selected.is_empty() {
        return Err(OrmError::precondition(format!(
            "batch insert into '{}' has no column to write",
            meta.table()
        )));
    }

    let mut q = Sql::new(format!("INSERT INTO {}", meta.table()));
    q.push(" (");
    for (i, &idx) in selected.iter().enumerate() {
        if i > 0 {
            q.push(", ");
        }
        q.push(meta.columns()[idx].name);
    }
    q.push(") VALUES ");
    for (r, row) in rows.iter().enumerate() {
        if r > 0 {
            q.push(", ");
        }
        q.push("(");
        q.push_param_list(selected.iter().map(|&i| &row[i]));
        q.push(")");
    }
    Ok(q.build())
}

fn push_key_predicate(q: &mut Sql, key: &KeySpec) {
    for (i, c) in key.columns().iter().enumerate() {
        if i > 0 {
            q.push(" AND ");
        }
        q.push(c.column).push(" = ");
        q.push_param(c.param.clone());
    }
}

/// `UPDATE t SET c = $1.. WHERE k = $n..[ AND (<suffix>)]`.
///
/// Key columns locate the row and are never part of the SET list. A suffix starting with
/// `WHERE` or `AND` has that keyword dropped, the rest is parenthesised and must not be empty.
pub fn update(
    meta: &TableMeta,
    params: Vec<Param>,
    policy: FieldPolicy,
    suffix: Option<&Fragment>,
) -> OrmResult<Statement> {
    let key = binder::key_from_params(meta, params.clone())?;

    let set: Vec<BoundColumn> = binder::bind_params(meta, params, policy)?
        .into_iter()
        .filter(|c| !meta.columns()[c.index].key)
        .collect();
    if set.is_empty() {
        return Err(OrmError::precondition(format!(
            "update of '{}' has no column to set",
            meta.table()
        )));
    }

    let mut q = Sql::new(format!("UPDATE {} SET ", meta.table()));
    for (i, c) in set.iter().enumerate() {
        if i > 0 {
            q.push(", ");
        }
        q.push(c.column).push(" = ");
        q.push_param(c.param.clone());
    }
    q.push(" WHERE ");
    push_key_predicate(&mut q, &key);

    if let Some(suffix) = suffix {
        suffix.validate()?;
        let body = strip_leading_keyword(suffix.sql(), "WHERE")
            .or_else(|| strip_leading_keyword(suffix.sql(), "AND"))
            .unwrap_or(suffix.sql());
        if Fragment::new(body).is_blank() {
            return Err(OrmError::precondition(format!(
                "update of '{}' has an empty condition",
                meta.table()
            )));
        }
        q.push(" AND (");
        q.push_fragment_text(body.trim(), suffix)?;
        q.push(")");
    }
    Ok(q.build())
}

/// `DELETE FROM t WHERE k = $1..`.
pub fn delete_by_key(meta: &TableMeta, key: &KeySpec) -> Statement {
    let mut q = Sql::new(format!("DELETE FROM {} WHERE ", meta.table()));
    push_key_predicate(&mut q, key);
    q.build()
}

/// `DELETE FROM t WHERE ...`; the fragment must start with `WHERE` and carry a condition.
pub fn delete_where(meta: &TableMeta, predicate: &Fragment) -> OrmResult<Statement> {
    predicate.validate()?;
    let Some(body) = strip_leading_keyword(predicate.sql(), "WHERE") else {
        return Err(OrmError::precondition(format!(
            "delete from '{}' requires a WHERE clause",
            meta.table()
        )));
    };
    if Fragment::new(body).is_blank() {
        return Err(OrmError::precondition(format!(
            "delete from '{}' has an empty WHERE clause",
            meta.table()
        )));
    }

    let mut q = Sql::new(format!("DELETE FROM {} WHERE ", meta.table()));
    q.push_fragment_text(body.trim_start(), predicate)?;
    Ok(q.build())
}

fn select_prefix(meta: &TableMeta) -> Sql {
    Sql::new(format!("SELECT {} FROM {}", meta.select_list(), meta.table()))
}

fn push_suffix(q: &mut Sql, suffix: Option<&Fragment>) -> OrmResult<()> {
    if let Some(suffix) = suffix {
        suffix.validate()?;
        if !suffix.is_blank() {
            q.push(" ");
            q.push_fragment_text(suffix.sql().trim(), suffix)?;
        }
    }
    Ok(())
}

fn has_suffix(suffix: Option<&Fragment>) -> bool {
    suffix.is_some_and(|s| !s.is_blank())
}

/// `SELECT cols FROM t[ suffix]`.
pub fn select(meta: &TableMeta, suffix: Option<&Fragment>) -> OrmResult<Statement> {
    let mut q = select_prefix(meta);
    push_suffix(&mut q, suffix)?;
    Ok(q.build())
}

/// `SELECT cols FROM t[ suffix] LIMIT 1`.
pub fn select_one(meta: &TableMeta, suffix: Option<&Fragment>) -> OrmResult<Statement> {
    let mut q = select_prefix(meta);
    push_suffix(&mut q, suffix)?;
    q.push(" LIMIT 1");
    Ok(q.build())
}

/// `SELECT cols FROM t WHERE k = $1 AND ..`.
pub fn select_by_key(meta: &TableMeta, key: &KeySpec) -> Statement {
    let mut q = select_prefix(meta);
    q.push(" WHERE ");
    push_key_predicate(&mut q, key);
    q.build()
}

/// `SELECT cols FROM t WHERE k IN ($1..$n)`; single-key entities only.
pub fn select_by_key_list(meta: &TableMeta, keys: &[Param]) -> OrmResult<Statement> {
    let (_, column) = meta.single_key()?;
    if keys.is_empty() {
        return Err(OrmError::precondition(format!(
            "key list lookup on '{}' needs at least one key",
            meta.table()
        )));
    }
    if keys.len() > MAX_BIND_PARAMS {
        return Err(OrmError::precondition(format!(
            "key list lookup on '{}' has {} keys, more than {}",
            meta.table(),
            keys.len(),
            MAX_BIND_PARAMS
        )));
    }
    if keys.iter().any(Param::is_null) {
        return Err(OrmError::null_key(format!(
            "key list for '{}.{}' contains a null value",
            meta.table(),
            column.name
        )));
    }

    let mut q = select_prefix(meta);
    q.push(" WHERE ").push(column.name).push(" IN (");
    q.push_param_list(keys);
    q.push(")");
    Ok(q.build())
}

/// `SELECT COUNT(*) FROM t`, or a count over the suffix-filtered rows.
///
/// With a suffix the filtered select is wrapped, so a shared `ORDER BY` stays valid.
pub fn count(meta: &TableMeta, suffix: Option<&Fragment>) -> OrmResult<Statement> {
    if !has_suffix(suffix) {
        if let Some(s) = suffix {
            s.validate()?;
        }
        return Ok(Sql::new(format!("SELECT COUNT(*) FROM {}", meta.table())).build());
    }
    let mut q = Sql::new(format!("SELECT COUNT(*) FROM (SELECT 1 FROM {}", meta.table()));
    push_suffix(&mut q, suffix)?;
    q.push(") AS pgdao_count");
    Ok(q.build())
}

/// `SELECT cols FROM t[ suffix] LIMIT $a OFFSET $b`; `page` is 1-based.
pub fn page(
    meta: &TableMeta,
    suffix: Option<&Fragment>,
    page: u32,
    page_size: u32,
) -> OrmResult<Statement> {
    if page < 1 {
        return Err(OrmError::precondition(format!(
            "page index must be at least 1, got {page}"
        )));
    }
    if page_size < 1 {
        return Err(OrmError::precondition("page size must be at least 1"));
    }
    let limit = i64::from(page_size);
    let offset = i64::from(page - 1) * limit;

    let mut q = select_prefix(meta);
    push_suffix(&mut q, suffix)?;
    q.push(" LIMIT ");
    q.push_bind(limit);
    q.push(" OFFSET ");
    q.push_bind(offset);
    Ok(q.build())
}

#[cfg(test)]
mod tests;
