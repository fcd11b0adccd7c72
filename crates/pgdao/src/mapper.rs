//! Result mapper: rows into entities, scalars, generic maps and keyed lookups.

use crate::error::{OrmError, OrmResult};
use crate::row::FromRow;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::hash::Hash;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

/// Map every row through [`FromRow`].
pub fn map_rows<T: FromRow>(rows: &[Row]) -> OrmResult<Vec<T>> {
    rows.iter().map(T::from_row).collect()
}

/// Read the first column of a row.
pub fn scalar<T>(row: &Row) -> OrmResult<T>
where
    T: for<'a> FromSql<'a>,
{
    let column = row
        .columns()
        .first()
        .map(|c| c.name().to_string())
        .ok_or_else(|| OrmError::decode("<none>", "row has no columns"))?;
    row.try_get(0).map_err(|e| OrmError::decode(column, e.to_string()))
}

/// A row as column-ordered `(name, value)` pairs.
///
/// Serializes as a JSON object with keys in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowMap {
    entries: Vec<(String, Value)>,
}

impl RowMap {
    /// Decode every column of a row.
    pub fn from_row(row: &Row) -> OrmResult<Self> {
        let entries = row
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let value = decode_value(row, idx, column.type_())
                    .map_err(|message| OrmError::decode(column.name(), message))?;
                Ok((column.name().to_string(), value))
            })
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Value of the first column with this name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, Value)> {
        self.entries
    }
}

impl From<Vec<(String, Value)>> for RowMap {
    fn from(entries: Vec<(String, Value)>) -> Self {
        Self { entries }
    }
}

impl Serialize for RowMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

fn get_opt<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> Result<Option<T>, String> {
    row.try_get::<_, Option<T>>(idx).map_err(|e| e.to_string())
}

fn decode_value(row: &Row, idx: usize, ty: &Type) -> Result<Value, String> {
    let value = match *ty {
        Type::BOOL => get_opt::<bool>(row, idx)?.map(Value::from),
        Type::INT2 => get_opt::<i16>(row, idx)?.map(Value::from),
        Type::INT4 => get_opt::<i32>(row, idx)?.map(Value::from),
        Type::INT8 => get_opt::<i64>(row, idx)?.map(Value::from),
        Type::FLOAT4 => get_opt::<f32>(row, idx)?.map(Value::from),
        Type::FLOAT8 => get_opt::<f64>(row, idx)?.map(Value::from),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            get_opt::<String>(row, idx)?.map(Value::from)
        }
        Type::JSON | Type::JSONB => get_opt::<Value>(row, idx)?,
        Type::UUID => get_opt::<uuid::Uuid>(row, idx)?.map(|u| Value::from(u.to_string())),
        Type::DATE => get_opt::<chrono::NaiveDate>(row, idx)?.map(|d| Value::from(d.to_string())),
        Type::TIME => get_opt::<chrono::NaiveTime>(row, idx)?.map(|t| Value::from(t.to_string())),
        Type::TIMESTAMP => get_opt::<chrono::NaiveDateTime>(row, idx)?
            .map(|t| Value::from(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        Type::TIMESTAMPTZ => get_opt::<chrono::DateTime<chrono::Utc>>(row, idx)?
            .map(|t| Value::from(t.to_rfc3339())),
        _ => return Err(format!("unsupported column type '{ty}'")),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Rows addressed by key, in the order the caller asked for them.
///
/// Keys without a matching row are absent; duplicate request keys appear once, at their
/// first position.
#[derive(Debug, Clone)]
pub struct KeyedRows<K, E> {
    entries: Vec<(K, E)>,
}

impl<K, E> KeyedRows<K, E>
where
    K: Eq + Hash + Clone,
{
    /// Order `found` by `requested`, dropping keys that matched nothing.
    pub fn arrange(requested: &[K], found: Vec<(K, E)>) -> Self {
        let mut by_key: HashMap<K, E> = found.into_iter().collect();
        let entries = requested
            .iter()
            .filter_map(|k| by_key.remove_entry(k))
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: &K) -> Option<&E> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

impl<K, E> KeyedRows<K, E> {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &E)> {
        self.entries.iter().map(|(k, e)| (k, e))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &E> {
        self.entries.iter().map(|(_, e)| e)
    }
}

impl<K, E> IntoIterator for KeyedRows<K, E> {
    type Item = (K, E);
    type IntoIter = std::vec::IntoIter<(K, E)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keyed_rows_follow_request_order_and_omit_missing() {
        let found = vec![(3_i64, "c"), (1, "a")];
        let rows = KeyedRows::arrange(&[1, 2, 3], found);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(rows.get(&3), Some(&"c"));
        assert!(!rows.contains_key(&2));
    }

    #[test]
    fn keyed_rows_report_duplicates_once() {
        let rows = KeyedRows::arrange(&[2, 1, 2], vec![(1_i64, "a"), (2, "b")]);
        assert_eq!(
            rows.into_iter().collect::<Vec<_>>(),
            vec![(2, "b"), (1, "a")]
        );
    }

    #[test]
    fn row_map_serializes_in_column_order() {
        let map = RowMap::from(vec![
            ("zeta".to_string(), json!(1)),
            ("alpha".to_string(), Value::Null),
        ]);
        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            r#"{"zeta":1,"alpha":null}"#
        );
        assert_eq!(map.get("alpha"), Some(&Value::Null));
        assert_eq!(map.columns().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }
}
