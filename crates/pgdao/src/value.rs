//! Bound parameter values and explicit key mappings.

use bytes::BytesMut;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

/// A single bound value, shared cheaply between statements.
///
/// Besides the value itself a `Param` records whether it is SQL `NULL`, which is what the
/// binder uses to decide which columns a "non-null only" insert or update writes.
#[derive(Clone)]
pub struct Param {
    value: Arc<dyn ToSql + Sync + Send>,
    null: bool,
}

impl Param {
    /// Wrap a non-null value.
    pub fn new<T>(value: T) -> Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        Self {
            value: Arc::new(value),
            null: false,
        }
    }

    /// Wrap an optional value; `None` binds as `NULL`.
    pub fn from_option<T>(value: Option<T>) -> Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        let null = value.is_none();
        Self {
            value: Arc::new(value),
            null,
        }
    }

    /// A `NULL` accepted by a parameter of any type.
    pub fn null() -> Self {
        Self {
            value: Arc::new(UntypedNull),
            null: true,
        }
    }

    /// Whether this parameter binds as `NULL`.
    pub fn is_null(&self) -> bool {
        self.null
    }

    /// Borrow as a driver parameter.
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        self.value.as_ref()
    }
}

#[derive(Debug)]
struct UntypedNull;

impl ToSql for UntypedNull {
    fn to_sql(&self, _: &Type, _: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        Ok(IsNull::Yes)
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

macro_rules! impl_param_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Param {
                fn from(value: $ty) -> Self {
                    Param::new(value)
                }
            }

            impl From<Option<$ty>> for Param {
                fn from(value: Option<$ty>) -> Self {
                    Param::from_option(value)
                }
            }
        )*
    };
}

impl_param_from!(
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    String,
    &'static str,
    uuid::Uuid,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
    serde_json::Value,
);

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.null {
            f.write_str("Param(NULL)")
        } else {
            write!(f, "Param({:?})", self.value)
        }
    }
}

/// Explicit key-name → value mapping used to address rows of composite-key entities.
///
/// Names are column names. Insertion order is kept only for diagnostics; the statement always
/// lists key columns in their declared order.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    entries: Vec<(String, Param)>,
}

impl KeyMap {
    /// Create an empty key map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key column value (chainable). `None` records a null value.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Param>) -> Self {
        self.insert(column, value.into());
        self
    }

    /// Add or replace a key column value.
    pub fn insert(&mut self, column: impl Into<String>, value: Param) {
        let column = column.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    /// Look up the value bound to a column.
    pub fn get(&self, column: &str) -> Option<&Param> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
