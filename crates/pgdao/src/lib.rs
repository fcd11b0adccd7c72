//! # pgdao
//!
//! Metadata-driven CRUD and paging for PostgreSQL entities.
//!
//! An entity declares its table, columns and keys once (usually with `#[derive(Entity)]`);
//! [`DbHelper`] turns instances of it into parameterized statements and maps rows back.
//!
//! ## Features
//!
//! - **Keys**: single, composite and database-generated keys
//! - **Null policies**: insert/update only non-null fields, or write every field
//! - **Conditional writes**: insert-where-not-exist and CAS-style updates via a SQL suffix
//! - **Batch insert** in one multi-row statement
//! - **Paging** with or without a count query sharing the same filter
//! - **Transaction-friendly**: pass a transaction anywhere a `GenericClient` is expected
//! - **Slow-statement warnings** through `tracing`
//!
//! ## Example
//!
//! ```ignore
//! use pgdao::{fragment, DbHelper, Entity};
//!
//! #[derive(Debug, Entity)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(id, auto_increment)]
//!     id: Option<i64>,
//!     name: Option<String>,
//!     age: Option<i32>,
//! }
//!
//! let helper = DbHelper::new();
//! let mut user = User { id: None, name: Some("A".into()), age: None };
//! helper.insert(&client, &mut user).await?;
//!
//! user.age = Some(30);
//! helper.update(&client, &user).await?;
//!
//! let older = helper
//!     .get_all_where::<User, _>(&client, &fragment!("WHERE age > ? ORDER BY id", 18))
//!     .await?;
//! ```

extern crate self as pgdao;

pub mod binder;
pub mod builder;
pub mod client;
pub mod entity;
pub mod error;
pub mod helper;
pub mod mapper;
pub mod meta;
pub mod monitor;
pub mod page;
pub mod row;
pub mod sql;
pub mod transaction;
pub mod value;

pub use binder::{FieldPolicy, KeySpec};
pub use client::GenericClient;
pub use entity::Entity;
pub use error::{OrmError, OrmResult};
pub use helper::DbHelper;
pub use mapper::{KeyedRows, RowMap};
pub use meta::{ColumnDef, ColumnMeta, EntityDescriptor, MetaCell, TableMeta};
pub use monitor::{
    CompositeMonitor, HelperConfig, NoopMonitor, QueryContext, QueryMonitor, QueryResult,
    QueryType, TracingMonitor,
};
pub use page::{PageRequest, PageResult};
pub use row::{FromRow, RowExt};
pub use sql::{Fragment, Statement};
pub use transaction::{TxContext, TxOutcome};
pub use value::{KeyMap, Param};

pub use tokio_postgres;
pub use tokio_postgres::Row;

#[cfg(feature = "derive")]
pub use pgdao_derive::{Entity, FromRow};
