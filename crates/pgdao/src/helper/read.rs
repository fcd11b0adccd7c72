//! Lookups, listing, counting and paging.

use super::DbHelper;
use crate::binder;
use crate::builder;
use crate::client::GenericClient;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::mapper::{KeyedRows, map_rows};
use crate::page::{PageRequest, PageResult};
use crate::row::{FromRow, RowExt};
use crate::sql::{Fragment, Statement};
use crate::value::{KeyMap, Param};
use std::collections::HashSet;
use std::hash::Hash;
use tokio_postgres::types::{FromSql, ToSql};

impl DbHelper {
    async fn fetch_first<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        operation: &'static str,
        stmt: &Statement,
    ) -> OrmResult<Option<E>> {
        let rows = self.run_query(conn, operation, stmt).await?;
        rows.first().map(E::from_row).transpose()
    }

    /// Look a row up by a single key value.
    ///
    /// Fails with a key-value error for keyless or composite-key entities and for a null key.
    pub async fn get_by_key<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        key: impl Into<Param>,
    ) -> OrmResult<Option<E>> {
        let meta = E::table_meta()?;
        let key = binder::scalar_key(meta, key.into())?;
        self.fetch_first(conn, "get_by_key", &builder::select_by_key(meta, &key))
            .await
    }

    /// Look a row up by an explicit column → value key mapping.
    pub async fn get_by_key_map<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        keys: &KeyMap,
    ) -> OrmResult<Option<E>> {
        let meta = E::table_meta()?;
        let key = binder::mapped_key(meta, keys)?;
        self.fetch_first(conn, "get_by_key", &builder::select_by_key(meta, &key))
            .await
    }

    /// Reload `entity` from the row its own key addresses.
    ///
    /// Returns `false` (leaving `entity` untouched) when no such row exists.
    pub async fn get_by_key_of<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        entity: &mut E,
    ) -> OrmResult<bool> {
        let meta = E::table_meta()?;
        let key = binder::key_of(meta, entity)?;
        let stmt = builder::select_by_key(meta, &key);
        match self.fetch_first::<E, C>(conn, "get_by_key", &stmt).await? {
            Some(found) => {
                *entity = found;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Look up many rows of a single-key entity.
    ///
    /// The result follows the order of `keys`; keys without a row are omitted.
    pub async fn get_by_key_list<E, K, C>(&self, conn: &C, keys: &[K]) -> OrmResult<KeyedRows<K, E>>
    where
        E: Entity,
        K: ToSql + for<'a> FromSql<'a> + Eq + Hash + Clone + Send + Sync + 'static,
        C: GenericClient,
    {
        let meta = E::table_meta()?;
        let (_, key_column) = meta.single_key()?;
        if keys.is_empty() {
            return Ok(KeyedRows::empty());
        }

        let mut seen = HashSet::with_capacity(keys.len());
        let params: Vec<Param> = keys
            .iter()
            .filter(|k| seen.insert(*k))
            .map(|k| Param::new(k.clone()))
            .collect();
        let stmt = builder::select_by_key_list(meta, &params)?;

        let rows = self.run_query(conn, "get_by_key_list", &stmt).await?;
        let found = rows
            .iter()
            .map(|row| Ok((row.try_get_column::<K>(key_column.name)?, E::from_row(row)?)))
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(KeyedRows::arrange(keys, found))
    }

    /// Every row of the table.
    pub async fn get_all<E: Entity, C: GenericClient>(&self, conn: &C) -> OrmResult<Vec<E>> {
        let meta = E::table_meta()?;
        let stmt = builder::select(meta, None)?;
        let rows = self.run_query(conn, "get_all", &stmt).await?;
        map_rows(&rows)
    }

    /// Rows selected by a `WHERE ...`/`ORDER BY ...` suffix.
    pub async fn get_all_where<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        suffix: &Fragment,
    ) -> OrmResult<Vec<E>> {
        let meta = E::table_meta()?;
        let stmt = builder::select(meta, Some(suffix))?;
        let rows = self.run_query(conn, "get_all", &stmt).await?;
        map_rows(&rows)
    }

    /// The first row in table order, if any.
    pub async fn get_one<E: Entity, C: GenericClient>(&self, conn: &C) -> OrmResult<Option<E>> {
        let meta = E::table_meta()?;
        self.fetch_first(conn, "get_one", &builder::select_one(meta, None)?)
            .await
    }

    /// The first row matching a suffix. Several matches are not an error.
    pub async fn get_one_where<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        suffix: &Fragment,
    ) -> OrmResult<Option<E>> {
        let meta = E::table_meta()?;
        self.fetch_first(conn, "get_one", &builder::select_one(meta, Some(suffix))?)
            .await
    }

    /// Number of rows in the table.
    pub async fn get_count<E: Entity, C: GenericClient>(&self, conn: &C) -> OrmResult<u64> {
        let meta = E::table_meta()?;
        self.count_rows(conn, &builder::count(meta, None)?).await
    }

    /// Number of rows matching a suffix.
    pub async fn get_count_where<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        suffix: &Fragment,
    ) -> OrmResult<u64> {
        let meta = E::table_meta()?;
        self.count_rows(conn, &builder::count(meta, Some(suffix))?)
            .await
    }

    async fn count_rows<C: GenericClient>(&self, conn: &C, stmt: &Statement) -> OrmResult<u64> {
        let rows = self.run_query(conn, "get_count", stmt).await?;
        let row = rows
            .first()
            .ok_or_else(|| OrmError::not_found("COUNT(*) returned no row"))?;
        let count: i64 = crate::mapper::scalar(row)?;
        u64::try_from(count).map_err(|_| OrmError::decode("count", format!("negative count {count}")))
    }

    /// One page of rows plus the total count for the same filter.
    pub async fn get_page<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        request: &PageRequest,
    ) -> OrmResult<PageResult<E>> {
        let meta = E::table_meta()?;
        let window = builder::page(meta, request.filter.as_ref(), request.page, request.page_size)?;
        let count = builder::count(meta, request.filter.as_ref())?;

        let rows = self.run_query(conn, "get_page", &window).await?;
        let data = map_rows(&rows)?;
        let total = self.count_rows(conn, &count).await?;
        Ok(PageResult {
            data,
            total: Some(total),
            page: request.page,
            page_size: request.page_size,
        })
    }

    /// One page of rows without counting.
    pub async fn get_page_without_count<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        request: &PageRequest,
    ) -> OrmResult<PageResult<E>> {
        let meta = E::table_meta()?;
        let window = builder::page(meta, request.filter.as_ref(), request.page, request.page_size)?;
        let rows = self.run_query(conn, "get_page", &window).await?;
        Ok(PageResult {
            data: map_rows(&rows)?,
            total: None,
            page: request.page,
            page_size: request.page_size,
        })
    }

    /// Map rows of an arbitrary query into any [`FromRow`] type.
    pub(crate) async fn fetch_as<T: FromRow, C: GenericClient>(
        &self,
        conn: &C,
        operation: &'static str,
        stmt: &Statement,
    ) -> OrmResult<Vec<T>> {
        let rows = self.run_query(conn, operation, stmt).await?;
        map_rows(&rows)
    }
}
