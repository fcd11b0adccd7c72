//! Hand-written SQL passthrough. No metadata is involved; the fragment is the whole statement.

use super::DbHelper;
use crate::client::GenericClient;
use crate::error::OrmResult;
use crate::mapper::{self, RowMap};
use crate::row::FromRow;
use crate::sql::{Fragment, Statement};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

impl DbHelper {
    /// First column of the first row, or `None` for an empty result.
    pub async fn query_for_object<T, C>(&self, conn: &C, query: &Fragment) -> OrmResult<Option<T>>
    where
        T: for<'a> FromSql<'a>,
        C: GenericClient,
    {
        let stmt = Statement::from_fragment(query)?;
        let rows = self.run_query(conn, "query_for_object", &stmt).await?;
        rows.first().map(mapper::scalar).transpose()
    }

    /// The raw driver rows.
    pub async fn query_for_row_set<C: GenericClient>(
        &self,
        conn: &C,
        query: &Fragment,
    ) -> OrmResult<Vec<Row>> {
        let stmt = Statement::from_fragment(query)?;
        self.run_query(conn, "query_for_row_set", &stmt).await
    }

    /// The first row as a column-ordered map.
    pub async fn query_for_map<C: GenericClient>(
        &self,
        conn: &C,
        query: &Fragment,
    ) -> OrmResult<Option<RowMap>> {
        let stmt = Statement::from_fragment(query)?;
        let rows = self.run_query(conn, "query_for_map", &stmt).await?;
        rows.first().map(RowMap::from_row).transpose()
    }

    /// Every row as a column-ordered map.
    pub async fn query_for_map_list<C: GenericClient>(
        &self,
        conn: &C,
        query: &Fragment,
    ) -> OrmResult<Vec<RowMap>> {
        let stmt = Statement::from_fragment(query)?;
        let rows = self.run_query(conn, "query_for_map_list", &stmt).await?;
        rows.iter().map(RowMap::from_row).collect()
    }

    /// Every row mapped through [`FromRow`].
    pub async fn query_for_list<T: FromRow, C: GenericClient>(
        &self,
        conn: &C,
        query: &Fragment,
    ) -> OrmResult<Vec<T>> {
        let stmt = Statement::from_fragment(query)?;
        self.fetch_as(conn, "query_for_list", &stmt).await
    }

    /// Execute a hand-written statement and return the affected-row count.
    pub async fn execute_sql<C: GenericClient>(&self, conn: &C, statement: &Fragment) -> OrmResult<u64> {
        let stmt = Statement::from_fragment(statement)?;
        self.run_execute(conn, "execute_sql", &stmt).await
    }
}
