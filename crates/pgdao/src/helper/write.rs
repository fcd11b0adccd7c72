//! Inserts, updates and deletes.

use super::DbHelper;
use crate::binder::{self, FieldPolicy};
use crate::builder::{self, InsertPlan};
use crate::client::GenericClient;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::sql::Fragment;
use crate::value::{KeyMap, Param};

impl DbHelper {
    async fn run_insert<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        operation: &'static str,
        entity: &mut E,
        plan: InsertPlan,
    ) -> OrmResult<u64> {
        if !plan.returns_key {
            return self.run_execute(conn, operation, &plan.statement).await;
        }
        let rows = self.run_query(conn, operation, &plan.statement).await?;
        if let Some(row) = rows.first() {
            entity.set_generated_key(row)?;
        }
        Ok(rows.len() as u64)
    }

    /// Insert the non-null fields of `entity`.
    ///
    /// A database-generated key is read back into `entity`.
    pub async fn insert<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        entity: &mut E,
    ) -> OrmResult<u64> {
        let meta = E::table_meta()?;
        let params = binder::entity_params(meta, entity)?;
        let plan = builder::insert(meta, params, FieldPolicy::NonNullFields)?;
        self.run_insert(conn, "insert", entity, plan).await
    }

    /// Insert every field of `entity`, writing `NULL` for absent values.
    pub async fn insert_with_null<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        entity: &mut E,
    ) -> OrmResult<u64> {
        let meta = E::table_meta()?;
        let params = binder::entity_params(meta, entity)?;
        let plan = builder::insert(meta, params, FieldPolicy::AllFields)?;
        self.run_insert(conn, "insert_with_null", entity, plan).await
    }

    /// Insert the non-null fields unless a row matching `predicate` already exists.
    ///
    /// Returns 0 when the predicate matched. The check and the insert are one statement with
    /// no stronger isolation; wrap it in a transaction when concurrent writers matter.
    pub async fn insert_where_not_exist<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        entity: &mut E,
        predicate: &Fragment,
    ) -> OrmResult<u64> {
        let meta = E::table_meta()?;
        let params = binder::entity_params(meta, entity)?;
        let plan =
            builder::insert_where_not_exist(meta, params, FieldPolicy::NonNullFields, predicate)?;
        self.run_insert(conn, "insert_where_not_exist", entity, plan)
            .await
    }

    /// [`insert_where_not_exist`](Self::insert_where_not_exist), writing every field.
    pub async fn insert_with_null_where_not_exist<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        entity: &mut E,
        predicate: &Fragment,
    ) -> OrmResult<u64> {
        let meta = E::table_meta()?;
        let params = binder::entity_params(meta, entity)?;
        let plan = builder::insert_where_not_exist(meta, params, FieldPolicy::AllFields, predicate)?;
        self.run_insert(conn, "insert_with_null_where_not_exist", entity, plan)
            .await
    }

    /// Insert all `entities` with one multi-row statement, every column included.
    ///
    /// Generated keys are not read back.
    pub async fn insert_with_null_in_one_sql<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        entities: &[E],
    ) -> OrmResult<u64> {
        let meta = E::table_meta()?;
        let rows = entities
            .iter()
            .map(|e| binder::entity_params(meta, e))
            .collect::<OrmResult<Vec<_>>>()?;
        let stmt = builder::batch_insert(meta, rows)?;
        self.run_execute(conn, "insert_with_null_in_one_sql", &stmt)
            .await
    }

    async fn update_one<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        operation: &'static str,
        entity: &E,
        policy: FieldPolicy,
        suffix: Option<&Fragment>,
    ) -> OrmResult<u64> {
        let meta = E::table_meta()?;
        let params = binder::entity_params(meta, entity)?;
        let stmt = builder::update(meta, params, policy, suffix)?;
        self.run_execute(conn, operation, &stmt).await
    }

    async fn update_each<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        operation: &'static str,
        entities: &[E],
        policy: FieldPolicy,
        suffix: Option<&Fragment>,
    ) -> OrmResult<u64> {
        if entities.is_empty() {
            return Err(OrmError::precondition(format!("{operation} needs at least one entity")));
        }
        let mut affected = 0;
        for entity in entities {
            affected += self
                .update_one(conn, operation, entity, policy, suffix)
                .await?;
        }
        Ok(affected)
    }

    /// Update the non-null, non-key fields of the row `entity`'s key addresses.
    pub async fn update<E: Entity, C: GenericClient>(&self, conn: &C, entity: &E) -> OrmResult<u64> {
        self.update_one(conn, "update", entity, FieldPolicy::NonNullFields, None)
            .await
    }

    /// Conditional update: `suffix` is ANDed to the key predicate.
    ///
    /// 0 affected rows means the condition did not match.
    pub async fn update_where<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        entity: &E,
        suffix: &Fragment,
    ) -> OrmResult<u64> {
        self.update_one(conn, "update", entity, FieldPolicy::NonNullFields, Some(suffix))
            .await
    }

    /// Update every non-key field, writing `NULL` for absent values.
    pub async fn update_with_null<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        entity: &E,
    ) -> OrmResult<u64> {
        self.update_one(conn, "update_with_null", entity, FieldPolicy::AllFields, None)
            .await
    }

    /// [`update_with_null`](Self::update_with_null) with a condition ANDed to the key predicate.
    pub async fn update_with_null_where<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        entity: &E,
        suffix: &Fragment,
    ) -> OrmResult<u64> {
        self.update_one(
            conn,
            "update_with_null",
            entity,
            FieldPolicy::AllFields,
            Some(suffix),
        )
        .await
    }

    /// [`update`](Self::update) each entity in turn; returns the summed affected count.
    ///
    /// Stops at the first failure. Not atomic unless `conn` is a transaction.
    pub async fn update_all<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        entities: &[E],
    ) -> OrmResult<u64> {
        self.update_each(conn, "update_all", entities, FieldPolicy::NonNullFields, None)
            .await
    }

    /// [`update_with_null`](Self::update_with_null) each entity in turn.
    pub async fn update_with_null_all<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        entities: &[E],
    ) -> OrmResult<u64> {
        self.update_each(
            conn,
            "update_with_null_all",
            entities,
            FieldPolicy::AllFields,
            None,
        )
        .await
    }

    /// [`update_with_null_where`](Self::update_with_null_where) each entity with the same
    /// condition.
    pub async fn update_with_null_all_where<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        entities: &[E],
        suffix: &Fragment,
    ) -> OrmResult<u64> {
        self.update_each(
            conn,
            "update_with_null_all",
            entities,
            FieldPolicy::AllFields,
            Some(suffix),
        )
        .await
    }

    /// Delete the row `entity`'s key addresses.
    pub async fn delete_by_key<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        entity: &E,
    ) -> OrmResult<u64> {
        let meta = E::table_meta()?;
        let key = binder::key_of(meta, entity)?;
        self.run_execute(conn, "delete_by_key", &builder::delete_by_key(meta, &key))
            .await
    }

    /// Delete by a single key value.
    pub async fn delete_by_key_value<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        key: impl Into<Param>,
    ) -> OrmResult<u64> {
        let meta = E::table_meta()?;
        let key = binder::scalar_key(meta, key.into())?;
        self.run_execute(conn, "delete_by_key", &builder::delete_by_key(meta, &key))
            .await
    }

    /// Delete by an explicit column → value key mapping.
    pub async fn delete_by_key_map<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        keys: &KeyMap,
    ) -> OrmResult<u64> {
        let meta = E::table_meta()?;
        let key = binder::mapped_key(meta, keys)?;
        self.run_execute(conn, "delete_by_key", &builder::delete_by_key(meta, &key))
            .await
    }

    /// Delete rows matching `predicate`, which must start with `WHERE`.
    pub async fn delete_where<E: Entity, C: GenericClient>(
        &self,
        conn: &C,
        predicate: &Fragment,
    ) -> OrmResult<u64> {
        let meta = E::table_meta()?;
        let stmt = builder::delete_where(meta, predicate)?;
        self.run_execute(conn, "delete", &stmt).await
    }
}
