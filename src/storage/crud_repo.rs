//! Generic table access driven by `TableDescriptor`. Identifiers (table and
//! column names) are interpolated only from the static descriptor; every
//! request-derived value goes through `push_bind`.

use crate::domain::table::{ChangeSet, ColumnValue, FieldKind, SortOrder, TableDescriptor};
use crate::error::Result;
use crate::storage::DbPool;
use crate::storage::row::row_to_json;
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CrudRepository {
    pool: DbPool,
}

impl CrudRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Fetches one page of rows, ordered by a safelisted column.
    pub async fn list(
        &self,
        desc: &TableDescriptor,
        sort_column: &'static str,
        sort_order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Value>> {
        let mut qb = list_query(desc, sort_column, sort_order, limit, offset);
        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    /// Counts all rows in the table. Runs separately from the page fetch;
    /// the window between the two under concurrent writes is accepted.
    pub async fn count(&self, desc: &TableDescriptor) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(1) FROM {}", desc.name));
        let total = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    /// Fetches a single row by its (possibly composite) id tuple.
    pub async fn get(&self, desc: &TableDescriptor, ids: &[ColumnValue]) -> Result<Option<Value>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT * FROM {}", desc.name));
        push_id_predicate(&mut qb, desc, ids);
        let row = qb.build().fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(row_to_json))
    }

    /// Inserts a validated change-set and returns the created row including
    /// server-assigned defaults.
    pub async fn insert(&self, desc: &TableDescriptor, change_set: &ChangeSet) -> Result<Value> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("INSERT INTO {} (", desc.name));
        let mut columns = qb.separated(", ");
        for (name, _) in change_set {
            columns.push(*name);
        }
        qb.push(") VALUES (");
        let mut values = qb.separated(", ");
        for (_, value) in change_set {
            push_bind_value(&mut values, value);
        }
        qb.push(") RETURNING *");

        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(row_to_json(&row))
    }

    /// Applies a validated change-set to the row matching the id tuple and
    /// returns the refreshed row, or `None` if no row matched.
    pub async fn update(
        &self,
        desc: &TableDescriptor,
        ids: &[ColumnValue],
        change_set: &ChangeSet,
    ) -> Result<Option<Value>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", desc.name));
        let mut assignments = qb.separated(", ");
        for (name, value) in change_set {
            assignments.push(format!("{name} = "));
            push_bind_unseparated(&mut assignments, value);
        }
        push_id_predicate(&mut qb, desc, ids);
        qb.push(" RETURNING *");

        let row = qb.build().fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(row_to_json))
    }

    /// Deletes by id tuple, returning the number of rows removed.
    pub async fn delete(&self, desc: &TableDescriptor, ids: &[ColumnValue]) -> Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("DELETE FROM {}", desc.name));
        push_id_predicate(&mut qb, desc, ids);
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn list_query(
    desc: &TableDescriptor,
    sort_column: &'static str,
    sort_order: SortOrder,
    limit: i64,
    offset: i64,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT * FROM {} ORDER BY {} {}",
        desc.name,
        sort_column,
        sort_order.as_sql()
    ));
    qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
    qb
}

fn push_id_predicate(qb: &mut QueryBuilder<'static, Postgres>, desc: &TableDescriptor, ids: &[ColumnValue]) {
    debug_assert_eq!(desc.id_columns.len(), ids.len());
    for (i, (column, value)) in desc.id_columns.iter().zip(ids).enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(column.name).push(" = ");
        match value {
            ColumnValue::Int(v) => qb.push_bind(*v),
            ColumnValue::Uuid(v) => qb.push_bind(*v),
            ColumnValue::Text(v) => qb.push_bind(v.clone()),
            ColumnValue::Float(v) => qb.push_bind(*v),
            ColumnValue::Bool(v) => qb.push_bind(*v),
            ColumnValue::Timestamp(v) => qb.push_bind(*v),
            ColumnValue::Null(_) => qb.push_bind(Option::<i64>::None),
        };
    }
}

fn push_bind_value(sep: &mut sqlx::query_builder::Separated<'_, 'static, Postgres, &str>, value: &ColumnValue) {
    match value {
        ColumnValue::Text(v) => {
            sep.push_bind(v.clone());
        }
        ColumnValue::Int(v) => {
            sep.push_bind(*v);
        }
        ColumnValue::Float(v) => {
            sep.push_bind(*v);
        }
        ColumnValue::Bool(v) => {
            sep.push_bind(*v);
        }
        ColumnValue::Uuid(v) => {
            sep.push_bind(*v);
        }
        ColumnValue::Timestamp(v) => {
            sep.push_bind(*v);
        }
        ColumnValue::Null(kind) => push_typed_null(sep, *kind),
    }
}

fn push_bind_unseparated(sep: &mut sqlx::query_builder::Separated<'_, 'static, Postgres, &str>, value: &ColumnValue) {
    match value {
        ColumnValue::Text(v) => sep.push_bind_unseparated(v.clone()),
        ColumnValue::Int(v) => sep.push_bind_unseparated(*v),
        ColumnValue::Float(v) => sep.push_bind_unseparated(*v),
        ColumnValue::Bool(v) => sep.push_bind_unseparated(*v),
        ColumnValue::Uuid(v) => sep.push_bind_unseparated(*v),
        ColumnValue::Timestamp(v) => sep.push_bind_unseparated(*v),
        ColumnValue::Null(kind) => match kind {
            FieldKind::Text => sep.push_bind_unseparated(Option::<String>::None),
            FieldKind::Integer => sep.push_bind_unseparated(Option::<i64>::None),
            FieldKind::Float => sep.push_bind_unseparated(Option::<f64>::None),
            FieldKind::Boolean => sep.push_bind_unseparated(Option::<bool>::None),
            FieldKind::Uuid => sep.push_bind_unseparated(Option::<Uuid>::None),
            FieldKind::Timestamp => sep.push_bind_unseparated(Option::<OffsetDateTime>::None),
        },
    };
}

fn push_typed_null(sep: &mut sqlx::query_builder::Separated<'_, 'static, Postgres, &str>, kind: FieldKind) {
    match kind {
        FieldKind::Text => sep.push_bind(Option::<String>::None),
        FieldKind::Integer => sep.push_bind(Option::<i64>::None),
        FieldKind::Float => sep.push_bind(Option::<f64>::None),
        FieldKind::Boolean => sep.push_bind(Option::<bool>::None),
        FieldKind::Uuid => sep.push_bind(Option::<Uuid>::None),
        FieldKind::Timestamp => sep.push_bind(Option::<OffsetDateTime>::None),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::{FieldSpec, IdColumn, IdKind};

    fn descriptor() -> TableDescriptor {
        TableDescriptor {
            name: "skills",
            id_columns: vec![IdColumn::new("id", IdKind::Int)],
            fields: vec![FieldSpec::text("skill_name").required()],
            write_requires_auth: true,
        }
    }

    #[test]
    fn list_query_interpolates_only_descriptor_identifiers() {
        let desc = descriptor();
        let qb = list_query(&desc, "skill_name", SortOrder::Asc, 20, 40);
        assert_eq!(qb.sql(), "SELECT * FROM skills ORDER BY skill_name ASC LIMIT $1 OFFSET $2");
    }

    #[test]
    fn id_predicate_binds_each_segment() {
        let desc = TableDescriptor {
            name: "candidate_skills",
            id_columns: vec![IdColumn::new("candidate_id", IdKind::Uuid), IdColumn::new("skill_id", IdKind::Int)],
            fields: vec![],
            write_requires_auth: true,
        };
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM candidate_skills".to_string());
        push_id_predicate(&mut qb, &desc, &[ColumnValue::Uuid(Uuid::nil()), ColumnValue::Int(7)]);
        assert_eq!(qb.sql(), "DELETE FROM candidate_skills WHERE candidate_id = $1 AND skill_id = $2");
    }
}
