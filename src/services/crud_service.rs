use crate::cache::ResponseCache;
use crate::domain::table::{ColumnValue, SortOrder, TableDescriptor};
use crate::error::{AppError, Result};
use crate::storage::crud_repo::CrudRepository;
use serde_json::{Value, json};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Raw pagination/sort inputs as they arrive from the query string.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Clone, Debug)]
pub struct CrudService {
    repo: CrudRepository,
    cache: ResponseCache,
}

impl CrudService {
    pub fn new(repo: CrudRepository, cache: ResponseCache) -> Self {
        Self { repo, cache }
    }

    /// Lists one page of rows wrapped in a pagination envelope. Out-of-range
    /// inputs are clamped rather than rejected; an unknown sort column falls
    /// back to the table's primary key.
    #[tracing::instrument(skip(self, params), fields(table = desc.name), err(level = "warn"))]
    pub async fn list(&self, desc: &'static TableDescriptor, params: &ListParams) -> Result<Value> {
        let page = params.page.unwrap_or(1).max(1);
        let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let sort_column = desc.sort_column(params.sort_by.as_deref());
        let sort_order = SortOrder::parse(params.sort_order.as_deref());

        let key = ResponseCache::list_key(desc.name, page, page_size, sort_column, sort_order.as_sql());
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(key, "Cache hit");
            return Ok(hit);
        }

        let offset = i64::from(page - 1) * i64::from(page_size);
        let rows = self.repo.list(desc, sort_column, sort_order, i64::from(page_size), offset).await?;
        let total = self.repo.count(desc).await?;

        let envelope = json!({
            "page": page,
            "pageSize": page_size,
            "total": total,
            "items": rows,
        });
        self.cache.insert(key, envelope.clone()).await;
        Ok(envelope)
    }

    #[tracing::instrument(skip(self, segments), fields(table = desc.name), err(level = "warn"))]
    pub async fn get(&self, desc: &'static TableDescriptor, segments: &[String]) -> Result<Value> {
        let ids = parse_ids(desc, segments)?;

        let key = ResponseCache::get_key(desc.name, segments);
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(key, "Cache hit");
            return Ok(hit);
        }

        let row = self.repo.get(desc, &ids).await?.ok_or(AppError::NotFound)?;
        self.cache.insert(key, row.clone()).await;
        Ok(row)
    }

    /// Validates the full body (unknown fields rejected, required fields
    /// enforced) and inserts a new row.
    #[tracing::instrument(skip(self, body), fields(table = desc.name), err(level = "warn"))]
    pub async fn create(&self, desc: &'static TableDescriptor, body: &Value) -> Result<Value> {
        let change_set = desc.validate_full(body).map_err(AppError::Validation)?;
        let row = self.repo.insert(desc, &change_set).await?;
        self.cache.invalidate_table(desc.name);
        Ok(row)
    }

    /// Full replacement: the body must pass the same strict validation as a
    /// create.
    #[tracing::instrument(skip(self, segments, body), fields(table = desc.name), err(level = "warn"))]
    pub async fn replace(&self, desc: &'static TableDescriptor, segments: &[String], body: &Value) -> Result<Value> {
        let ids = parse_ids(desc, segments)?;
        let change_set = desc.validate_full(body).map_err(AppError::Validation)?;
        let row = self.repo.update(desc, &ids, &change_set).await?.ok_or(AppError::NotFound)?;
        self.cache.invalidate_table(desc.name);
        Ok(row)
    }

    /// Partial update: unknown fields are dropped instead of rejected, and
    /// only the fields present are validated and written.
    #[tracing::instrument(skip(self, segments, body), fields(table = desc.name), err(level = "warn"))]
    pub async fn patch(&self, desc: &'static TableDescriptor, segments: &[String], body: &Value) -> Result<Value> {
        let ids = parse_ids(desc, segments)?;
        let change_set = desc.validate_partial(body).map_err(AppError::Validation)?;
        if change_set.is_empty() {
            return Err(AppError::BadRequest("No valid fields to update".into()));
        }
        let row = self.repo.update(desc, &ids, &change_set).await?.ok_or(AppError::NotFound)?;
        self.cache.invalidate_table(desc.name);
        Ok(row)
    }

    #[tracing::instrument(skip(self, segments), fields(table = desc.name), err(level = "warn"))]
    pub async fn remove(&self, desc: &'static TableDescriptor, segments: &[String]) -> Result<()> {
        let ids = parse_ids(desc, segments)?;
        let deleted = self.repo.delete(desc, &ids).await?;
        if deleted == 0 {
            return Err(AppError::NotFound);
        }
        self.cache.invalidate_table(desc.name);
        Ok(())
    }
}

fn parse_ids(desc: &TableDescriptor, segments: &[String]) -> Result<Vec<ColumnValue>> {
    if segments.len() != desc.id_columns.len() {
        return Err(AppError::BadRequest(format!(
            "Expected {} id segment(s), got {}",
            desc.id_columns.len(),
            segments.len()
        )));
    }
    desc.id_columns
        .iter()
        .zip(segments)
        .map(|(column, raw)| column.parse_segment(raw).map_err(AppError::BadRequest))
        .collect()
}
