use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    Category, EngineError, Entry, EntryPatch, FilterSpec, NewEntry, ResultEngine, entry as entries,
    sanitize::sanitize_input, security::SecurityLog,
};

use super::{EntryStore, MAX_PAGE_SIZE, Page, PageRequest};

macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

const RESOURCE: &str = "ledger_entries";

/// Entries are visible to their owner, and to whoever reads them first if
/// they predate ownership tracking.
fn owned_by(user_id: &str) -> Condition {
    Condition::any()
        .add(entries::Column::UserId.eq(user_id))
        .add(entries::Column::UserId.is_null())
}

fn require_user(user_id: &str) -> ResultEngine<()> {
    if user_id.trim().is_empty() {
        return Err(EngineError::unauthenticated());
    }
    Ok(())
}

async fn find_owned<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    id: &str,
) -> ResultEngine<entries::Model> {
    entries::Entity::find_by_id(id.to_string())
        .filter(owned_by(user_id))
        .one(db)
        .await?
        .ok_or_else(EngineError::entry_not_found)
}

trait ApplyEntryFilters: QueryFilter + Sized {
    fn apply_entry_filters(self, spec: &FilterSpec) -> Self;
}

impl<T> ApplyEntryFilters for T
where
    T: QueryFilter + Sized,
{
    /// Everything but the search term, which is matched after loading.
    fn apply_entry_filters(mut self, spec: &FilterSpec) -> Self {
        if let Some(from) = spec.date_from {
            self = self.filter(entries::Column::Date.gte(from));
        }
        if let Some(to) = spec.date_to {
            self = self.filter(entries::Column::Date.lte(to));
        }
        if let Some(tenant) = spec.tenant.as_deref()
            && !tenant.is_empty()
        {
            self = self.filter(entries::Column::Tenant.eq(tenant));
        }
        if !spec.categories.is_empty() {
            let names: Vec<&str> = spec.categories.iter().map(|c| c.as_str()).collect();
            let mut matching = Condition::any().add(entries::Column::Category.is_in(names));
            // Unknown stored names load as Other.
            if spec.categories.contains(&Category::Other) {
                let known = Category::ALL.map(Category::as_str);
                matching = matching.add(entries::Column::Category.is_not_in(known));
            }
            self = self.filter(matching);
        }
        if let Some(min) = spec.amount_min {
            self = self.filter(entries::Column::Amount.gte(min));
        }
        if let Some(max) = spec.amount_max {
            self = self.filter(entries::Column::Amount.lte(max));
        }
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct EntriesCursor {
    date: NaiveDate,
    entry_id: String,
}

impl EntriesCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid entries cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid entries cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid entries cursor".to_string()))
    }
}

/// [`EntryStore`] backed by the `ledger_entries` table.
#[derive(Clone, Debug)]
pub struct SqlStore {
    database: DatabaseConnection,
    audit: Option<Arc<SecurityLog>>,
}

impl SqlStore {
    /// Return a builder for `SqlStore`.
    pub fn builder() -> SqlStoreBuilder {
        SqlStoreBuilder::default()
    }

    pub fn database(&self) -> &DatabaseConnection {
        &self.database
    }

    /// One page of the owner's entries, newest first.
    ///
    /// Ordering is `(date DESC, id DESC)`; pass the returned cursor back to
    /// continue.
    pub async fn get_page(&self, user_id: &str, request: &PageRequest) -> ResultEngine<Page<Entry>> {
        self.query_page(user_id, request, &FilterSpec::default())
            .await
    }

    /// Like [`SqlStore::get_page`] restricted to entries matching `spec`.
    ///
    /// The search term is applied to each loaded page, so a page may hold
    /// fewer than `limit` entries while `has_more` is still true.
    pub async fn search(
        &self,
        user_id: &str,
        spec: &FilterSpec,
        request: &PageRequest,
    ) -> ResultEngine<Page<Entry>> {
        self.query_page(user_id, request, spec).await
    }

    async fn query_page(
        &self,
        user_id: &str,
        request: &PageRequest,
        spec: &FilterSpec,
    ) -> ResultEngine<Page<Entry>> {
        require_user(user_id)?;
        let limit = request.limit;
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(EngineError::InvalidInput(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let mut query = entries::Entity::find()
            .filter(owned_by(user_id))
            .order_by_desc(entries::Column::Date)
            .order_by_desc(entries::Column::Id)
            .limit(limit.saturating_add(1));
        if let Some(cursor) = request.cursor.as_deref() {
            let cursor = EntriesCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(entries::Column::Date.lt(cursor.date))
                    .add(
                        Condition::all()
                            .add(entries::Column::Date.eq(cursor.date))
                            .add(entries::Column::Id.lt(cursor.entry_id)),
                    ),
            );
        }
        query = query.apply_entry_filters(spec);

        let mut models: Vec<entries::Model> = query.all(&self.database).await?;
        let has_more = models.len() > limit as usize;
        models.truncate(limit as usize);
        self.claim_orphans(user_id, &models).await;

        // The cursor follows the last loaded row, not the last matching one.
        let next_cursor = if has_more {
            models
                .last()
                .map(|model| EntriesCursor {
                    date: model.date,
                    entry_id: model.id.clone(),
                })
                .map(|cursor| cursor.encode())
                .transpose()?
        } else {
            None
        };

        let data: Vec<Entry> = models
            .into_iter()
            .map(|model| Entry::from_model(model, user_id))
            .filter(|item| spec.matches(item))
            .collect();
        self.audit_access(user_id, json!({ "count": data.len(), "paged": true }));

        Ok(Page {
            data,
            next_cursor,
            has_more,
        })
    }

    /// Give owner-less rows to `user_id`. Failures only cost a retry on the
    /// next read.
    async fn claim_orphans(&self, user_id: &str, models: &[entries::Model]) {
        let orphans: Vec<String> = models
            .iter()
            .filter(|model| model.user_id.is_none())
            .map(|model| model.id.clone())
            .collect();
        if orphans.is_empty() {
            return;
        }

        let result = entries::Entity::update_many()
            .col_expr(entries::Column::UserId, Expr::value(user_id))
            .filter(entries::Column::UserId.is_null())
            .filter(entries::Column::Id.is_in(orphans))
            .exec(&self.database)
            .await;
        match result {
            Ok(res) => tracing::info!(
                "attributed {} owner-less entries to {user_id}",
                res.rows_affected
            ),
            Err(err) => tracing::warn!("failed to backfill entry owner for {user_id}: {err}"),
        }
    }

    fn audit_access(&self, user_id: &str, extra: Value) {
        if let Some(log) = &self.audit {
            log.data_access(RESOURCE, user_id, extra);
        }
    }

    fn audit_modification(&self, action: &str, user_id: &str, extra: Value) {
        if let Some(log) = &self.audit {
            log.data_modification(RESOURCE, action, user_id, extra);
        }
    }
}

#[async_trait]
impl EntryStore for SqlStore {
    async fn create(&self, user_id: &str, entry: NewEntry) -> ResultEngine<Entry> {
        require_user(user_id)?;
        let entry = NewEntry {
            tenant: sanitize_input(&entry.tenant),
            description: sanitize_input(&entry.description),
            ..entry
        };
        let created = Entry::from_new(Uuid::new_v4().to_string(), user_id, entry, Utc::now());

        entries::ActiveModel::from(&created)
            .insert(&self.database)
            .await?;
        self.audit_modification("create", user_id, json!({ "entryId": created.id }));
        Ok(created)
    }

    async fn get_all(&self, user_id: &str) -> ResultEngine<Vec<Entry>> {
        require_user(user_id)?;
        let models: Vec<entries::Model> = entries::Entity::find()
            .filter(owned_by(user_id))
            .order_by_desc(entries::Column::Date)
            .order_by_desc(entries::Column::Id)
            .all(&self.database)
            .await?;
        self.claim_orphans(user_id, &models).await;
        self.audit_access(user_id, json!({ "count": models.len() }));

        Ok(models
            .into_iter()
            .map(|model| Entry::from_model(model, user_id))
            .collect())
    }

    async fn get(&self, user_id: &str, id: &str) -> ResultEngine<Entry> {
        require_user(user_id)?;
        let model = find_owned(&self.database, user_id, id).await?;
        self.claim_orphans(user_id, std::slice::from_ref(&model))
            .await;
        Ok(Entry::from_model(model, user_id))
    }

    async fn update(&self, user_id: &str, id: &str, patch: &EntryPatch) -> ResultEngine<()> {
        require_user(user_id)?;
        let patch = EntryPatch {
            tenant: patch.tenant.as_deref().map(sanitize_input),
            description: patch.description.as_deref().map(sanitize_input),
            ..patch.clone()
        };

        with_tx!(self, |db_tx| {
            let model = find_owned(&db_tx, user_id, id).await?;
            let mut current = Entry::from_model(model, user_id);
            current.apply(&patch, Utc::now());

            entries::ActiveModel {
                id: ActiveValue::Set(current.id.clone()),
                user_id: ActiveValue::Set(Some(current.user_id.clone())),
                date: ActiveValue::Set(current.date),
                tenant: ActiveValue::Set(current.tenant.clone()),
                amount: ActiveValue::Set(current.amount),
                category: ActiveValue::Set(current.category.as_str().to_string()),
                description: ActiveValue::Set(current.description.clone()),
                updated_at: ActiveValue::Set(current.updated_at),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            self.audit_modification("update", user_id, json!({ "entryId": id }));
            Ok(())
        })
    }

    async fn delete(&self, user_id: &str, id: &str) -> ResultEngine<()> {
        require_user(user_id)?;
        with_tx!(self, |db_tx| {
            find_owned(&db_tx, user_id, id).await?;
            entries::Entity::delete_by_id(id.to_string())
                .exec(&db_tx)
                .await?;

            self.audit_modification("delete", user_id, json!({ "entryId": id }));
            Ok(())
        })
    }

    /// Fails with `NotFound`, deleting nothing, unless every id names one of
    /// the owner's entries.
    async fn bulk_delete(&self, user_id: &str, ids: &[String]) -> ResultEngine<()> {
        if user_id.trim().is_empty() || ids.is_empty() {
            return Err(EngineError::InvalidInput(
                "User ID and entry IDs are required".to_string(),
            ));
        }
        let unique: HashSet<&String> = ids.iter().collect();

        with_tx!(self, |db_tx| {
            let result = entries::Entity::delete_many()
                .filter(owned_by(user_id))
                .filter(entries::Column::Id.is_in(unique.iter().map(|id| id.as_str())))
                .exec(&db_tx)
                .await?;
            if result.rows_affected != unique.len() as u64 {
                tracing::warn!(
                    "bulk delete for {user_id} matched {} of {} entries, rolling back",
                    result.rows_affected,
                    unique.len()
                );
                return Err(EngineError::NotFound(
                    "One or more entries not found".to_string(),
                ));
            }

            self.audit_modification("bulk_delete", user_id, json!({ "count": unique.len() }));
            Ok(())
        })
    }
}

#[derive(Default)]
pub struct SqlStoreBuilder {
    database: DatabaseConnection,
    audit: Option<Arc<SecurityLog>>,
}

impl SqlStoreBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> SqlStoreBuilder {
        self.database = db;
        self
    }

    /// Record reads and writes in `log`.
    pub fn security_log(mut self, log: Arc<SecurityLog>) -> SqlStoreBuilder {
        self.audit = Some(log);
        self
    }

    /// Construct `SqlStore`
    pub fn build(self) -> SqlStore {
        SqlStore {
            database: self.database,
            audit: self.audit,
        }
    }
}
