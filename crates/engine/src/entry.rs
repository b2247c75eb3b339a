//! The module contains the `Entry` type representing a single ledger
//! transaction, and its storage model.
//!
//! An entry is created from a [`NewEntry`] (no id, no timestamps), patched
//! through an [`EntryPatch`] and removed for good on delete.
use core::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::Category;

/// A ledger transaction owned by exactly one user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub date: NaiveDate,
    pub tenant: String,
    /// Full precision is kept; two decimals are a display concern.
    pub amount: f64,
    pub category: Category,
    pub description: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An entry before the store assigned its id and timestamps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub date: NaiveDate,
    pub tenant: String,
    pub amount: f64,
    pub category: Category,
    pub description: String,
}

/// Partial update: `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryPatch {
    pub date: Option<NaiveDate>,
    pub tenant: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<Category>,
    pub description: Option<String>,
}

impl Entry {
    /// Build an entry as the store would, with fresh timestamps.
    pub fn from_new(id: String, user_id: &str, new: NewEntry, now: DateTime<Utc>) -> Self {
        Self {
            id,
            date: new.date,
            tenant: new.tenant,
            amount: new.amount,
            category: new.category,
            description: new.description,
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply `patch` in place. Only `updated_at` moves; `created_at` is
    /// immutable.
    pub fn apply(&mut self, patch: &EntryPatch, now: DateTime<Utc>) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(tenant) = &patch.tenant {
            self.tenant = tenant.clone();
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        self.updated_at = now;
    }

    /// Convert a stored row, attributing owner-less rows to `owner`.
    ///
    /// Unknown stored categories fall back to [`Category::Other`].
    pub(crate) fn from_model(model: Model, owner: &str) -> Self {
        let category = Category::try_from(model.category.as_str()).unwrap_or(Category::Other);
        Self {
            id: model.id,
            date: model.date,
            tenant: model.tenant,
            amount: model.amount,
            category,
            description: model.description,
            user_id: model.user_id.unwrap_or_else(|| owner.to_string()),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.tenant.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.description.is_none()
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.2} {} {}",
            self.date, self.tenant, self.amount, self.category, self.description
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: Option<String>,
    pub date: Date,
    pub tenant: String,
    #[sea_orm(column_type = "Double")]
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Entry> for ActiveModel {
    fn from(entry: &Entry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.clone()),
            user_id: ActiveValue::Set(Some(entry.user_id.clone())),
            date: ActiveValue::Set(entry.date),
            tenant: ActiveValue::Set(entry.tenant.clone()),
            amount: ActiveValue::Set(entry.amount),
            category: ActiveValue::Set(entry.category.as_str().to_string()),
            description: ActiveValue::Set(entry.description.clone()),
            created_at: ActiveValue::Set(entry.created_at),
            updated_at: ActiveValue::Set(entry.updated_at),
        }
    }
}
