//! Core of the tenant ledger: entries and their validation, filtering,
//! summaries and export, the owner-scoped store and the optimistic mutation
//! layer on top of it.

pub use cache::{CacheSnapshot, QueryCache, QueryKey, query_key};
pub use category::Category;
pub use coordinator::{
    ENTRIES_QUERY, MutationCoordinator, OPTIMISTIC_ID_PREFIX, SubmitError, entries_key,
};
pub use entry::{Entry, EntryPatch, NewEntry};
pub use error::{EngineError, ErrorCode};
pub use export::{CSV_HEADER, escape_cell, export_filename, export_to_dir, to_csv, write_csv};
pub use filter::{FilterErrors, FilterField, FilterSpec, RawFilter, filter_entries};
pub use money::format_currency;
pub use notify::{Notification, Notifier, ToastLevel, ToastQueue, TracingNotifier};
pub use report::{DEFAULT_REPORT_TITLE, escape_html, render_report, report_filename};
pub use security::{AuthGuard, RateLimiter, SecurityEvent, SecurityEventKind, SecurityLog};
pub use store::{EntryStore, Page, PageRequest, SqlStore, SqlStoreBuilder};
pub use summary::{
    CategoryShare, CategorySummary, IncomeStatement, Summary, TenantShare, TenantSummary,
    group_by_month, income_statement, summarize, top_categories, top_tenants,
};
pub use validation::{Field, RawEntryForm, ValidationResult, parse_form_at, validate, validate_at};

pub mod cache;
mod category;
mod coordinator;
pub mod entry;
mod error;
mod export;
mod filter;
mod money;
mod notify;
mod report;
pub mod sanitize;
pub mod security;
pub mod store;
mod summary;
pub mod validation;

pub type ResultEngine<T> = Result<T, EngineError>;
