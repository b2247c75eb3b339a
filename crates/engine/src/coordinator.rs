//! Optimistic mutations over the shared entries cache.
//!
//! Each mutation snapshots the signed-in user's queries, patches them in
//! place, calls the store and then either invalidates (success) or restores
//! the snapshot (failure). Exactly one notification is raised per mutation.
//!
//! Two in-flight mutations on the same id are not serialized: whichever
//! settles last decides what the cache shows until the next refetch.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    EngineError, Entry, EntryPatch, NewEntry, ResultEngine,
    cache::{QueryCache, QueryKey, query_key},
    notify::{Notification, Notifier},
    security::SecurityLog,
    store::EntryStore,
    validation::{Field, RawEntryForm, ValidationResult, parse_form_at},
};

/// First segment of every entries query key.
pub const ENTRIES_QUERY: &str = "entries";

/// Prefix of the placeholder id shown until the store assigns a real one.
pub const OPTIMISTIC_ID_PREFIX: &str = "optimistic-";

pub fn entries_key(user_id: &str) -> QueryKey {
    query_key([ENTRIES_QUERY, user_id])
}

/// Why [`MutationCoordinator::submit`] did not create an entry.
#[derive(Debug, Error, PartialEq)]
pub enum SubmitError {
    #[error("entry form is invalid")]
    Invalid(ValidationResult),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Clone, Copy)]
enum Mutation {
    Create,
    Update,
    Delete,
    BulkDelete,
}

impl Mutation {
    fn failure_prefix(self) -> &'static str {
        match self {
            Mutation::Create => "Failed to add entry",
            Mutation::Update => "Failed to update entry",
            Mutation::Delete => "Failed to delete entry",
            Mutation::BulkDelete => "Failed to delete entries",
        }
    }
}

/// Ids with a mutation in flight; released on drop.
struct InFlight<'a> {
    registry: &'a Mutex<HashMap<String, usize>>,
    ids: Vec<String>,
}

impl<'a> InFlight<'a> {
    fn track(registry: &'a Mutex<HashMap<String, usize>>, ids: &[String]) -> Self {
        let mut pending = registry.lock().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            let count = pending.entry(id.clone()).or_default();
            if *count > 0 {
                tracing::warn!("entry {id} already has a mutation in flight");
            }
            *count += 1;
        }
        Self {
            registry,
            ids: ids.to_vec(),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut pending = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        for id in &self.ids {
            if let Some(count) = pending.get_mut(id) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    pending.remove(id);
                }
            }
        }
    }
}

pub struct MutationCoordinator<S: EntryStore + ?Sized> {
    store: Arc<S>,
    cache: QueryCache<Vec<Entry>>,
    notifier: Arc<dyn Notifier>,
    audit: Option<Arc<SecurityLog>>,
    user: RwLock<Option<String>>,
    in_flight: Mutex<HashMap<String, usize>>,
}

impl<S: EntryStore + ?Sized> MutationCoordinator<S> {
    pub fn new(store: Arc<S>, cache: QueryCache<Vec<Entry>>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            cache,
            notifier,
            audit: None,
            user: RwLock::new(None),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Report suspicious form input and unauthenticated mutations to `log`.
    pub fn with_security_log(mut self, log: Arc<SecurityLog>) -> Self {
        self.audit = Some(log);
        self
    }

    /// Mutations on `id` that have not settled yet. More than one means the
    /// cache will show whichever settles last.
    pub fn pending_mutations(&self, id: &str) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    pub fn cache(&self) -> &QueryCache<Vec<Entry>> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn current_user(&self) -> Option<String> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sign_in(&self, user_id: &str) -> ResultEngine<()> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(EngineError::unauthenticated());
        }
        let previous = self
            .user
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(user_id.to_string());
        if let Some(previous) = previous
            && previous != user_id
        {
            self.cache.remove_matching(&entries_key(&previous));
        }
        tracing::info!("signed in as {user_id}");
        Ok(())
    }

    /// Forget the user and every query cached for them.
    pub fn sign_out(&self) {
        let previous = self
            .user
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(previous) = previous {
            self.cache.remove_matching(&entries_key(&previous));
        }
    }

    /// The signed-in user's entries, from cache while fresh.
    ///
    /// Nobody signed in yields an empty list without touching the store.
    pub async fn entries(&self) -> ResultEngine<Vec<Entry>> {
        let Some(user_id) = self.current_user() else {
            return Ok(Vec::new());
        };
        let key = entries_key(&user_id);
        if self.cache.is_fresh(&key)
            && let Some(cached) = self.cache.get(&key)
        {
            return Ok(cached);
        }

        match self.store.get_all(&user_id).await {
            Ok(fetched) => {
                self.cache.set(key, fetched.clone());
                Ok(fetched)
            }
            Err(err) => {
                tracing::error!("failed to load entries for {user_id}: {err}");
                Err(err)
            }
        }
    }

    /// Validate a typed form and create the entry. Invalid forms never reach
    /// the store.
    pub async fn submit(&self, form: &RawEntryForm) -> Result<Entry, SubmitError> {
        let new = match parse_form_at(form, Utc::now()) {
            Ok(new) => new,
            Err(result) => {
                if let Some(field) = result.suspicious_field()
                    && let Some(log) = &self.audit
                {
                    let input = match field {
                        Field::Tenant => form.tenant.as_str(),
                        Field::Description => form.description.as_str(),
                        _ => "",
                    };
                    log.suspicious_input(input, field.as_str(), self.current_user().as_deref());
                }
                return Err(SubmitError::Invalid(result));
            }
        };
        Ok(self.create(new).await?)
    }

    pub async fn create(&self, new: NewEntry) -> ResultEngine<Entry> {
        let user_id = self.require_user(Mutation::Create)?;
        let key = entries_key(&user_id);
        let snapshot = self.cache.snapshot(&key);

        let placeholder_id = format!("{OPTIMISTIC_ID_PREFIX}{}", Uuid::new_v4());
        let placeholder = Entry::from_new(placeholder_id.clone(), &user_id, new.clone(), Utc::now());
        self.cache
            .update_matching(&key, |list| list.insert(0, placeholder.clone()));

        match self.store.create(&user_id, new).await {
            Ok(created) => {
                self.cache.update_matching(&key, |list| {
                    if let Some(slot) = list.iter_mut().find(|e| e.id == placeholder_id) {
                        *slot = created.clone();
                    }
                });
                self.settle_ok(&key, "Entry added successfully!".to_string());
                Ok(created)
            }
            Err(err) => {
                self.cache.restore(snapshot);
                Err(self.settle_err(Mutation::Create, err))
            }
        }
    }

    pub async fn update(&self, id: &str, patch: &EntryPatch) -> ResultEngine<()> {
        let user_id = self.require_user(Mutation::Update)?;
        let key = entries_key(&user_id);
        let _in_flight = InFlight::track(&self.in_flight, &[id.to_string()]);
        let snapshot = self.cache.snapshot(&key);

        let now = Utc::now();
        self.cache.update_matching(&key, |list| {
            if let Some(entry) = list.iter_mut().find(|e| e.id == id) {
                entry.apply(patch, now);
            }
        });

        match self.store.update(&user_id, id, patch).await {
            Ok(()) => {
                self.settle_ok(&key, "Entry updated successfully!".to_string());
                Ok(())
            }
            Err(err) => {
                self.cache.restore(snapshot);
                Err(self.settle_err(Mutation::Update, err))
            }
        }
    }

    pub async fn delete(&self, id: &str) -> ResultEngine<()> {
        let user_id = self.require_user(Mutation::Delete)?;
        let key = entries_key(&user_id);
        let _in_flight = InFlight::track(&self.in_flight, &[id.to_string()]);
        let snapshot = self.cache.snapshot(&key);

        self.cache
            .update_matching(&key, |list| list.retain(|e| e.id != id));

        match self.store.delete(&user_id, id).await {
            Ok(()) => {
                self.settle_ok(&key, "Entry deleted successfully!".to_string());
                Ok(())
            }
            Err(err) => {
                self.cache.restore(snapshot);
                Err(self.settle_err(Mutation::Delete, err))
            }
        }
    }

    pub async fn bulk_delete(&self, ids: &[String]) -> ResultEngine<()> {
        let user_id = self.require_user(Mutation::BulkDelete)?;
        let key = entries_key(&user_id);
        let _in_flight = InFlight::track(&self.in_flight, ids);
        let snapshot = self.cache.snapshot(&key);

        self.cache
            .update_matching(&key, |list| list.retain(|e| !ids.contains(&e.id)));

        match self.store.bulk_delete(&user_id, ids).await {
            Ok(()) => {
                self.settle_ok(&key, format!("{} entries deleted successfully!", ids.len()));
                Ok(())
            }
            Err(err) => {
                self.cache.restore(snapshot);
                Err(self.settle_err(Mutation::BulkDelete, err))
            }
        }
    }

    fn require_user(&self, mutation: Mutation) -> ResultEngine<String> {
        match self.current_user() {
            Some(user_id) => Ok(user_id),
            None => {
                if let Some(log) = &self.audit {
                    log.unauthorized_access(ENTRIES_QUERY, None);
                }
                Err(self.settle_err(mutation, EngineError::unauthenticated()))
            }
        }
    }

    fn settle_ok(&self, key: &[String], message: String) {
        self.cache.invalidate(key);
        self.notifier.notify(Notification::success(message));
    }

    fn settle_err(&self, mutation: Mutation, err: EngineError) -> EngineError {
        tracing::error!("{}: {err}", mutation.failure_prefix());
        self.notifier.notify(Notification::error(format!(
            "{}: {}",
            mutation.failure_prefix(),
            err.user_message()
        )));
        err
    }
}
