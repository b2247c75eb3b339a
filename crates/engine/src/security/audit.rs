use std::{
    collections::VecDeque,
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Events kept before the oldest are dropped.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Characters of a suspicious input kept in the log.
const SUSPICIOUS_INPUT_PREVIEW: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    AuthSuccess,
    AuthFailure,
    UnauthorizedAccess,
    SuspiciousInput,
    RateLimitExceeded,
    DataAccess,
    DataModification,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventKind::AuthSuccess => "auth_success",
            SecurityEventKind::AuthFailure => "auth_failure",
            SecurityEventKind::UnauthorizedAccess => "unauthorized_access",
            SecurityEventKind::SuspiciousInput => "suspicious_input",
            SecurityEventKind::RateLimitExceeded => "rate_limit_exceeded",
            SecurityEventKind::DataAccess => "data_access",
            SecurityEventKind::DataModification => "data_modification",
        }
    }
}

impl fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    pub kind: SecurityEventKind,
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub details: Map<String, Value>,
}

/// Bounded in-memory log of security-relevant events.
#[derive(Debug)]
pub struct SecurityLog {
    capacity: usize,
    events: Mutex<VecDeque<SecurityEvent>>,
}

impl Default for SecurityLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

fn details(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl SecurityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<SecurityEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn log(&self, kind: SecurityEventKind, details: Map<String, Value>, user_id: Option<&str>) {
        let event = SecurityEvent {
            kind,
            user_id: user_id.map(ToString::to_string),
            timestamp: Utc::now(),
            details,
        };
        match kind {
            SecurityEventKind::AuthFailure
            | SecurityEventKind::UnauthorizedAccess
            | SecurityEventKind::SuspiciousInput
            | SecurityEventKind::RateLimitExceeded => {
                let details = Value::Object(event.details.clone());
                tracing::warn!(
                    "security event {kind} user={:?} details={details}",
                    event.user_id
                );
            }
            _ => tracing::debug!("security event {kind} user={:?}", event.user_id),
        }

        let mut events = self.lock();
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub fn auth_success(&self, user_id: &str) {
        self.log(SecurityEventKind::AuthSuccess, Map::new(), Some(user_id));
    }

    pub fn auth_failure(&self, reason: &str, user_id: Option<&str>) {
        self.log(
            SecurityEventKind::AuthFailure,
            details(json!({ "reason": reason })),
            user_id,
        );
    }

    pub fn unauthorized_access(&self, resource: &str, user_id: Option<&str>) {
        self.log(
            SecurityEventKind::UnauthorizedAccess,
            details(json!({ "resource": resource })),
            user_id,
        );
    }

    /// Only a short prefix of `input` is recorded.
    pub fn suspicious_input(&self, input: &str, field: &str, user_id: Option<&str>) {
        let preview: String = input.chars().take(SUSPICIOUS_INPUT_PREVIEW).collect();
        self.log(
            SecurityEventKind::SuspiciousInput,
            details(json!({ "field": field, "input": preview })),
            user_id,
        );
    }

    pub fn rate_limit_exceeded(&self, action: &str, user_id: Option<&str>) {
        self.log(
            SecurityEventKind::RateLimitExceeded,
            details(json!({ "action": action })),
            user_id,
        );
    }

    /// `extra` object fields are merged into the event details.
    pub fn data_access(&self, resource: &str, user_id: &str, extra: Value) {
        let mut map = details(json!({ "resource": resource }));
        map.extend(details(extra));
        self.log(SecurityEventKind::DataAccess, map, Some(user_id));
    }

    pub fn data_modification(
        &self,
        resource: &str,
        action: &str,
        user_id: &str,
        extra: Value,
    ) {
        let mut map = details(json!({ "resource": resource, "action": action }));
        map.extend(details(extra));
        self.log(SecurityEventKind::DataModification, map, Some(user_id));
    }

    /// The last `limit` events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<SecurityEvent> {
        let events = self.lock();
        let skip = events.len().saturating_sub(limit);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn by_kind(&self, kind: SecurityEventKind) -> Vec<SecurityEvent> {
        self.lock()
            .iter()
            .filter(|event| event.kind == kind)
            .cloned()
            .collect()
    }

    pub fn by_user(&self, user_id: &str) -> Vec<SecurityEvent> {
        self.lock()
            .iter()
            .filter(|event| event.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
