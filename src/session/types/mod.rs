use crate::errors::{SessionError, SessionResult};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Key under which the file encoding stores the expiry line.
///
/// Never allowed inside `Session::data`.
pub const EXPIRES_AT_KEY: &str = "expiresAt";

/// A single entry in a session's data bag.
///
/// `Int`, `Float`, `Bool` and `Str` have a text form and survive the file
/// backend (they come back as `Str`). `Opaque` holds any caller type and only
/// round-trips through the memory backend.
#[derive(Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self::Opaque(Arc::new(value))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Text rendering used by the file encoding. `None` for opaque values.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Int(n) => Some(n.to_string()),
            Self::Float(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Str(s) => Some(s.clone()),
            Self::Opaque(_) => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Self::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

/// A session record: fixed id and expiry plus a mutable data bag.
///
/// Values handed out by a store are detached copies. Changes only become
/// canonical once passed back through `set_session`.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    expires_at: DateTime<Utc>,
    data: HashMap<String, Value>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        expires_at: DateTime<Utc>,
        mut data: HashMap<String, Value>,
    ) -> Self {
        let id = id.into();
        if data.remove(EXPIRES_AT_KEY).is_some() {
            warn!("dropped reserved key {} from data of session {}", EXPIRES_AT_KEY, id);
        }
        Self {
            id,
            expires_at,
            data,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn data(&self) -> &HashMap<String, Value> {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Insert or replace a value, returning the previous one.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> SessionResult<Option<Value>> {
        let key = key.into();
        if key == EXPIRES_AT_KEY {
            return Err(SessionError::ReservedKey(key));
        }
        Ok(self.data.insert(key, value.into()))
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// True once the current time is past `expires_at`.
    pub fn does_expire(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Last instant RFC 3339 can write with a four-digit year.
fn latest_expiry() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_nano_opt(23, 59, 59, 999_999_999))
        .map_or(DateTime::<Utc>::MAX_UTC, |dt| dt.and_utc())
}

/// `now + ttl`, saturating at the end of year 9999 so every expiry can be
/// written to and read back from a session file.
pub(crate) fn expiry_from_now(ttl: TimeDelta) -> DateTime<Utc> {
    let latest = latest_expiry();
    Utc::now()
        .checked_add_signed(ttl)
        .map_or(latest, |at| at.min(latest))
}

#[cfg(test)]
mod tests;
