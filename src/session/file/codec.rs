//! Line-oriented text encoding for session files.
//!
//! ```text
//! expiresAt:2024-05-01T12:00:00.000000000Z
//! count:2
//! name:alice
//! ```
//!
//! The expiry line always comes first. Every other line is `key:value`,
//! split on the first delimiter, so values may contain `:` but keys may not.
//! All values are read back as `Value::Str`.

use crate::session::types::{EXPIRES_AT_KEY, Session, Value};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::warn;

pub const DELIMITER: char = ':';

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let ts = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Malformed {} timestamp: {:?}", EXPIRES_AT_KEY, raw))?;
    Ok(ts.with_timezone(&Utc))
}

/// Render a session as file content. Fails without partial output if any
/// entry cannot be represented as a `key:value` line.
pub fn encode(session: &Session) -> Result<String> {
    let mut keys: Vec<&String> = session.data().keys().collect();
    keys.sort();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}{}{}",
        EXPIRES_AT_KEY,
        DELIMITER,
        format_timestamp(session.expires_at())
    );

    for key in keys {
        if key.contains(DELIMITER) || key.contains(['\n', '\r']) {
            bail!(
                "Session {} key {:?} cannot contain '{}' or line breaks",
                session.id(),
                key,
                DELIMITER
            );
        }
        let Some(text) = session.data().get(key.as_str()).and_then(Value::to_text) else {
            bail!(
                "Session {} value for key {:?} has no text form (memory backend only)",
                session.id(),
                key
            );
        };
        if text.contains(['\n', '\r']) {
            bail!(
                "Session {} value for key {:?} cannot contain line breaks",
                session.id(),
                key
            );
        }
        let _ = writeln!(out, "{}{}{}", key, DELIMITER, text);
    }

    Ok(out)
}

/// Parse file content back into a session.
///
/// Lines without a delimiter are skipped and later duplicates win. A record
/// with no expiry line decodes as already expired.
pub fn decode(id: &str, content: &str) -> Result<Session> {
    let mut expires_at = None;
    let mut data = HashMap::new();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(DELIMITER) else {
            continue;
        };
        if key == EXPIRES_AT_KEY {
            expires_at = Some(parse_timestamp(value)?);
            continue;
        }
        data.insert(key.to_string(), Value::Str(value.to_string()));
    }

    let expires_at = expires_at.unwrap_or_else(|| {
        warn!("session file {} has no {} line, treating as expired", id, EXPIRES_AT_KEY);
        DateTime::<Utc>::UNIX_EPOCH
    });

    Ok(Session::new(id, expires_at, data))
}
