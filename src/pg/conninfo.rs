//! libpq keyword/value connection strings
//!
//! repmgr stores each node's `conninfo` as `host=... user=... dbname=...`.
//! Values may be single-quoted; inside quotes and in bare values `\'` and
//! `\\` escape a quote and a backslash. URI-form conninfo is not accepted.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

use crate::failover::{ClusterNode, NodeRole};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConninfoError {
    #[error("missing '=' after \"{0}\"")]
    MissingEquals(String),

    #[error("unterminated quoted value for \"{0}\"")]
    UnterminatedQuote(String),

    #[error("conninfo has no \"{0}\"")]
    MissingKey(&'static str),

    #[error("invalid port \"{0}\"")]
    InvalidPort(String),
}

/// Parse a keyword/value conninfo string.
pub fn parse_conninfo(conninfo: &str) -> Result<BTreeMap<String, String>, ConninfoError> {
    let mut chars = conninfo.chars().peekable();
    let mut pairs = BTreeMap::new();

    loop {
        skip_whitespace(&mut chars);
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                break;
            }
            key.push(c);
            chars.next();
        }

        skip_whitespace(&mut chars);
        if chars.next() != Some('=') {
            return Err(ConninfoError::MissingEquals(key));
        }
        skip_whitespace(&mut chars);

        let value = if chars.peek() == Some(&'\'') {
            chars.next();
            quoted_value(&mut chars, &key)?
        } else {
            bare_value(&mut chars)
        };

        pairs.insert(key, value);
    }

    Ok(pairs)
}

/// Build a cluster member from one repmgr `nodes` row.
///
/// Rows whose role takes no part in failover (witness and the like) yield
/// `Ok(None)`.
pub fn node_from_repmgr(
    role: &str,
    conninfo: &str,
    active: bool,
) -> Result<Option<ClusterNode>, ConninfoError> {
    let Some(role) = NodeRole::from_repmgr(role) else {
        return Ok(None);
    };

    let mut pairs = parse_conninfo(conninfo)?;
    let host = pairs
        .remove("host")
        .or_else(|| pairs.remove("hostaddr"))
        .ok_or(ConninfoError::MissingKey("host"))?;
    let user = pairs.remove("user").ok_or(ConninfoError::MissingKey("user"))?;
    let dbname = pairs
        .remove("dbname")
        .ok_or(ConninfoError::MissingKey("dbname"))?;
    let port = pairs
        .remove("port")
        .map(|p| p.parse::<u16>().map_err(|_| ConninfoError::InvalidPort(p)))
        .transpose()?;

    Ok(Some(ClusterNode {
        role,
        active,
        host,
        user,
        dbname,
        port,
    }))
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn quoted_value(chars: &mut Peekable<Chars<'_>>, key: &str) -> Result<String, ConninfoError> {
    let mut value = String::new();
    loop {
        match chars.next() {
            None => return Err(ConninfoError::UnterminatedQuote(key.to_string())),
            Some('\\') => match chars.next() {
                Some(c) => value.push(c),
                None => return Err(ConninfoError::UnterminatedQuote(key.to_string())),
            },
            Some('\'') => return Ok(value),
            Some(c) => value.push(c),
        }
    }
}

fn bare_value(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut value = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            break;
        }
        chars.next();
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(escaped);
            }
        } else {
            value.push(c);
        }
    }
    value
}
