//! Application database configuration (`database.yml`)
//!
//! The application reads its primary connection from one environment
//! section of a YAML document:
//!
//! ```yaml
//! production:
//!   adapter: postgresql
//!   host: 203.0.113.1
//!   port: 5432
//!   username: root
//!   password: smartvm
//!   database: vmdb_production
//! ```
//!
//! Key mapping: `username` ↔ user, `database` ↔ dbname. Only the connection
//! keys are rewritten; other sections and unrelated keys are preserved.
//! Every rewrite first copies the current file to
//! `database.yml_<dd-Month-YYYY_HH.MM.SS>`.
//!
//! The rewrite goes through `serde_yaml::Value`, which resolves aliases on
//! parse. Anchors are not written back: a `<<: *base` merge key comes out as
//! `<<:` followed by an inline copy of the base keys, and comments are lost.
//! The merged values are unchanged; the backup keeps the original layout.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde_yaml::{Mapping, Value};

use super::atomic::AtomicFile;
use super::errors::{StoreError, StoreResult};
use crate::failover::{ConnectionParams, FailoverResult, PrimaryConfigStore};

const BACKUP_TIMESTAMP_FORMAT: &str = "%d-%B-%Y_%H.%M.%S";

/// File-backed primary config store.
#[derive(Debug, Clone)]
pub struct DatabaseYml {
    file: AtomicFile,
    environment: String,
}

impl DatabaseYml {
    pub fn new(path: impl Into<PathBuf>, environment: impl Into<String>) -> Self {
        Self {
            file: AtomicFile::new(path),
            environment: environment.into(),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Connection parameters of the configured environment.
    pub fn pg_params(&self) -> StoreResult<ConnectionParams> {
        let mut document = self.load()?;
        // `<<: *base` style inheritance applies when reading only.
        document.apply_merge().map_err(|e| self.malformed(e.to_string()))?;

        let section = self.section(&document)?;

        let host = scalar(section, "host").ok_or_else(|| self.missing("host"))?;
        let user = scalar(section, "username").ok_or_else(|| self.missing("username"))?;
        let dbname = scalar(section, "database").ok_or_else(|| self.missing("database"))?;

        let port = scalar(section, "port")
            .map(|p| {
                p.parse::<u16>()
                    .map_err(|_| self.malformed(format!("invalid port '{}'", p)))
            })
            .transpose()?;

        Ok(ConnectionParams {
            host,
            user,
            dbname,
            port,
            password: scalar(section, "password"),
        })
    }

    /// Point the environment at `params`. Returns the backup path.
    pub fn update(&self, params: &ConnectionParams) -> StoreResult<PathBuf> {
        let mut document = self.load()?;

        let section = document
            .as_mapping_mut()
            .and_then(|root| root.get_mut(self.environment.as_str()))
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| StoreError::MissingSection {
                path: self.path().to_path_buf(),
                environment: self.environment.clone(),
            })?;

        set_or_remove(section, "host", Some(Value::String(params.host.clone())));
        set_or_remove(section, "port", params.port.map(|p| Value::Number(p.into())));
        set_or_remove(section, "username", Some(Value::String(params.user.clone())));
        set_or_remove(section, "password", params.password.clone().map(Value::String));
        set_or_remove(section, "database", Some(Value::String(params.dbname.clone())));

        let content = serde_yaml::to_string(&document)?;

        let backup = self
            .file
            .backup(&Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string())?;
        self.file.write(&content)?;

        Ok(backup)
    }

    fn load(&self) -> StoreResult<Value> {
        let content = self
            .file
            .read()?
            .ok_or_else(|| StoreError::NotFound(self.path().to_path_buf()))?;

        let document: Value =
            serde_yaml::from_str(&content).map_err(|e| self.malformed(e.to_string()))?;

        if !document.is_mapping() {
            return Err(self.malformed("top level is not a mapping".to_string()));
        }
        Ok(document)
    }

    fn section<'d>(&self, document: &'d Value) -> StoreResult<&'d Mapping> {
        document
            .get(self.environment.as_str())
            .and_then(Value::as_mapping)
            .ok_or_else(|| StoreError::MissingSection {
                path: self.path().to_path_buf(),
                environment: self.environment.clone(),
            })
    }

    fn missing(&self, field: &'static str) -> StoreError {
        StoreError::MissingField {
            path: self.path().to_path_buf(),
            field,
        }
    }

    fn malformed(&self, reason: String) -> StoreError {
        StoreError::Malformed {
            path: self.path().to_path_buf(),
            reason,
        }
    }
}

impl PrimaryConfigStore for DatabaseYml {
    fn read(&self) -> FailoverResult<ConnectionParams> {
        Ok(self.pg_params()?)
    }

    fn write(&self, params: &ConnectionParams) -> FailoverResult<()> {
        self.update(params)?;
        Ok(())
    }
}

/// Non-empty scalar as a string.
fn scalar(section: &Mapping, key: &str) -> Option<String> {
    let value = match section.get(key)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    Some(value).filter(|v| !v.trim().is_empty())
}

fn set_or_remove(section: &mut Mapping, key: &str, value: Option<Value>) {
    match value {
        Some(Value::String(s)) if s.trim().is_empty() => {
            section.remove(key);
        }
        Some(value) => {
            section.insert(Value::String(key.to_string()), value);
        }
        None => {
            section.remove(key);
        }
    }
}
