//! Entities resolved while handling ZenHub events and the collaborators that
//! hold them.
//!
//! Both [`Cache`] and [`Store`] are shared between concurrent requests, so
//! implementations must be safe for concurrent use.

use async_trait::async_trait;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

pub mod memory;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[display("Backend unavailable: {msg}")]
    Unavailable { msg: String },
    #[display("Failed to write {entity}: {msg}")]
    WriteFailed { entity: String, msg: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub login: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub org_login: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub org_login: String,
    pub repo_name: String,
    pub number: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: String,
}

/// The pipeline an issue currently sits in on the ZenHub board.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IssuePipeline {
    pub org_login: String,
    pub repo_name: String,
    pub issue_number: i64,
    pub pipeline: String,
}

/// Read-through lookup of organizations, repositories and issues.
///
/// Lookups return `Ok(None)` when the entity is unknown. Keys may be given in
/// any casing; the returned entity always carries the canonical identifiers,
/// and callers are expected to use those for anything they derive from it.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn read_org(&self, login: &str) -> Result<Option<Organization>, StorageError>;

    async fn read_repo(
        &self,
        org_login: &str,
        repo_name: &str,
    ) -> Result<Option<Repository>, StorageError>;

    async fn read_issue(
        &self,
        org_login: &str,
        repo_name: &str,
        number: i64,
    ) -> Result<Option<Issue>, StorageError>;
}

/// Durable storage for pipeline assignments.
#[async_trait]
pub trait Store: Send + Sync {
    async fn write_issue_pipelines(&self, pipelines: &[IssuePipeline]) -> Result<(), StorageError>;
}
