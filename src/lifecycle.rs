use crate::storage::Issue;
use async_trait::async_trait;
use derive_more::{Display, Error};
use tracing::{debug, info};

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[display("No issue was available to manage")]
    MissingIssue,
    #[display("Failed to manage issue: {msg}")]
    Failed { msg: String },
}

/// Follow-up processing for an issue whose pipeline changed.
///
/// The issue may be `None` when it could not be read or is not cached yet.
#[async_trait]
pub trait LifecycleManager: Send + Sync {
    async fn manage_issue(&self, issue: Option<&Issue>) -> Result<(), LifecycleError>;
}

/// Hands the issue to the lifecycle manager without letting the outcome
/// influence the caller. A failure only shows up at debug level.
pub async fn notify_best_effort(manager: &dyn LifecycleManager, issue: Option<&Issue>) {
    if let Err(err) = manager.manage_issue(issue).await {
        debug!("Lifecycle manager did not handle the issue, ignoring. Error: {}", err);
    }
}

/// Records lifecycle notifications in the trace output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLifecycleManager;

#[async_trait]
impl LifecycleManager for TracingLifecycleManager {
    async fn manage_issue(&self, issue: Option<&Issue>) -> Result<(), LifecycleError> {
        let Some(issue) = issue else {
            return Err(LifecycleError::MissingIssue);
        };

        info!(
            "Managing issue #{} in {}/{} (state: {})",
            issue.number, issue.org_login, issue.repo_name, issue.state
        );
        Ok(())
    }
}
