use super::*;
use crate::{lifecycle::notify_best_effort, storage::IssuePipeline};
use tracing::{error, info};

/// Records the pipeline an issue was moved to and lets the lifecycle manager
/// know about the issue.
pub struct PipelineHandler<'a> {
    event: &'a WebhookEvent,
    state: &'a State,
}

#[async_trait::async_trait]
impl<'a> Handler<'a> for PipelineHandler<'a> {
    fn new(event: &'a WebhookEvent, state: &'a State) -> Self {
        Self { event, state }
    }

    async fn execute(&self) {
        let event = self.event;
        let cache = self.state.cache.as_ref();

        let org = match cache.read_org(&event.organization).await {
            Ok(Some(org)) => org,
            Ok(None) => {
                error!("Organization {} was not found", event.organization);
                return;
            }
            Err(err) => {
                error!(
                    "Unable to get info on organization {}. Error: {}",
                    event.organization, err
                );
                return;
            }
        };

        let repo = match cache.read_repo(&org.login, &event.repo).await {
            Ok(Some(repo)) => repo,
            Ok(None) => {
                error!("Repo {}/{} was not found", org.login, event.repo);
                return;
            }
            Err(err) => {
                error!(
                    "Unable to get info on repo {}/{}. Error: {}",
                    org.login, event.repo, err
                );
                return;
            }
        };

        // Identifiers come from the cache, never from the raw form values.
        let pipeline = IssuePipeline {
            org_login: repo.org_login.clone(),
            repo_name: repo.name.clone(),
            issue_number: event.issue_number,
            pipeline: event.to_pipeline_name.clone(),
        };

        match self.state.store.write_issue_pipelines(&[pipeline]).await {
            Ok(()) => info!(
                "Issue #{} in {}/{} is now in pipeline `{}`",
                event.issue_number, repo.org_login, repo.name, event.to_pipeline_name
            ),
            Err(err) => error!("Unable to write pipeline to storage. Error: {}", err),
        }

        let issue = match cache
            .read_issue(&repo.org_login, &repo.name, event.issue_number)
            .await
        {
            Ok(issue) => issue,
            Err(err) => {
                error!(
                    "Unable to read information on issue #{} in repo {}/{}. Error: {}",
                    event.issue_number, repo.org_login, repo.name, err
                );
                None
            }
        };

        notify_best_effort(self.state.lifecycler.as_ref(), issue.as_ref()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_utils::{Call, Lookup, RecordingBackend};
    use std::sync::Arc;

    fn event(organization: &str, repo: &str, issue_number: i64) -> WebhookEvent {
        WebhookEvent {
            kind: EventKind::IssueTransfer,
            organization: String::from(organization),
            repo: String::from(repo),
            issue_number,
            to_pipeline_name: String::from("Done"),
        }
    }

    async fn run(backend: RecordingBackend, event: &WebhookEvent) -> Vec<Call> {
        let backend = Arc::new(backend);
        let state = backend.state();
        PipelineHandler::new(event, &state).execute().await;
        backend.calls()
    }

    #[actix_web::test]
    async fn test_writes_canonical_identifiers() {
        let backend = RecordingBackend::resolving("istio", "bots");

        let calls = run(backend, &event("Istio", "Bots", 42)).await;

        assert_eq!(
            calls,
            vec![
                Call::ReadOrg(String::from("Istio")),
                Call::ReadRepo(String::from("istio"), String::from("Bots")),
                Call::Write(vec![IssuePipeline {
                    org_login: String::from("istio"),
                    repo_name: String::from("bots"),
                    issue_number: 42,
                    pipeline: String::from("Done"),
                }]),
                Call::ReadIssue(String::from("istio"), String::from("bots"), 42),
                Call::ManageIssue(Some(42)),
            ]
        );
    }

    #[actix_web::test]
    async fn test_missing_organization_aborts() {
        let backend = RecordingBackend::resolving("istio", "bots").with_org(Lookup::Missing);

        let calls = run(backend, &event("Istio", "Bots", 42)).await;

        assert_eq!(calls, vec![Call::ReadOrg(String::from("Istio"))]);
    }

    #[actix_web::test]
    async fn test_organization_error_aborts() {
        let backend = RecordingBackend::resolving("istio", "bots").with_org(Lookup::Fail);

        let calls = run(backend, &event("Istio", "Bots", 42)).await;

        assert_eq!(calls, vec![Call::ReadOrg(String::from("Istio"))]);
    }

    #[actix_web::test]
    async fn test_missing_or_failing_repository_aborts() {
        for lookup in [Lookup::Missing, Lookup::Fail] {
            let backend = RecordingBackend::resolving("istio", "bots").with_repo(lookup);

            let calls = run(backend, &event("Istio", "Bots", 42)).await;

            assert_eq!(calls.len(), 2);
            assert!(!calls.iter().any(|call| matches!(call, Call::Write(_))));
            assert!(!calls.iter().any(|call| matches!(call, Call::ManageIssue(_))));
        }
    }

    #[actix_web::test]
    async fn test_write_failure_still_notifies_lifecycle() {
        let backend = RecordingBackend::resolving("istio", "bots").failing_writes();

        let calls = run(backend, &event("istio", "bots", 42)).await;

        assert!(matches!(calls[2], Call::Write(_)));
        assert_eq!(
            calls[3..],
            [
                Call::ReadIssue(String::from("istio"), String::from("bots"), 42),
                Call::ManageIssue(Some(42)),
            ]
        );
    }

    #[actix_web::test]
    async fn test_issue_lookup_failure_notifies_without_issue() {
        let backend = RecordingBackend::resolving("istio", "bots").with_issue(Lookup::Fail);

        let calls = run(backend, &event("istio", "bots", 42)).await;

        assert_eq!(calls.last(), Some(&Call::ManageIssue(None)));
    }

    #[actix_web::test]
    async fn test_uncached_issue_notifies_without_issue() {
        let backend = RecordingBackend::resolving("istio", "bots").with_issue(Lookup::Missing);

        let calls = run(backend, &event("istio", "bots", 42)).await;

        assert_eq!(calls.len(), 5);
        assert_eq!(calls.last(), Some(&Call::ManageIssue(None)));
    }

    #[actix_web::test]
    async fn test_lifecycle_failure_is_ignored() {
        let backend = RecordingBackend::resolving("istio", "bots").failing_lifecycle();

        let calls = run(backend, &event("istio", "bots", 42)).await;

        assert_eq!(calls.len(), 5);
        assert_eq!(calls.last(), Some(&Call::ManageIssue(Some(42))));
    }
}
