use super::{Cache, Issue, IssuePipeline, Organization, Repository, StorageError, Store};
use crate::config::Seed;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

type RepoKey = (String, String);
type IssueKey = (String, String, i64);

fn fold(value: &str) -> String {
    value.to_lowercase()
}

fn repo_key(org_login: &str, repo_name: &str) -> RepoKey {
    (fold(org_login), fold(repo_name))
}

fn issue_key(org_login: &str, repo_name: &str, number: i64) -> IssueKey {
    (fold(org_login), fold(repo_name), number)
}

/// Keeps every entity in process memory.
///
/// Lookups ignore case and hand back the entity as it was seeded, which is
/// how canonical logins and repository names reach the pipeline writer.
#[derive(Debug, Default)]
pub struct MemoryStore {
    orgs: RwLock<HashMap<String, Organization>>,
    repos: RwLock<HashMap<RepoKey, Repository>>,
    issues: RwLock<HashMap<IssueKey, Issue>>,
    pipelines: RwLock<HashMap<IssueKey, IssuePipeline>>,
}

impl MemoryStore {
    pub fn from_seed(seed: &Seed) -> Self {
        let mut orgs = HashMap::new();
        for org in &seed.organizations {
            orgs.insert(fold(&org.login), org.clone());
        }

        let mut repos = HashMap::new();
        for repo in &seed.repositories {
            if !orgs.contains_key(&fold(&repo.org_login)) {
                warn!(
                    "Skipping repository {}/{}: organization is not known",
                    repo.org_login, repo.name
                );
                continue;
            }
            repos.insert(repo_key(&repo.org_login, &repo.name), repo.clone());
        }

        let mut issues = HashMap::new();
        for issue in &seed.issues {
            if !repos.contains_key(&repo_key(&issue.org_login, &issue.repo_name)) {
                warn!(
                    "Skipping issue #{} in {}/{}: repository is not known",
                    issue.number, issue.org_login, issue.repo_name
                );
                continue;
            }
            issues.insert(
                issue_key(&issue.org_login, &issue.repo_name, issue.number),
                issue.clone(),
            );
        }

        debug!(
            "Seeded in-memory store with {} organizations, {} repositories and {} issues",
            orgs.len(),
            repos.len(),
            issues.len()
        );

        Self {
            orgs: RwLock::new(orgs),
            repos: RwLock::new(repos),
            issues: RwLock::new(issues),
            pipelines: RwLock::default(),
        }
    }

    /// Latest pipeline written for the given issue, if any.
    pub async fn issue_pipeline(
        &self,
        org_login: &str,
        repo_name: &str,
        number: i64,
    ) -> Option<IssuePipeline> {
        self.pipelines
            .read()
            .await
            .get(&issue_key(org_login, repo_name, number))
            .cloned()
    }

    pub async fn issue_pipelines(&self) -> Vec<IssuePipeline> {
        self.pipelines.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl Cache for MemoryStore {
    async fn read_org(&self, login: &str) -> Result<Option<Organization>, StorageError> {
        Ok(self.orgs.read().await.get(&fold(login)).cloned())
    }

    async fn read_repo(
        &self,
        org_login: &str,
        repo_name: &str,
    ) -> Result<Option<Repository>, StorageError> {
        Ok(self
            .repos
            .read()
            .await
            .get(&repo_key(org_login, repo_name))
            .cloned())
    }

    async fn read_issue(
        &self,
        org_login: &str,
        repo_name: &str,
        number: i64,
    ) -> Result<Option<Issue>, StorageError> {
        Ok(self
            .issues
            .read()
            .await
            .get(&issue_key(org_login, repo_name, number))
            .cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn write_issue_pipelines(&self, pipelines: &[IssuePipeline]) -> Result<(), StorageError> {
        let mut stored = self.pipelines.write().await;
        for pipeline in pipelines {
            stored.insert(
                issue_key(&pipeline.org_login, &pipeline.repo_name, pipeline.issue_number),
                pipeline.clone(),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> Seed {
        Seed {
            organizations: vec![Organization {
                login: String::from("istio"),
                name: String::from("Istio"),
            }],
            repositories: vec![
                Repository {
                    org_login: String::from("istio"),
                    name: String::from("bots"),
                    description: String::new(),
                },
                Repository {
                    org_login: String::from("envoyproxy"),
                    name: String::from("envoy"),
                    description: String::new(),
                },
            ],
            issues: vec![
                Issue {
                    org_login: String::from("istio"),
                    repo_name: String::from("bots"),
                    number: 42,
                    title: String::from("Flaky test"),
                    state: String::from("open"),
                },
                Issue {
                    org_login: String::from("istio"),
                    repo_name: String::from("istio"),
                    number: 7,
                    title: String::new(),
                    state: String::new(),
                },
            ],
        }
    }

    #[actix_web::test]
    async fn test_lookup_returns_canonical_entities() {
        let store = MemoryStore::from_seed(&seed());

        let org = store.read_org("Istio").await.unwrap().unwrap();
        assert_eq!(org.login, "istio");

        let repo = store.read_repo("ISTIO", "Bots").await.unwrap().unwrap();
        assert_eq!((repo.org_login.as_str(), repo.name.as_str()), ("istio", "bots"));

        let issue = store.read_issue("istio", "BOTS", 42).await.unwrap().unwrap();
        assert_eq!(issue.title, "Flaky test");
    }

    #[actix_web::test]
    async fn test_unknown_entities_are_absent() {
        let store = MemoryStore::from_seed(&seed());

        assert_eq!(store.read_org("kubernetes").await, Ok(None));
        assert_eq!(store.read_repo("istio", "proxy").await, Ok(None));
        assert_eq!(store.read_issue("istio", "bots", 43).await, Ok(None));
    }

    #[actix_web::test]
    async fn test_seed_skips_orphans() {
        let store = MemoryStore::from_seed(&seed());

        assert_eq!(store.read_repo("envoyproxy", "envoy").await, Ok(None));
        assert_eq!(store.read_issue("istio", "istio", 7).await, Ok(None));
    }

    #[actix_web::test]
    async fn test_latest_pipeline_write_wins() {
        let store = MemoryStore::from_seed(&seed());
        let pipeline = |name: &str| IssuePipeline {
            org_login: String::from("istio"),
            repo_name: String::from("bots"),
            issue_number: 42,
            pipeline: String::from(name),
        };

        store
            .write_issue_pipelines(&[pipeline("Backlog")])
            .await
            .unwrap();
        store
            .write_issue_pipelines(&[pipeline("Done")])
            .await
            .unwrap();

        assert_eq!(store.issue_pipelines().await.len(), 1);
        assert_eq!(
            store.issue_pipeline("Istio", "Bots", 42).await,
            Some(pipeline("Done"))
        );
    }
}
