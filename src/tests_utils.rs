//! This is a tests utility module, which contains the collaborator doubles and
//! helpers required for running tests.
//! See `tests` directory for more information

use crate::{
    config::WebhookSettings,
    lifecycle::{LifecycleError, LifecycleManager},
    storage::{Cache, Issue, IssuePipeline, Organization, Repository, StorageError, Store},
    State,
};
pub use crate::webhook::WebhookError;
pub use actix_web::http::StatusCode;
pub use actix_web::test;
use actix_web::{dev::ServiceResponse, web::Data, App};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::webhook::parse_event;

pub static WEBHOOK_ENDPOINT: &str = "/zenhub/webhook/";

/// A collaborator call, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ReadOrg(String),
    ReadRepo(String, String),
    ReadIssue(String, String, i64),
    Write(Vec<IssuePipeline>),
    /// Number of the issue handed over, `None` when there was none.
    ManageIssue(Option<i64>),
}

/// How a lookup on the [`RecordingBackend`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found,
    Missing,
    Fail,
}

/// Cache, store and lifecycle manager in one, recording every call.
///
/// Entities it finds always carry the canonical logins it was built with,
/// whatever casing they were requested in.
pub struct RecordingBackend {
    org_login: String,
    repo_name: String,
    org: Lookup,
    repo: Lookup,
    issue: Lookup,
    fail_writes: bool,
    fail_lifecycle: bool,
    calls: Mutex<Vec<Call>>,
}

impl RecordingBackend {
    pub fn resolving(org_login: &str, repo_name: &str) -> Self {
        Self {
            org_login: String::from(org_login),
            repo_name: String::from(repo_name),
            org: Lookup::Found,
            repo: Lookup::Found,
            issue: Lookup::Found,
            fail_writes: false,
            fail_lifecycle: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_org(mut self, lookup: Lookup) -> Self {
        self.org = lookup;
        self
    }

    pub fn with_repo(mut self, lookup: Lookup) -> Self {
        self.repo = lookup;
        self
    }

    pub fn with_issue(mut self, lookup: Lookup) -> Self {
        self.issue = lookup;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn failing_lifecycle(mut self) -> Self {
        self.fail_lifecycle = true;
        self
    }

    pub fn state(self: &Arc<Self>) -> State {
        self.state_with(WebhookSettings::default())
    }

    pub fn state_with(self: &Arc<Self>, settings: WebhookSettings) -> State {
        State::new(self.clone(), self.clone(), self.clone(), settings)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Every record handed to the store, failed writes included.
    pub fn written(&self) -> Vec<IssuePipeline> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Write(pipelines) => Some(pipelines),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn answer<T>(lookup: Lookup, found: impl FnOnce() -> T) -> Result<Option<T>, StorageError> {
        match lookup {
            Lookup::Found => Ok(Some(found())),
            Lookup::Missing => Ok(None),
            Lookup::Fail => Err(StorageError::Unavailable {
                msg: String::from("cache offline"),
            }),
        }
    }
}

#[async_trait]
impl Cache for RecordingBackend {
    async fn read_org(&self, login: &str) -> Result<Option<Organization>, StorageError> {
        self.record(Call::ReadOrg(String::from(login)));
        Self::answer(self.org, || Organization {
            login: self.org_login.clone(),
            name: String::new(),
        })
    }

    async fn read_repo(
        &self,
        org_login: &str,
        repo_name: &str,
    ) -> Result<Option<Repository>, StorageError> {
        self.record(Call::ReadRepo(
            String::from(org_login),
            String::from(repo_name),
        ));
        Self::answer(self.repo, || Repository {
            org_login: self.org_login.clone(),
            name: self.repo_name.clone(),
            description: String::new(),
        })
    }

    async fn read_issue(
        &self,
        org_login: &str,
        repo_name: &str,
        number: i64,
    ) -> Result<Option<Issue>, StorageError> {
        self.record(Call::ReadIssue(
            String::from(org_login),
            String::from(repo_name),
            number,
        ));
        Self::answer(self.issue, || Issue {
            org_login: self.org_login.clone(),
            repo_name: self.repo_name.clone(),
            number,
            title: String::new(),
            state: String::from("open"),
        })
    }
}

#[async_trait]
impl Store for RecordingBackend {
    async fn write_issue_pipelines(&self, pipelines: &[IssuePipeline]) -> Result<(), StorageError> {
        self.record(Call::Write(pipelines.to_vec()));
        if self.fail_writes {
            return Err(StorageError::WriteFailed {
                entity: String::from("issue pipelines"),
                msg: String::from("store offline"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LifecycleManager for RecordingBackend {
    async fn manage_issue(&self, issue: Option<&Issue>) -> Result<(), LifecycleError> {
        self.record(Call::ManageIssue(issue.map(|issue| issue.number)));
        if self.fail_lifecycle {
            return Err(LifecycleError::Failed {
                msg: String::from("lifecycle offline"),
            });
        }
        Ok(())
    }
}

pub async fn test_endpoint(req: test::TestRequest, state: State) -> ServiceResponse {
    let app =
        test::init_service(App::new().service(parse_event).app_data(Data::new(state))).await;
    test::call_service(&app, req.to_request()).await
}

/// Form body of a ZenHub event, in the field order ZenHub sends.
pub fn zenhub_form(
    kind: &str,
    organization: &str,
    repo: &str,
    issue_number: &str,
    to_pipeline_name: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("type", String::from(kind)),
        ("organization", String::from(organization)),
        ("repo", String::from(repo)),
        ("issue_number", String::from(issue_number)),
        ("to_pipeline_name", String::from(to_pipeline_name)),
    ]
}
