use crate::{webhook::WebhookError, State};
use derive_more::Display;
use tracing::warn;

pub mod pipeline;

#[async_trait::async_trait]
pub trait Handler<'a> {
    fn new(event: &'a WebhookEvent, state: &'a State) -> Self;

    async fn execute(&self);
}

/// ZenHub event types that move an issue between pipelines.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    #[display("issue_transfer")]
    IssueTransfer,
    #[display("issue_reprioritized")]
    IssueReprioritized,
}

impl EventKind {
    /// `None` for every event type this service does not handle.
    pub fn from_type(value: &str) -> Option<Self> {
        match value {
            "issue_transfer" => Some(Self::IssueTransfer),
            "issue_reprioritized" => Some(Self::IssueReprioritized),
            _ => None,
        }
    }
}

/// Decoded form fields. Keys may repeat; the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(pub Vec<(String, String)>);

impl FormFields {
    /// Value for `key`, or the empty string when it is absent.
    pub fn get(&self, key: &str) -> &str {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or_default()
    }

    /// Appends the fields of `other` behind the current ones, so on duplicate
    /// keys `self` keeps precedence.
    pub fn extend(&mut self, other: FormFields) {
        self.0.extend(other.0);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub kind: EventKind,
    pub organization: String,
    pub repo: String,
    pub issue_number: i64,
    pub to_pipeline_name: String,
}

impl WebhookEvent {
    /// Builds an event out of the webhook form.
    ///
    /// Returns `Ok(None)` for event types that are not handled. An
    /// `issue_number` that is not an integer becomes `0` unless
    /// `strict_issue_number` is set, in which case the event is rejected.
    pub fn from_form(
        form: &FormFields,
        strict_issue_number: bool,
    ) -> Result<Option<Self>, WebhookError> {
        let Some(kind) = EventKind::from_type(form.get("type")) else {
            return Ok(None);
        };

        let raw_number = form.get("issue_number");
        let issue_number = match raw_number.parse::<i64>() {
            Ok(number) => number,
            Err(_) if strict_issue_number => {
                return Err(WebhookError::InvalidIssueNumber {
                    value: raw_number.to_owned(),
                });
            }
            Err(_) => {
                warn!(
                    "Issue number `{}` in {} event is not an integer, using 0",
                    raw_number, kind
                );
                0
            }
        };

        Ok(Some(Self {
            kind,
            organization: form.get("organization").to_owned(),
            repo: form.get("repo").to_owned(),
            issue_number,
            to_pipeline_name: form.get("to_pipeline_name").to_owned(),
        }))
    }
}
