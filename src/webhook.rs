use crate::{
    events::{pipeline::PipelineHandler, FormFields, Handler, WebhookEvent},
    State,
};
use actix_web::{post, web, HttpMessage, HttpRequest, HttpResponse};
use derive_more::{Display, Error};
use tracing::{debug, error, info, info_span, Instrument};

// The form body size limit is 10MiB
pub static WEBHOOK_SIZE_LIMIT: usize = 10 << 20;

pub static FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum WebhookError {
    #[display("Body size greater than the configured limit")]
    LargeBodySize,
    #[display("Failed to read the payload: {msg}")]
    PayloadRead { msg: String },
    #[display("Malformed form data: {msg}")]
    MalformedBody { msg: String },
    #[display("Issue number `{value}` is not an integer")]
    InvalidIssueNumber { value: String },
}

/// Receives ZenHub webhook calls.
///
/// ZenHub does not look at the response, so every call is answered with
/// `200 OK` and an empty body. Anything that goes wrong is only logged.
#[post("/zenhub/webhook/")]
pub async fn parse_event(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<State>,
) -> HttpResponse {
    let form = match read_form(&req, body, state.settings.body_size_limit).await {
        Ok(form) => form,
        Err(err) => {
            error!("Unable to parse ZenHub webhook data. Error: {}", err);
            return HttpResponse::Ok().finish();
        }
    };

    let span = info_span!("zenhub", event_type = form.get("type"));
    dispatch(&form, &state).instrument(span).await;

    HttpResponse::Ok().finish()
}

async fn dispatch(form: &FormFields, state: &State) {
    let event = match WebhookEvent::from_form(form, state.settings.strict_issue_number) {
        Ok(Some(event)) => event,
        Ok(None) => {
            debug!("Ignoring ZenHub event of type `{}`", form.get("type"));
            return;
        }
        Err(err) => {
            error!("Unable to parse ZenHub webhook data. Error: {}", err);
            return;
        }
    };

    info!("Received {} from ZenHub", event.kind);
    PipelineHandler::new(&event, state).execute().await;
}

/// Collects the form fields of a request.
///
/// The body is only read when it is form encoded; its fields come before
/// the ones from the query string.
pub async fn read_form(
    req: &HttpRequest,
    body: web::Payload,
    limit: usize,
) -> Result<FormFields, WebhookError> {
    let mut form = FormFields::default();

    if req.content_type().eq_ignore_ascii_case(FORM_CONTENT_TYPE) {
        let Ok(body) = body.to_bytes_limited(limit).await else {
            return Err(WebhookError::LargeBodySize);
        };
        let body = body.map_err(|err| WebhookError::PayloadRead {
            msg: err.to_string(),
        })?;
        form = decode_fields(&body)?;
    }

    form.extend(decode_fields(req.query_string().as_bytes())?);
    Ok(form)
}

fn decode_fields(raw: &[u8]) -> Result<FormFields, WebhookError> {
    let raw = std::str::from_utf8(raw).map_err(|_| WebhookError::MalformedBody {
        msg: String::from("form data is not valid UTF-8"),
    })?;

    check_encoding(raw)?;

    serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
        .map(FormFields)
        .map_err(|err| WebhookError::MalformedBody {
            msg: err.to_string(),
        })
}

/// Rejects `;` separators and `%` escapes that are not followed by two hex
/// digits, which the form decoder would otherwise pass through verbatim.
fn check_encoding(raw: &str) -> Result<(), WebhookError> {
    if raw.contains(';') {
        return Err(WebhookError::MalformedBody {
            msg: String::from("invalid semicolon separator"),
        });
    }

    let bytes = raw.as_bytes();
    for (pos, _) in raw.match_indices('%') {
        let valid = bytes
            .get(pos + 1..pos + 3)
            .is_some_and(|digits| digits.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            let end = raw.len().min(pos + 3);
            return Err(WebhookError::MalformedBody {
                msg: format!("invalid URL escape `{}`", raw.get(pos..end).unwrap_or("%")),
            });
        }
    }

    Ok(())
}
