use serde_derive::Deserialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// ApiError: error as returned by the Scaleway API, or by the transport when no response was received.
#[derive(Clone, Debug, Error, PartialEq, Eq, Default)]
pub struct ApiError {
    /// status: HTTP status code, `None` when the request never got a response (dns, tls, reset connection).
    pub status: Option<u16>,
    /// error_type: machine readable error code (`not_found`, `transient_state`, `invalid_arguments`, ...).
    pub error_type: Option<String>,
    pub message: String,
    /// fields: request fields the API blamed for a rejected body.
    pub fields: Vec<String>,
    pub resource: Option<String>,
}

#[derive(Deserialize, Default)]
struct ScwErrorBody {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: Option<String>,
    resource: Option<String>,
    #[serde(default)]
    details: Vec<ScwErrorDetail>,
    #[serde(default)]
    fields: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize)]
struct ScwErrorDetail {
    argument_name: Option<String>,
    reason: Option<String>,
    help_message: Option<String>,
}

impl ApiError {
    pub fn new(status: u16, error_type: Option<&str>, message: &str) -> Self {
        ApiError {
            status: Some(status),
            error_type: error_type.map(|t| t.to_string()),
            message: message.to_string(),
            fields: vec![],
            resource: None,
        }
    }

    /// No response was received at all.
    pub fn new_transport(message: &str) -> Self {
        ApiError {
            message: message.to_string(),
            ..Default::default()
        }
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    /// Builds the error from an HTTP status and the raw response body. Bodies which are not
    /// the usual Scaleway error document are kept verbatim as the message.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ScwErrorBody = match serde_json::from_str(body) {
            Ok(parsed) => parsed,
            Err(_) => {
                return ApiError {
                    status: Some(status),
                    message: body.trim().to_string(),
                    ..Default::default()
                };
            }
        };

        let mut fields: Vec<String> = parsed.details.iter().filter_map(|d| d.argument_name.clone()).collect();
        fields.extend(parsed.fields.keys().cloned());

        let mut message = parsed.message.unwrap_or_default();
        let reasons: Vec<String> = parsed
            .details
            .iter()
            .filter_map(|d| match (&d.argument_name, d.help_message.as_ref().or(d.reason.as_ref())) {
                (Some(arg), Some(help)) => Some(format!("{arg}: {help}")),
                _ => None,
            })
            .collect();
        if !reasons.is_empty() {
            message = format!("{message} ({})", reasons.join(", "));
        }

        ApiError {
            status: Some(status),
            error_type: parsed.error_type,
            message,
            fields,
            resource: parsed.resource,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.status, &self.error_type) {
            (Some(status), Some(error_type)) => write!(f, "scaleway error {status} ({error_type}): {}", self.message),
            (Some(status), None) => write!(f, "scaleway error {status}: {}", self.message),
            (None, _) => write!(f, "transport error: {}", self.message),
        }
    }
}
