mod api;
mod classifier;

pub use api::ApiError;
pub use classifier::{ErrorClass, classify, is_feature_not_supported};

use crate::locality::LocalityError;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Tag: unique identifier for an error.
pub enum Tag {
    /// InvalidId: the stored id does not follow `SCOPE/UUID(/SUBPATH)*`.
    InvalidId,
    /// NotFound: the entity is absent.
    NotFound,
    /// Conflict: another mutation is in progress, retried by the conflict harness.
    Conflict,
    Forbidden,
    Unauthorized,
    RateLimited,
    Transient,
    /// Permanent: the cloud refused the request for a reason retrying won't fix.
    Permanent,
    /// Validation: a field value was rejected, either locally or by the cloud.
    Validation,
    /// BadTerminalState: a wait ended on an error status.
    BadTerminalState,
    DeadlineExceeded,
    /// Ambiguous: a lookup by name matched more than one entity.
    Ambiguous,
    Cancelled,
    InvalidConfiguration,
    /// Internal: the cloud returned something which should never happen.
    Internal,
}

/// ProviderError: error surfaced to the host for a resource or data source operation.
#[derive(Clone, Debug, Error, PartialEq)]
pub struct ProviderError {
    tag: Tag,
    resource_kind: Option<String>,
    scoped_id: Option<String>,
    /// message: user facing message, never contains secrets.
    message: String,
    /// observed_status: raw cloud status when a wait ended on a bad status.
    observed_status: Option<String>,
    #[source]
    cloud_error: Option<ApiError>,
}

impl ProviderError {
    fn new(tag: Tag, message: String, cloud_error: Option<ApiError>) -> Self {
        ProviderError {
            tag,
            resource_kind: None,
            scoped_id: None,
            message,
            observed_status: None,
            cloud_error,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn resource_kind(&self) -> Option<&str> {
        self.resource_kind.as_deref()
    }

    pub fn scoped_id(&self) -> Option<&str> {
        self.scoped_id.as_deref()
    }

    pub fn observed_status(&self) -> Option<&str> {
        self.observed_status.as_deref()
    }

    pub fn cloud_error(&self) -> Option<&ApiError> {
        self.cloud_error.as_ref()
    }

    pub fn is_not_found(&self) -> bool {
        self.tag == Tag::NotFound
    }

    /// Attaches the resource the error happened on, keeping what was already set.
    pub fn with_resource(mut self, resource_kind: &str, scoped_id: Option<&str>) -> Self {
        if self.resource_kind.is_none() {
            self.resource_kind = Some(resource_kind.to_string());
        }
        if self.scoped_id.is_none() {
            self.scoped_id = scoped_id.filter(|id| !id.is_empty()).map(|id| id.to_string());
        }
        self
    }

    /// Creates new error from a failed API call, the tag is derived from the error class.
    ///
    /// Arguments:
    ///
    /// * `cloud_error`: raw API error.
    pub fn new_from_api(cloud_error: ApiError) -> Self {
        let tag = match classify(&cloud_error) {
            ErrorClass::NotFound => Tag::NotFound,
            ErrorClass::Conflict => Tag::Conflict,
            ErrorClass::Forbidden if cloud_error.status == Some(401) => Tag::Unauthorized,
            ErrorClass::Forbidden => Tag::Forbidden,
            ErrorClass::RateLimited => Tag::RateLimited,
            ErrorClass::Transient => Tag::Transient,
            ErrorClass::Permanent if !cloud_error.fields.is_empty() => Tag::Validation,
            ErrorClass::Permanent => Tag::Permanent,
        };

        let message = match tag {
            Tag::Validation => format!("Invalid value for field(s) {}.", cloud_error.fields.join(", ")),
            Tag::Unauthorized | Tag::Forbidden => {
                "Access denied, check the configured access key, secret key and project.".to_string()
            }
            _ => "Error while calling the Scaleway API.".to_string(),
        };

        ProviderError::new(tag, message, Some(cloud_error))
    }

    pub fn new_invalid_id(raw_id: &str, reason: &str) -> Self {
        let mut err = ProviderError::new(Tag::InvalidId, format!("Invalid id `{raw_id}`: {reason}."), None);
        err.scoped_id = Some(raw_id.to_string());
        err
    }

    pub fn new_not_found(what: &str) -> Self {
        ProviderError::new(Tag::NotFound, format!("{what} not found."), None)
    }

    /// Creates new validation error naming the offending field.
    ///
    /// Arguments:
    ///
    /// * `field`: attribute name as declared in the schema.
    /// * `message`: what is wrong, shown to the user as is.
    pub fn new_validation(field: &str, message: &str) -> Self {
        let mut err = ProviderError::new(Tag::Validation, message.to_string(), None);
        if !message.contains(field) {
            err.message = format!("{field}: {message}");
        }
        err
    }

    pub fn new_bad_terminal_state(status: &str) -> Self {
        let mut err = ProviderError::new(
            Tag::BadTerminalState,
            format!("Resource ended in status `{status}`."),
            None,
        );
        err.observed_status = Some(status.to_string());
        err
    }

    pub fn new_deadline_exceeded(timeout: Duration) -> Self {
        ProviderError::new(
            Tag::DeadlineExceeded,
            format!("Operation did not complete within {}.", crate::unit_conversion::render_duration(timeout)),
            None,
        )
    }

    pub fn new_ambiguous(what: &str, name: &str, matches: usize) -> Self {
        ProviderError::new(
            Tag::Ambiguous,
            format!("{matches} {what}s named `{name}` found, refine the lookup with an id."),
            None,
        )
    }

    pub fn new_cancelled() -> Self {
        ProviderError::new(Tag::Cancelled, "Operation cancelled.".to_string(), None)
    }

    pub fn new_invalid_configuration(message: &str) -> Self {
        ProviderError::new(Tag::InvalidConfiguration, message.to_string(), None)
    }

    pub fn new_internal(message: &str) -> Self {
        ProviderError::new(Tag::Internal, message.to_string(), None)
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(kind) = &self.resource_kind {
            match &self.scoped_id {
                Some(id) => write!(f, "{kind} `{id}`: ")?,
                None => write!(f, "{kind}: ")?,
            }
        }
        f.write_str(&self.message)?;
        if let Some(cloud_error) = &self.cloud_error {
            write!(f, " / Cloud error: {cloud_error}")?;
        }
        Ok(())
    }
}

impl From<ApiError> for ProviderError {
    fn from(cloud_error: ApiError) -> Self {
        ProviderError::new_from_api(cloud_error)
    }
}

impl From<LocalityError> for ProviderError {
    fn from(err: LocalityError) -> Self {
        match err {
            LocalityError::InvalidId { raw_id, reason } => ProviderError::new_invalid_id(&raw_id, &reason),
            LocalityError::UnknownRegion(_) | LocalityError::UnknownZone(_) | LocalityError::UnknownScope(_) => {
                ProviderError::new_validation("region", &err.to_string())
            }
        }
    }
}
