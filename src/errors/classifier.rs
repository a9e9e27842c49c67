use crate::errors::ApiError;

/// ErrorClass: what a caller may do with a failed API call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    /// Another mutation is in progress on the entity or its parent.
    Conflict,
    Forbidden,
    RateLimited,
    Permanent,
    /// Network failure or 5xx, retrying the same call may succeed.
    Transient,
}

impl ErrorClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::Transient | ErrorClass::RateLimited)
    }
}

/// Looks at the status code and the error type only, never at the message.
pub fn classify(err: &ApiError) -> ErrorClass {
    let status = match err.status {
        Some(status) => status,
        None => return ErrorClass::Transient,
    };

    match (status, err.error_type.as_deref()) {
        (404, _) | (_, Some("not_found")) => ErrorClass::NotFound,
        (409, _) | (_, Some("transient_state")) | (_, Some("conflict")) => ErrorClass::Conflict,
        (401, _) | (403, _) | (_, Some("permissions_denied")) | (_, Some("denied_authentication")) => {
            ErrorClass::Forbidden
        }
        (429, _) => ErrorClass::RateLimited,
        (500, _) | (502, _) | (503, _) | (504, _) => ErrorClass::Transient,
        _ => ErrorClass::Permanent,
    }
}

// Object storage and document db answer a generic 400/501 when a feature is missing in a region.
const FEATURE_NOT_SUPPORTED_HINTS: &[&str] = &[
    "NotImplemented",
    "not implemented",
    "is not available in this region",
    "not supported in this zone",
    "not supported in this region",
];

/// Whether the error means the feature does not exist in the target region or zone.
pub fn is_feature_not_supported(err: &ApiError) -> bool {
    if err.status == Some(501) {
        return true;
    }

    FEATURE_NOT_SUPPORTED_HINTS
        .iter()
        .any(|hint| err.message.contains(hint) || err.error_type.as_deref() == Some(*hint))
}
