use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mindcare_core::CareError;

/// Carries an explicit 401 through the `anyhow::Error` chain. Failing to
/// identify the caller is a transport concern, so it has no `CareError`
/// variant.
#[derive(Debug)]
struct UnauthenticatedError(String);

impl std::fmt::Display for UnauthenticatedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for UnauthenticatedError {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self(UnauthenticatedError(msg.into()).into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(CareError::Validation(msg.into()).into())
    }
}

fn status_for(err: &CareError) -> StatusCode {
    match err {
        CareError::Unauthorized(_) => StatusCode::FORBIDDEN,
        CareError::AppointmentNotFound(_)
        | CareError::CounsellorNotFound(_)
        | CareError::CounsellorProfileMissing(_)
        | CareError::UserNotFound(_)
        | CareError::InstitutionNotFound(_) => StatusCode::NOT_FOUND,
        CareError::SlotTaken { .. } | CareError::InstitutionExists(_) => StatusCode::CONFLICT,
        CareError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CareError::NotInitialized
        | CareError::Validation(_)
        | CareError::InvalidStatus(_)
        | CareError::InvalidRole(_)
        | CareError::InvalidTool(_) => StatusCode::BAD_REQUEST,
        CareError::Store(_) | CareError::Io(_) | CareError::Yaml(_) | CareError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<UnauthenticatedError>().is_some() {
            StatusCode::UNAUTHORIZED
        } else if let Some(e) = self.0.downcast_ref::<CareError>() {
            status_for(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status == StatusCode::FORBIDDEN {
            tracing::warn!(error = %self.0, "access denied");
        } else if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
