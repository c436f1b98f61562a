//! API error types

use miette::{Diagnostic, JSONReportHandler};
use serde::{Deserialize, Serialize};
use triage_core::{CoreError, FieldViolation, IdError, db::DatabaseError};

/// API error response
#[derive(Debug, thiserror::Error, Diagnostic, Serialize, Deserialize)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation failed: {message}")]
    #[diagnostic(
        code(api::validation_error),
        help("Check the field errors for specific validation issues")
    )]
    ValidationError {
        message: String,
        fields: Option<Vec<FieldViolation>>,
    },

    /// Well-formed request that breaks a business rule
    #[error("{message}")]
    #[diagnostic(code(api::bad_request))]
    BadRequest { message: String },

    /// Authentication required
    #[error("Authentication required")]
    #[diagnostic(
        code(api::unauthorized),
        help("Please provide valid authentication credentials")
    )]
    Unauthorized { message: Option<String> },

    /// Insufficient permissions
    #[error("Insufficient permissions")]
    #[diagnostic(code(api::forbidden), help("{message}"))]
    Forbidden { message: String },

    /// Resource not found
    #[error("Resource not found: {resource_type}")]
    #[diagnostic(
        code(api::not_found),
        help("The {resource_type} with ID '{resource_id}' does not exist")
    )]
    NotFound {
        resource_type: String,
        resource_id: String,
    },

    /// Conflict with existing resource
    #[error("{message}")]
    #[diagnostic(
        code(api::conflict),
        help("The resource already exists or is in a conflicting state")
    )]
    Conflict { message: String },

    /// Core error from triage-core
    #[error("{message}")]
    #[diagnostic(code(api::core_error), help("Core operation failed"))]
    Core { message: String, json: String },

    /// JSON error
    #[error("{message}")]
    #[diagnostic(
        code(api::json_error),
        help("Check that your JSON is valid and matches the expected schema")
    )]
    Json { message: String, json: String },

    /// Malformed resource id
    #[error("Invalid ID: {0}")]
    #[diagnostic(
        code(api::invalid_id),
        help("IDs look like 'patient_<uuid>'; a bare UUID is also accepted")
    )]
    InvalidId(String),

    /// Upstream service answered with something unusable
    #[error("Upstream service error: {message}")]
    #[diagnostic(code(api::bad_gateway))]
    BadGateway { message: String },

    /// Service temporarily unavailable
    #[error("Service temporarily unavailable")]
    #[diagnostic(code(api::service_unavailable), help("{message}"))]
    ServiceUnavailable {
        message: String,
        retry_after_seconds: Option<u64>,
    },
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::ValidationError { .. } => 400,
            ApiError::BadRequest { .. } => 400,
            ApiError::Unauthorized { .. } => 401,
            ApiError::Forbidden { .. } => 403,
            ApiError::NotFound { .. } => 404,
            ApiError::Conflict { .. } => 409,
            ApiError::Core { .. } => 500,
            ApiError::BadGateway { .. } => 502,
            ApiError::ServiceUnavailable { .. } => 503,

            // Malformed input
            ApiError::Json { .. } => 400,
            ApiError::InvalidId(_) => 400,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::ValidationError { .. } => "validation_error",
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::Unauthorized { .. } => "unauthorized",
            ApiError::Forbidden { .. } => "forbidden",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::Core { .. } => "core_error",
            ApiError::Json { .. } => "json_error",
            ApiError::InvalidId(_) => "invalid_id",
            ApiError::BadGateway { .. } => "bad_gateway",
            ApiError::ServiceUnavailable { .. } => "service_unavailable",
        }
    }

    /// Create a validation error without field details
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            fields: None,
        }
    }

    /// Create a validation error for a single field
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        Self::ValidationError {
            message: format!("{field}: {message}"),
            fields: Some(vec![FieldViolation { field, message }]),
        }
    }

    /// Create a not found error
    pub fn not_found(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: Some(message.into()),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Wrap any diagnostic as an internal error, keeping its JSON report
    pub fn internal(err: impl Diagnostic + Send + Sync + 'static) -> Self {
        let handler = JSONReportHandler::new();

        let message = format!("{}", err);
        let mut json = String::new();

        let err: Box<dyn Diagnostic> = Box::new(err);
        handler
            .render_report(&mut json, err.as_ref())
            .unwrap_or_default();

        Self::Core { message, json }
    }
}

// Conversion implementations
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { table, id } => Self::not_found(table, id),
            DatabaseError::UniqueViolation { .. } => Self::Conflict {
                message: err.to_string(),
            },
            DatabaseError::ScheduleConflict { .. } => Self::BadRequest {
                message: err.to_string(),
            },
            DatabaseError::Unavailable { .. } => Self::internal(err),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UserNotFound { id } => Self::not_found("user", id.to_string()),
            CoreError::PatientNotFound { id } => Self::not_found("patient", id.to_string()),
            CoreError::ProviderNotFound { id } => Self::not_found("provider", id.to_string()),
            CoreError::AppointmentNotFound { id } => {
                Self::not_found("appointment", id.to_string())
            }

            CoreError::EmailAlreadyExists { .. }
            | CoreError::PatientAlreadyExists { .. }
            | CoreError::ProviderAlreadyExists { .. }
            | CoreError::LicenseAlreadyExists { .. } => Self::Conflict {
                message: err.to_string(),
            },

            CoreError::AppointmentConflict { .. }
            | CoreError::AppointmentInPast
            | CoreError::InvalidAppointmentStatus { .. }
            | CoreError::ProviderNotAcceptingPatients { .. } => Self::BadRequest {
                message: err.to_string(),
            },

            CoreError::Validation { message, fields } => Self::ValidationError {
                message,
                fields: Some(fields),
            },

            CoreError::InvalidCredentials => Self::unauthorized(err.to_string()),
            CoreError::UserNotActive { .. } => Self::forbidden(err.to_string()),

            CoreError::ConditionLookupUnavailable { ref base_url, .. } => {
                Self::ServiceUnavailable {
                    message: format!("Condition lookup service at {base_url} is unreachable"),
                    retry_after_seconds: Some(30),
                }
            }
            CoreError::ConditionLookupFailed { message } => Self::BadGateway { message },

            CoreError::Database(db) => db.into(),

            CoreError::PasswordHash { .. } | CoreError::ConfigurationError { .. } => {
                Self::internal(err)
            }
        }
    }
}

impl From<IdError> for ApiError {
    fn from(err: IdError) -> Self {
        Self::InvalidId(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        let diagnostic = miette::miette!(
            code = "json::parse_error",
            help = "Check that your JSON is valid",
            "{}",
            err
        );

        let handler = JSONReportHandler::new();
        let message = err.to_string();
        let mut json = String::new();

        handler
            .render_report(&mut json, diagnostic.as_ref())
            .unwrap_or_default();

        Self::Json { message, json }
    }
}

#[cfg(feature = "server")]
impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        Self::Json {
            message: rejection.body_text(),
            json: String::new(),
        }
    }
}

#[cfg(feature = "server")]
impl From<axum::extract::rejection::QueryRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

// Server-side response conversion
#[cfg(feature = "server")]
impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use axum::http::{HeaderValue, StatusCode, header};

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut error_obj = serde_json::json!({
            "type": self.error_type(),
            "message": self.to_string(),
        });

        match &self {
            ApiError::ValidationError {
                fields: Some(fields),
                ..
            } => {
                error_obj["fields"] = serde_json::to_value(fields).unwrap_or_default();
            }
            ApiError::Unauthorized {
                message: Some(detail),
            }
            | ApiError::Forbidden { message: detail }
            | ApiError::ServiceUnavailable {
                message: detail, ..
            } => {
                error_obj["detail"] = serde_json::Value::String(detail.clone());
            }
            ApiError::NotFound { resource_id, .. } => {
                error_obj["detail"] =
                    serde_json::Value::String(format!("No resource with ID '{resource_id}'"));
            }
            ApiError::Core { json, .. } | ApiError::Json { json, .. } => {
                error_obj["detail"] = serde_json::to_value(json).unwrap_or_default();
            }
            _ => {}
        }

        let body = serde_json::json!({
            "error": error_obj,
            "timestamp": chrono::Utc::now(),
        });

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        if let ApiError::ServiceUnavailable {
            retry_after_seconds: Some(secs),
            ..
        } = &self
            && let Ok(value) = HeaderValue::from_str(&secs.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use triage_core::{AppointmentStatus, PatientId, UserId};

    #[test]
    fn test_core_error_status_mapping() {
        let cases: Vec<(CoreError, u16)> = vec![
            (CoreError::PatientNotFound { id: PatientId::generate() }, 404),
            (
                CoreError::EmailAlreadyExists {
                    email: "ada@example.com".to_string(),
                },
                409,
            ),
            (
                CoreError::LicenseAlreadyExists {
                    license_number: "MD-1".to_string(),
                },
                409,
            ),
            (CoreError::AppointmentInPast, 400),
            (
                CoreError::InvalidAppointmentStatus {
                    from: AppointmentStatus::Completed,
                    to: AppointmentStatus::Scheduled,
                },
                400,
            ),
            (CoreError::validation("email", "must be a valid email address"), 400),
            (CoreError::InvalidCredentials, 401),
            (CoreError::UserNotActive { id: UserId::generate() }, 403),
            (
                CoreError::ConditionLookupUnavailable {
                    base_url: "http://nlm".to_string(),
                    attempts: 3,
                    cause: "timed out".into(),
                },
                503,
            ),
            (
                CoreError::Database(DatabaseError::Unavailable {
                    message: "poisoned".to_string(),
                }),
                500,
            ),
        ];

        for (err, status) in cases {
            let label = err.to_string();
            assert_eq!(ApiError::from(err).status_code(), status, "{label}");
        }
    }

    #[test]
    fn test_validation_keeps_fields() {
        let err: ApiError = CoreError::validation("password", "must be at least 8 characters").into();
        match err {
            ApiError::ValidationError {
                fields: Some(fields),
                ..
            } => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "password");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_not_found_names_resource() {
        let id = PatientId::generate();
        let err: ApiError = CoreError::PatientNotFound { id }.into();
        match err {
            ApiError::NotFound {
                resource_type,
                resource_id,
            } => {
                assert_eq!(resource_type, "patient");
                assert_eq!(resource_id, id.to_string());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
