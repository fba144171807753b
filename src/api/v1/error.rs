use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{error, warn};
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, code, message) = if let Some(failure) = err.find::<ApiFailure>() {
        (
            failure.code.status(),
            failure.code,
            failure.message.clone(),
        )
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            ApiErrorCode::InvalidRequest,
            format!("malformed body: {e}"),
        )
    } else if err.is_not_found() {
        (
            StatusCode::NOT_FOUND,
            ApiErrorCode::RecordNotFound,
            "route not found".to_owned(),
        )
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InvalidRequest,
            "method not allowed".to_owned(),
        )
    } else {
        warn!("unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorCode::InternalError,
            ApiErrorCode::InternalError.to_string(),
        )
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    #[error("Invalid request")]
    InvalidRequest,
    #[error("Friendship is unavailable")]
    FriendshipIsUnavailable,
    #[error("Cannot block updates from a blocked user")]
    CannotBlockUpdatesFromBlockedUser,
    #[error("Already exists")]
    AlreadyExists,
    #[error("Record not found")]
    RecordNotFound,
    #[error("Deadline exceeded")]
    DeadlineExceeded,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::RecordNotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::FriendshipIsUnavailable
            | ApiErrorCode::CannotBlockUpdatesFromBlockedUser
            | ApiErrorCode::AlreadyExists => StatusCode::CONFLICT,
            ApiErrorCode::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Rejection payload: a stable code plus a human-readable message.
#[derive(Debug)]
pub struct ApiFailure {
    pub code: ApiErrorCode,
    pub message: String,
}

impl reject::Reject for ApiFailure {}

impl ApiFailure {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiFailure {
            code: ApiErrorCode::InvalidRequest,
            message: message.into(),
        }
    }

    /// Internal causes are always logged; they reach the client only when
    /// `expose_internal` is set.
    pub fn from_relation(err: RelationError, expose_internal: bool) -> Self {
        let code = match &err {
            RelationError::InvalidRequest { .. } => ApiErrorCode::InvalidRequest,
            RelationError::RecordNotFound => ApiErrorCode::RecordNotFound,
            RelationError::FriendshipIsUnavailable => ApiErrorCode::FriendshipIsUnavailable,
            RelationError::CannotBlockUpdatesFromBlockedUser => {
                ApiErrorCode::CannotBlockUpdatesFromBlockedUser
            }
            RelationError::AlreadyExists => ApiErrorCode::AlreadyExists,
            RelationError::DeadlineExceeded => ApiErrorCode::DeadlineExceeded,
            RelationError::CannotGetEntity { .. }
            | RelationError::CannotCreateEntity { .. }
            | RelationError::CannotUpdateEntity { .. }
            | RelationError::CannotListEntity { .. }
            | RelationError::PropagationFailed(_)
            | RelationError::Store(_) => ApiErrorCode::InternalError,
        };

        let message = if code == ApiErrorCode::InternalError {
            error!("Internal error: {}", err);
            if expose_internal {
                err.to_string()
            } else {
                code.to_string()
            }
        } else {
            err.to_string()
        };

        ApiFailure { code, message }
    }
}

pub fn rejection(err: RelationError, expose_internal: bool) -> Rejection {
    reject::custom(ApiFailure::from_relation(err, expose_internal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_port::RepoError;

    fn store_failure() -> RelationError {
        RelationError::cannot_get(Entity::Friendship)(RepoError::Store(
            "connection refused".to_owned(),
        ))
    }

    #[test]
    fn codes_serialize_as_stable_keys() {
        assert_eq!(
            serde_json::to_value(ApiErrorCode::CannotBlockUpdatesFromBlockedUser).unwrap(),
            "cannot_block_updates_from_blocked_user"
        );
        assert_eq!(
            serde_json::to_value(ApiErrorCode::InvalidRequest).unwrap(),
            "invalid_request"
        );
    }

    #[test]
    fn business_rules_are_client_errors() {
        let failure = ApiFailure::from_relation(RelationError::FriendshipIsUnavailable, false);

        assert_eq!(failure.code, ApiErrorCode::FriendshipIsUnavailable);
        assert!(failure.code.status().is_client_error());
    }

    #[test]
    fn internal_cause_is_hidden_in_prod() {
        let hidden = ApiFailure::from_relation(store_failure(), false);
        let shown = ApiFailure::from_relation(store_failure(), true);

        assert_eq!(hidden.code, ApiErrorCode::InternalError);
        assert_eq!(hidden.message, "Internal error");
        assert!(shown.message.contains("connection refused"));
        assert!(hidden.code.status().is_server_error());
    }
}
