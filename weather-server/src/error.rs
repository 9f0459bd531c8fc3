use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use weather_core::Error;

/// Which body shape a failure uses: auth routes answer `{"message": ..}`,
/// everything else `{"error": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Auth,
    Api,
}

#[derive(Debug)]
pub struct ApiError {
    pub error: Error,
    pub scope: Scope,
}

impl ApiError {
    pub fn auth(error: Error) -> Self {
        Self {
            error,
            scope: Scope::Auth,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.error {
            Error::InvalidQuery
            | Error::InvalidCoordinates
            | Error::InvalidInput(_)
            | Error::CapacityExceeded
            | Error::DuplicateLocation => StatusCode::BAD_REQUEST,
            Error::UserNotFound => StatusCode::NOT_FOUND,
            Error::EmailInUse => StatusCode::CONFLICT,
            Error::InvalidCredentials | Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::Storage(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self {
            error,
            scope: Scope::Api,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.error.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, status = %status, "request failed");
        } else {
            tracing::warn!(error = %message, status = %status, "request rejected");
        }

        let body = match (self.scope, status.is_server_error()) {
            (Scope::Auth, true) => json!({ "message": "Server error", "error": message }),
            (Scope::Auth, false) => json!({ "message": message }),
            (Scope::Api, _) => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_core::StoreError;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let cases = [
            (Error::InvalidQuery, 400),
            (Error::InvalidCoordinates, 400),
            (Error::CapacityExceeded, 400),
            (Error::DuplicateLocation, 400),
            (Error::UserNotFound, 404),
            (Error::EmailInUse, 409),
            (Error::InvalidCredentials, 401),
            (Error::Unauthorized, 401),
            (Error::Forbidden, 403),
            (Error::Upstream(anyhow::anyhow!("down")), 502),
            (Error::Storage(StoreError::Backend("disk".into())), 500),
            (Error::Internal("oops".into()), 500),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status().as_u16(), expected);
        }
    }

    #[test]
    fn auth_scope_uses_message_key() {
        let res = ApiError::auth(Error::EmailInUse).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }
}
