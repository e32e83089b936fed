use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::application::usecases::payments::PaymentError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            // The provider's own status and body go back to the caller
            // unchanged; the UI needs the provider's diagnostic.
            PaymentError::Gateway { body, .. } => (status, Json(body)).into_response(),
            PaymentError::Internal(_) => {
                // Don't leak internal error detail to client
                (
                    status,
                    Json(ErrorResponse {
                        code: status.as_u16(),
                        message: "Internal server error".to_string(),
                    }),
                )
                    .into_response()
            }
            other => (
                status,
                Json(ErrorResponse {
                    code: status.as_u16(),
                    message: other.to_string(),
                }),
            )
                .into_response(),
        }
    }
}
