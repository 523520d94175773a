use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{errors::ServiceError, AppState};

/// Download an order's invoice as a PDF attachment
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Invoice PDF attachment"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Invoices"
)]
pub async fn download_invoice(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let rendered = state.services.invoices.render_for_order(order_id).await?;

    let disposition = format!("attachment; filename=\"{}\"", rendered.filename);
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|_| ServiceError::InternalError("invalid invoice filename".to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/pdf"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        rendered.bytes,
    )
        .into_response())
}
