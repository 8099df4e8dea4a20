use crate::{
    entities::ReorderDecision,
    middleware_helpers::ActingUser,
    services::returns::{EncodedPhoto, ReturnOrderInput, ReturnOutcome},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Body of a return request. Checks run in the service so that
/// rejections come back in a fixed order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReturnOrderRequest {
    #[schema(example = 30)]
    pub return_quantity: i32,
    #[serde(default)]
    #[schema(example = "Ambalajlar ezik geldi")]
    pub return_notes: String,
    /// `true` raises a replacement purchase request, `false` does not.
    /// Omitted or null is rejected.
    #[serde(default)]
    pub reorder_requested: Option<bool>,
    #[serde(default)]
    pub evidence_photos: Vec<EncodedPhoto>,
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/returns",
    summary = "Return order units",
    description = "Returns undelivered units of an order to the supplier and optionally raises a replacement purchase request",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = ReturnOrderRequest,
    responses(
        (status = 200, description = "Return applied", body = ApiResponse<ReturnOutcome>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid return", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing acting user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order changed concurrently", body = crate::errors::ErrorResponse),
        (status = 502, description = "Evidence photo upload failed", body = crate::errors::ErrorResponse),
    ),
    tag = "returns"
)]
pub async fn return_order(
    State(state): State<AppState>,
    acting_user: ActingUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReturnOrderRequest>,
) -> ApiResult<ReturnOutcome> {
    let input = ReturnOrderInput {
        order_id: id,
        return_quantity: payload.return_quantity,
        return_notes: payload.return_notes,
        reorder_decision: ReorderDecision::from(payload.reorder_requested),
        evidence_photos: payload.evidence_photos,
        acting_user: acting_user.0,
    };

    let outcome = state.return_service().return_order(input).await?;
    let message = outcome.message.clone();
    Ok(Json(ApiResponse::success_with_message(outcome, message)))
}
