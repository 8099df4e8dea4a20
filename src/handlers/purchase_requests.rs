use crate::{
    entities::purchase_request_item,
    services::purchase_requests::PurchaseRequestView,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseRequestItemResponse {
    pub id: Uuid,
    pub material_name: String,
    pub unit: String,
    pub brand: Option<String>,
    pub specifications: Option<String>,
    pub quantity: i32,
}

impl From<purchase_request_item::Model> for PurchaseRequestItemResponse {
    fn from(model: purchase_request_item::Model) -> Self {
        Self {
            id: model.id,
            material_name: model.material_name,
            unit: model.unit,
            brand: model.brand,
            specifications: model.specifications,
            quantity: model.quantity,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseRequestResponse {
    pub id: Uuid,
    #[schema(example = "PR-20260309140507-0042")]
    pub request_number: String,
    pub title: String,
    pub department: Option<String>,
    pub currency: String,
    pub urgency: Option<String>,
    pub site: Option<String>,
    pub status: String,
    pub requested_by: String,
    /// Set on requests raised automatically from a return
    pub original_request_id: Option<Uuid>,
    pub return_order_id: Option<Uuid>,
    pub items: Vec<PurchaseRequestItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PurchaseRequestView> for PurchaseRequestResponse {
    fn from(view: PurchaseRequestView) -> Self {
        let PurchaseRequestView { request, items } = view;
        Self {
            id: request.id,
            request_number: request.request_number,
            title: request.title,
            department: request.department,
            currency: request.currency,
            urgency: request.urgency,
            site: request.site,
            status: request.status,
            requested_by: request.requested_by,
            original_request_id: request.original_request_id,
            return_order_id: request.return_order_id,
            items: items.into_iter().map(Into::into).collect(),
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-requests/{id}",
    summary = "Get purchase request",
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    responses(
        (status = 200, description = "Purchase request with its line items", body = ApiResponse<PurchaseRequestResponse>),
        (status = 404, description = "Purchase request not found", body = crate::errors::ErrorResponse),
    ),
    tag = "purchase-requests"
)]
pub async fn get_purchase_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PurchaseRequestResponse> {
    let view = state.services.purchase_requests.get_request(id).await?;
    Ok(Json(ApiResponse::success(view.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-requests/{id}/reorders",
    summary = "List reorder requests",
    description = "Replacement requests raised from returns against this request, newest first",
    params(("id" = Uuid, Path, description = "Original purchase request ID")),
    responses(
        (status = 200, description = "Reorder requests", body = ApiResponse<Vec<PurchaseRequestResponse>>),
        (status = 404, description = "Purchase request not found", body = crate::errors::ErrorResponse),
    ),
    tag = "purchase-requests"
)]
pub async fn list_reorder_requests(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<PurchaseRequestResponse>> {
    let views = state.services.purchase_requests.list_reorders(id).await?;
    Ok(Json(ApiResponse::success(
        views.into_iter().map(Into::into).collect(),
    )))
}
