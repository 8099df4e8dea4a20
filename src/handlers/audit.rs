use crate::{entities::audit_log, ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditEntryResponse {
    pub id: Uuid,
    pub purchase_request_id: Option<Uuid>,
    #[schema(example = "order_returned")]
    pub action_type: String,
    pub performed_by: String,
    pub description: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<audit_log::Model> for AuditEntryResponse {
    fn from(model: audit_log::Model) -> Self {
        Self {
            id: model.id,
            purchase_request_id: model.purchase_request_id,
            action_type: model.action_type,
            performed_by: model.performed_by,
            description: model.description,
            metadata: model.metadata,
            created_at: model.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-requests/{id}/audit-log",
    summary = "List audit entries",
    description = "Audit trail of a purchase request, newest first",
    params(
        ("id" = Uuid, Path, description = "Purchase request ID"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Audit entries", body = ApiResponse<PaginatedResponse<AuditEntryResponse>>),
    ),
    tag = "audit"
)]
pub async fn list_audit_entries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<AuditEntryResponse>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);

    let (entries, total) = state
        .services
        .audit
        .list_for_purchase_request(id, page, limit)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: entries.into_iter().map(Into::into).collect(),
        total,
        page,
        limit,
        total_pages: total.div_ceil(limit),
    })))
}
