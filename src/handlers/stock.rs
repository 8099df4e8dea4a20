use crate::{
    commands::inventory::{
        AdjustStockCommand, CheckoutCustodyCommand, CreateStockRecordCommand,
        ReturnCustodyCommand,
    },
    entities::{custody_assignment, CustodyStatus},
    errors::ServiceError,
    middleware_helpers::ActingUser,
    models::StockCondition,
    services::stock::StockRecordView,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ServiceError>;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockRecordResponse {
    pub id: Uuid,
    pub material_item_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    /// Always the sum of `condition_breakdown`
    pub quantity: i32,
    #[schema(value_type = std::collections::HashMap<String, i32>, example = json!({"new": 8, "used": 2}))]
    pub condition_breakdown: BTreeMap<StockCondition, i32>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StockRecordView> for StockRecordResponse {
    fn from(view: StockRecordView) -> Self {
        let StockRecordView { record, breakdown } = view;
        Self {
            id: record.id,
            material_item_id: record.material_item_id,
            warehouse_id: record.warehouse_id,
            quantity: record.quantity,
            condition_breakdown: breakdown.entries().clone(),
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustodyAssignmentResponse {
    pub id: Uuid,
    pub stock_record_id: Uuid,
    pub assigned_to: String,
    pub quantity: i32,
    pub checkout_condition: String,
    pub status: CustodyStatus,
    pub return_condition: Option<String>,
    pub notes: Option<String>,
    pub assigned_by: String,
    pub assigned_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl From<custody_assignment::Model> for CustodyAssignmentResponse {
    fn from(model: custody_assignment::Model) -> Self {
        Self {
            id: model.id,
            stock_record_id: model.stock_record_id,
            assigned_to: model.assigned_to,
            quantity: model.quantity,
            checkout_condition: model.checkout_condition,
            status: model.status,
            return_condition: model.return_condition,
            notes: model.notes,
            assigned_by: model.assigned_by,
            assigned_at: model.assigned_at,
            returned_at: model.returned_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateStockRecordRequest {
    pub material_item_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    #[serde(default)]
    #[schema(value_type = std::collections::HashMap<String, i32>, example = json!({"new": 10}))]
    pub condition_breakdown: BTreeMap<StockCondition, i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    pub condition: StockCondition,
    /// Signed change; negative values take units out
    #[schema(example = -2)]
    pub delta: i32,
    #[schema(example = "Sayım farkı")]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CheckoutCustodyRequest {
    #[validate(length(min = 1, message = "Zimmet alan kişi belirtilmelidir"))]
    pub assigned_to: String,
    #[validate(range(min = 1, message = "Zimmet miktarı 0'dan büyük olmalıdır"))]
    pub quantity: i32,
    #[serde(default = "default_checkout_condition")]
    pub condition: StockCondition,
    pub notes: Option<String>,
}

fn default_checkout_condition() -> StockCondition {
    StockCondition::New
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ReturnCustodyRequest {
    /// Condition the units came back in; `used` when omitted
    pub return_condition: Option<StockCondition>,
    pub notes: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/stock",
    summary = "Create stock record",
    request_body = CreateStockRecordRequest,
    responses(
        (status = 201, description = "Stock record created", body = ApiResponse<StockRecordResponse>),
        (status = 400, description = "Invalid breakdown", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing acting user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "stock"
)]
pub async fn create_stock_record(
    State(state): State<AppState>,
    acting_user: ActingUser,
    Json(payload): Json<CreateStockRecordRequest>,
) -> Created<StockRecordResponse> {
    let command = CreateStockRecordCommand {
        material_item_id: payload.material_item_id,
        warehouse_id: payload.warehouse_id,
        condition_breakdown: payload.condition_breakdown,
        created_by: acting_user.0,
    };
    let view = state.services.stock.create_stock_record(command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(view.into()))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock/{id}",
    summary = "Get stock record",
    params(("id" = Uuid, Path, description = "Stock record ID")),
    responses(
        (status = 200, description = "Stock record", body = ApiResponse<StockRecordResponse>),
        (status = 404, description = "Stock record not found", body = crate::errors::ErrorResponse),
    ),
    tag = "stock"
)]
pub async fn get_stock_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StockRecordResponse> {
    let view = state.services.stock.get_stock_record(id).await?;
    Ok(Json(ApiResponse::success(view.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}/stock",
    summary = "List stock of a material",
    params(("id" = Uuid, Path, description = "Material item ID")),
    responses(
        (status = 200, description = "Stock records of the material", body = ApiResponse<Vec<StockRecordResponse>>),
        (status = 404, description = "Material item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "stock"
)]
pub async fn list_material_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<StockRecordResponse>> {
    let views = state.services.stock.list_by_material(id).await?;
    Ok(Json(ApiResponse::success(
        views.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/stock/{id}/adjust",
    summary = "Adjust stock",
    description = "Moves one condition of the record by a signed delta; totals never go below zero",
    params(("id" = Uuid, Path, description = "Stock record ID")),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<StockRecordResponse>),
        (status = 400, description = "Invalid adjustment", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing acting user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Stock record not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Stock record changed concurrently", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse),
    ),
    tag = "stock"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    acting_user: ActingUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustStockRequest>,
) -> ApiResult<StockRecordResponse> {
    let command = AdjustStockCommand {
        stock_record_id: id,
        condition: payload.condition,
        delta: payload.delta,
        reason: payload.reason,
        performed_by: acting_user.0,
    };
    let view = state.services.stock.adjust_stock(command).await?;
    Ok(Json(ApiResponse::success(view.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/stock/{id}/custody",
    summary = "Check out custody",
    description = "Assigns units of the stock record to a person (zimmet)",
    params(("id" = Uuid, Path, description = "Stock record ID")),
    request_body = CheckoutCustodyRequest,
    responses(
        (status = 201, description = "Custody assignment created", body = ApiResponse<CustodyAssignmentResponse>),
        (status = 400, description = "Invalid checkout", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing acting user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Stock record not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse),
    ),
    tag = "custody"
)]
pub async fn checkout_custody(
    State(state): State<AppState>,
    acting_user: ActingUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CheckoutCustodyRequest>,
) -> Created<CustodyAssignmentResponse> {
    payload.validate()?;

    let command = CheckoutCustodyCommand {
        stock_record_id: id,
        assigned_to: payload.assigned_to,
        quantity: payload.quantity,
        condition: payload.condition,
        notes: payload.notes,
        assigned_by: acting_user.0,
    };
    let assignment = state.services.stock.checkout_custody(command).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(assignment.into())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock/{id}/custody",
    summary = "List custody assignments",
    params(("id" = Uuid, Path, description = "Stock record ID")),
    responses(
        (status = 200, description = "Assignments drawn from the record, newest first", body = ApiResponse<Vec<CustodyAssignmentResponse>>),
        (status = 404, description = "Stock record not found", body = crate::errors::ErrorResponse),
    ),
    tag = "custody"
)]
pub async fn list_custody(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<CustodyAssignmentResponse>> {
    let assignments = state.services.stock.list_custody(id).await?;
    Ok(Json(ApiResponse::success(
        assignments.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/custody/{id}/return",
    summary = "Return custody",
    description = "Closes an active assignment and puts its units back on the ledger",
    params(("id" = Uuid, Path, description = "Custody assignment ID")),
    request_body = ReturnCustodyRequest,
    responses(
        (status = 200, description = "Custody returned", body = ApiResponse<CustodyAssignmentResponse>),
        (status = 400, description = "Assignment already returned", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing acting user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Assignment not found", body = crate::errors::ErrorResponse),
    ),
    tag = "custody"
)]
pub async fn return_custody(
    State(state): State<AppState>,
    acting_user: ActingUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReturnCustodyRequest>>,
) -> ApiResult<CustodyAssignmentResponse> {
    let Json(payload) = payload.unwrap_or_default();
    let command = ReturnCustodyCommand {
        assignment_id: id,
        return_condition: payload.return_condition,
        notes: payload.notes,
        returned_by: acting_user.0,
    };
    let assignment = state.services.stock.return_custody(command).await?;
    Ok(Json(ApiResponse::success(assignment.into())))
}
