use crate::{
    commands::orders::{DeliveryRecorded, RecordDeliveryCommand},
    entities::{order_delivery, OrderStatus, ReorderDecision},
    errors::ServiceError,
    middleware_helpers::ActingUser,
    services::orders::OrderView,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub quantity: i32,
    pub received_by: String,
    pub delivered_at: DateTime<Utc>,
}

impl From<order_delivery::Model> for DeliveryResponse {
    fn from(model: order_delivery::Model) -> Self {
        Self {
            id: model.id,
            quantity: model.quantity,
            received_by: model.received_by,
            delivered_at: model.delivered_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub purchase_request_id: Uuid,
    pub material_item_id: Uuid,
    pub material_name: String,
    pub unit: String,
    pub supplier_id: Option<Uuid>,
    pub quantity: i32,
    pub delivered_quantity: i32,
    pub returned_quantity: i32,
    pub max_returnable: i32,
    pub reorder_decision: ReorderDecision,
    pub status: OrderStatus,
    pub return_notes: Option<String>,
    pub version: i32,
    pub deliveries: Vec<DeliveryResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderView> for OrderResponse {
    fn from(view: OrderView) -> Self {
        let OrderView {
            order,
            material,
            deliveries,
            delivered_quantity,
            max_returnable,
        } = view;
        Self {
            id: order.id,
            order_number: order.order_number,
            purchase_request_id: order.purchase_request_id,
            material_item_id: order.material_item_id,
            material_name: material.name,
            unit: material.unit,
            supplier_id: order.supplier_id,
            quantity: order.quantity,
            delivered_quantity,
            returned_quantity: order.returned_quantity,
            max_returnable,
            reorder_decision: order.reorder_decision,
            status: order.status,
            return_notes: order.return_notes,
            version: order.version,
            deliveries: deliveries.into_iter().map(DeliveryResponse::from).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordDeliveryRequest {
    #[validate(range(min = 1, message = "Teslim miktarı 0'dan büyük olmalıdır"))]
    #[schema(example = 60)]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeliveryRecordedResponse {
    pub delivery: DeliveryResponse,
    pub order_status: OrderStatus,
    pub delivered_quantity: i32,
    pub order_version: i32,
}

impl From<DeliveryRecorded> for DeliveryRecordedResponse {
    fn from(recorded: DeliveryRecorded) -> Self {
        Self {
            delivery: recorded.delivery.into(),
            order_status: recorded.order.status,
            delivered_quantity: recorded.delivered_quantity,
            order_version: recorded.order.version,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    description = "Order with its delivery history and the quantity still returnable",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved successfully", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let view = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(OrderResponse::from(view))))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/deliveries",
    summary = "Record delivery",
    description = "Records goods received against an order",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = RecordDeliveryRequest,
    responses(
        (status = 201, description = "Delivery recorded", body = ApiResponse<DeliveryRecordedResponse>),
        (status = 400, description = "Invalid delivery", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing acting user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order changed concurrently", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn record_delivery(
    State(state): State<AppState>,
    acting_user: ActingUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordDeliveryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DeliveryRecordedResponse>>), ServiceError> {
    payload.validate()?;

    let command = RecordDeliveryCommand {
        order_id: id,
        quantity: payload.quantity,
        received_by: acting_user.0,
    };
    let recorded = state.services.orders.record_delivery(command).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(DeliveryRecordedResponse::from(recorded))),
    ))
}
