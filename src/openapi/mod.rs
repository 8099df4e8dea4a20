use crate::{handlers, AppState};
use axum::{response::Json, routing::get, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Procurement API",
        version = "1.0.0",
        description = r#"
# Procurement API

Order returns with automatic reorder requests, warehouse stock ledger,
custody (zimmet) assignments and the audit trail.

## Acting user

Mutating endpoints require the `x-acting-user` header set by the fronting
gateway. Requests without it are rejected with `401`.

## Error Handling

Failures use a consistent body:

```json
{
  "error": "Bad Request",
  "message": "Validation error: İade notu zorunludur",
  "request_id": "req-abc123xyz",
  "timestamp": "2026-03-09T10:30:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "returns", description = "Order return workflow"),
        (name = "orders", description = "Orders and deliveries"),
        (name = "purchase-requests", description = "Purchase requests and reorders"),
        (name = "audit", description = "Audit trail"),
        (name = "stock", description = "Warehouse stock ledger"),
        (name = "custody", description = "Custody (zimmet) assignments"),
        (name = "health", description = "Service health")
    ),
    paths(
        handlers::health::health_check,
        handlers::returns::return_order,
        handlers::orders::get_order,
        handlers::orders::record_delivery,
        handlers::purchase_requests::get_purchase_request,
        handlers::purchase_requests::list_reorder_requests,
        handlers::audit::list_audit_entries,
        handlers::stock::create_stock_record,
        handlers::stock::get_stock_record,
        handlers::stock::list_material_stock,
        handlers::stock::adjust_stock,
        handlers::stock::checkout_custody,
        handlers::stock::list_custody,
        handlers::stock::return_custody,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::ResponseMeta,
            crate::entities::OrderStatus,
            crate::entities::ReorderDecision,
            crate::entities::CustodyStatus,
            crate::models::StockCondition,
            crate::services::returns::EncodedPhoto,
            crate::services::returns::ReorderOutcome,
            crate::services::returns::ReturnOutcome,
        )
    )
)]
pub struct ApiDoc;

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn openapi_routes() -> Router<AppState> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
