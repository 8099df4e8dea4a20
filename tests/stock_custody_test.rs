//! Integration tests for the stock ledger and custody (zimmet) assignments.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp, ACTING_USER};
use procurement_api::entities::{audit_log, warehouse_stock};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{json, Value};
use uuid::Uuid;

/// Creates a stock record for a fresh material and returns the response data.
async fn create_stock(app: &TestApp, breakdown: Value) -> (Uuid, Value) {
    let request = app.seed_purchase_request().await;
    let material = app.seed_material(request.id, 50).await;

    let response = app
        .request_as_user(
            Method::POST,
            "/api/v1/stock",
            Some(json!({
                "material_item_id": material.id,
                "condition_breakdown": breakdown,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    (material.id, response_json(response).await["data"].clone())
}

fn quantity_matches_breakdown(record: &Value) {
    let sum: i64 = record["condition_breakdown"]
        .as_object()
        .expect("breakdown object")
        .values()
        .filter_map(Value::as_i64)
        .sum();
    assert_eq!(record["quantity"].as_i64(), Some(sum));
}

// ==================== Stock Ledger ====================

#[tokio::test]
async fn new_record_quantity_is_breakdown_total() {
    let app = TestApp::new().await;
    let (material_id, record) = create_stock(&app, json!({"new": 8, "used": 2})).await;

    assert_eq!(record["material_item_id"], json!(material_id));
    assert_eq!(record["quantity"], 10);
    assert_eq!(record["condition_breakdown"]["used"], 2);
    quantity_matches_breakdown(&record);
}

#[tokio::test]
async fn negative_or_unknown_conditions_are_rejected() {
    let app = TestApp::new().await;
    let request = app.seed_purchase_request().await;
    let material = app.seed_material(request.id, 5).await;

    let negative = app
        .request_as_user(
            Method::POST,
            "/api/v1/stock",
            Some(json!({"material_item_id": material.id, "condition_breakdown": {"new": -1}})),
        )
        .await;
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

    let unknown = app
        .request_as_user(
            Method::POST,
            "/api/v1/stock",
            Some(json!({"material_item_id": material.id, "condition_breakdown": {"broken": 1}})),
        )
        .await;
    assert!(unknown.status().is_client_error());
}

#[tokio::test]
async fn stock_for_unknown_material_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request_as_user(
            Method::POST,
            "/api/v1/stock",
            Some(json!({"material_item_id": Uuid::new_v4(), "condition_breakdown": {"new": 1}})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let listing = app
        .request_as_user(
            Method::GET,
            &format!("/api/v1/materials/{}/stock", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(listing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn adjustments_keep_quantity_in_step_with_breakdown() {
    let app = TestApp::new().await;
    let (_, record) = create_stock(&app, json!({"new": 5})).await;
    let uri = format!("/api/v1/stock/{}/adjust", record["id"].as_str().unwrap());

    let added = app
        .request_as_user(
            Method::POST,
            &uri,
            Some(json!({"condition": "used", "delta": 3, "reason": "Şantiyeden geri geldi"})),
        )
        .await;
    assert_eq!(added.status(), StatusCode::OK);
    let added = response_json(added).await["data"].clone();
    assert_eq!(added["quantity"], 8);
    assert_eq!(added["condition_breakdown"]["used"], 3);
    assert_eq!(added["version"], record["version"].as_i64().unwrap() + 1);
    quantity_matches_breakdown(&added);

    let removed = app
        .request_as_user(
            Method::POST,
            &uri,
            Some(json!({"condition": "new", "delta": -2, "reason": "Sayım farkı"})),
        )
        .await;
    assert_eq!(removed.status(), StatusCode::OK);
    let removed = response_json(removed).await["data"].clone();
    assert_eq!(removed["quantity"], 6);
    assert_eq!(removed["condition_breakdown"]["new"], 3);
    quantity_matches_breakdown(&removed);
}

#[tokio::test]
async fn adjustment_below_zero_is_rejected_and_leaves_record_unchanged() {
    let app = TestApp::new().await;
    let (_, record) = create_stock(&app, json!({"new": 2, "used": 1})).await;
    let id: Uuid = record["id"].as_str().unwrap().parse().unwrap();

    let response = app
        .request_as_user(
            Method::POST,
            &format!("/api/v1/stock/{}/adjust", id),
            Some(json!({"condition": "used", "delta": -2, "reason": "Hurdaya ayrıldı"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let stored = warehouse_stock::Entity::find_by_id(id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.quantity, 3);
    assert_eq!(stored.condition_breakdown, json!({"new": 2, "used": 1}));
}

#[tokio::test]
async fn zero_delta_and_blank_reason_are_rejected() {
    let app = TestApp::new().await;
    let (_, record) = create_stock(&app, json!({"new": 2})).await;
    let uri = format!("/api/v1/stock/{}/adjust", record["id"].as_str().unwrap());

    for payload in [
        json!({"condition": "new", "delta": 0, "reason": "hiç"}),
        json!({"condition": "new", "delta": 1, "reason": "   "}),
    ] {
        let response = app.request_as_user(Method::POST, &uri, Some(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn quantities_beyond_the_integer_range_are_rejected() {
    let app = TestApp::new().await;
    let request = app.seed_purchase_request().await;
    let material = app.seed_material(request.id, 5).await;

    let overflowing = app
        .request_as_user(
            Method::POST,
            "/api/v1/stock",
            Some(json!({
                "material_item_id": material.id,
                "condition_breakdown": {"new": i32::MAX, "used": 1},
            })),
        )
        .await;
    assert_eq!(overflowing.status(), StatusCode::BAD_REQUEST);

    let (_, record) = create_stock(&app, json!({"new": i32::MAX - 1})).await;
    let id: Uuid = record["id"].as_str().unwrap().parse().unwrap();
    let uri = format!("/api/v1/stock/{}/adjust", id);

    let grown = app
        .request_as_user(
            Method::POST,
            &uri,
            Some(json!({"condition": "used", "delta": 2, "reason": "Sayım fazlası"})),
        )
        .await;
    assert_eq!(grown.status(), StatusCode::BAD_REQUEST);

    let drained = app
        .request_as_user(
            Method::POST,
            &uri,
            Some(json!({"condition": "new", "delta": i32::MIN, "reason": "Sayım farkı"})),
        )
        .await;
    assert_eq!(drained.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let stored = warehouse_stock::Entity::find_by_id(id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.quantity, i32::MAX - 1);
    assert_eq!(stored.condition_breakdown, json!({"new": i32::MAX - 1}));
}

#[tokio::test]
async fn material_listing_returns_its_records() {
    let app = TestApp::new().await;
    let (material_id, first) = create_stock(&app, json!({"new": 1})).await;

    let second = app
        .request_as_user(
            Method::POST,
            "/api/v1/stock",
            Some(json!({
                "material_item_id": material_id,
                "warehouse_id": Uuid::new_v4(),
                "condition_breakdown": {"used": 4},
            })),
        )
        .await;
    assert_eq!(second.status(), StatusCode::CREATED);

    let response = app
        .request_as_user(Method::GET, &format!("/api/v1/materials/{}/stock", material_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let records = body["data"].as_array().expect("records");
    assert_eq!(records.len(), 2);
    assert!(records.iter().any(|r| r["id"] == first["id"]));
    records.iter().for_each(quantity_matches_breakdown);
}

// ==================== Custody ====================

#[tokio::test]
async fn custody_checkout_and_return_round_trip() {
    let app = TestApp::new().await;
    let (_, record) = create_stock(&app, json!({"new": 5})).await;
    let stock_id = record["id"].as_str().unwrap().to_string();

    let checkout = app
        .request_as_user(
            Method::POST,
            &format!("/api/v1/stock/{}/custody", stock_id),
            Some(json!({"assigned_to": "ali.yilmaz", "quantity": 2, "notes": "Blok B iskelesi"})),
        )
        .await;
    assert_eq!(checkout.status(), StatusCode::CREATED);
    let assignment = response_json(checkout).await["data"].clone();
    assert_eq!(assignment["status"], "active");
    assert_eq!(assignment["checkout_condition"], "new");
    assert_eq!(assignment["assigned_by"], ACTING_USER);

    let after_checkout = response_json(
        app.request_as_user(Method::GET, &format!("/api/v1/stock/{}", stock_id), None)
            .await,
    )
    .await["data"]
        .clone();
    assert_eq!(after_checkout["quantity"], 3);
    assert_eq!(after_checkout["condition_breakdown"]["new"], 3);

    let returned = app
        .request_as_user(
            Method::POST,
            &format!("/api/v1/custody/{}/return", assignment["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(returned.status(), StatusCode::OK);
    let returned = response_json(returned).await["data"].clone();
    assert_eq!(returned["status"], "returned");
    assert_eq!(returned["return_condition"], "used");
    assert!(returned["returned_at"].is_string());

    let after_return = response_json(
        app.request_as_user(Method::GET, &format!("/api/v1/stock/{}", stock_id), None)
            .await,
    )
    .await["data"]
        .clone();
    assert_eq!(after_return["quantity"], 5);
    assert_eq!(after_return["condition_breakdown"]["new"], 3);
    assert_eq!(after_return["condition_breakdown"]["used"], 2);
    quantity_matches_breakdown(&after_return);

    let listing = response_json(
        app.request_as_user(
            Method::GET,
            &format!("/api/v1/stock/{}/custody", stock_id),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(listing["data"].as_array().map(Vec::len), Some(1));

    let entries = audit_log::Entity::find()
        .filter(audit_log::Column::ActionType.is_in(["custody_checked_out", "custody_returned"]))
        .all(app.state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn custody_cannot_take_more_than_is_in_stock() {
    let app = TestApp::new().await;
    let (_, record) = create_stock(&app, json!({"new": 1, "used": 4})).await;

    let response = app
        .request_as_user(
            Method::POST,
            &format!("/api/v1/stock/{}/custody", record["id"].as_str().unwrap()),
            Some(json!({"assigned_to": "ali.yilmaz", "quantity": 2, "condition": "new"})),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn custody_is_returned_only_once() {
    let app = TestApp::new().await;
    let (_, record) = create_stock(&app, json!({"used": 3})).await;

    let checkout = app
        .request_as_user(
            Method::POST,
            &format!("/api/v1/stock/{}/custody", record["id"].as_str().unwrap()),
            Some(json!({"assigned_to": "zeynep.acar", "quantity": 1, "condition": "used"})),
        )
        .await;
    let assignment_id = response_json(checkout).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let uri = format!("/api/v1/custody/{}/return", assignment_id);

    let first = app
        .request_as_user(Method::POST, &uri, Some(json!({"return_condition": "new"})))
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .request_as_user(Method::POST, &uri, Some(json!({"return_condition": "new"})))
        .await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let body = response_json(second).await;
    assert_eq!(body["message"], "Invalid operation: Zimmet zaten iade edilmiş");

    let stock = response_json(
        app.request_as_user(
            Method::GET,
            &format!("/api/v1/stock/{}", record["id"].as_str().unwrap()),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(stock["data"]["quantity"], 3);
    assert_eq!(stock["data"]["condition_breakdown"]["new"], 1);
    assert_eq!(stock["data"]["condition_breakdown"]["used"], 2);
}

#[tokio::test]
async fn custody_checkout_requires_acting_user() {
    let app = TestApp::new().await;
    let (_, record) = create_stock(&app, json!({"new": 3})).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/stock/{}/custody", record["id"].as_str().unwrap()),
            Some(json!({"assigned_to": "ali.yilmaz", "quantity": 1})),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
