//! Integration tests for the order return workflow.
//!
//! Tests cover:
//! - Partial and full returns against partially delivered orders
//! - Quantity, notes and reorder-answer validation
//! - Automatic reorder requests and their degraded failure mode
//! - Evidence photo upload ordering
//! - Optimistic concurrency on the order row
//! - The HTTP surface of the workflow

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{
    response_json, FailingEvidenceStore, FlakyEvidenceStore, TestApp, ACTING_USER, PUBLIC_BASE_URL,
};
use procurement_api::{
    commands::{orders::ApplyOrderReturnCommand, Command},
    entities::{audit_log, order, purchase_request, purchase_request_item, OrderStatus, ReorderDecision},
    errors::ServiceError,
    services::returns::{
        EncodedPhoto, ReorderOutcome, ReturnOrderInput, AUDIT_FAILED_WARNING, NOTES_FAILED_WARNING,
        REORDER_FAILED_WARNING,
    },
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

fn return_input(order_id: Uuid, quantity: i32, decision: ReorderDecision) -> ReturnOrderInput {
    ReturnOrderInput {
        order_id,
        return_quantity: quantity,
        return_notes: "Kelepçelerin bir kısmı çatlak geldi".to_string(),
        reorder_decision: decision,
        evidence_photos: vec![],
        acting_user: ACTING_USER.to_string(),
    }
}

fn png(name: &str) -> EncodedPhoto {
    EncodedPhoto {
        file_name: name.to_string(),
        content_type: "image/png".to_string(),
        data_base64: STANDARD.encode(b"\x89PNG\r\n\x1a\nfake"),
    }
}

async fn reload(app: &TestApp, id: Uuid) -> order::Model {
    order::Entity::find_by_id(id)
        .one(app.state.db.as_ref())
        .await
        .expect("query order")
        .expect("order exists")
}

async fn assert_untouched(app: &TestApp, seeded: &order::Model) {
    let stored = reload(app, seeded.id).await;
    assert_eq!(stored.returned_quantity, seeded.returned_quantity);
    assert_eq!(stored.status, seeded.status);
    assert_eq!(stored.reorder_decision, seeded.reorder_decision);
    assert_eq!(stored.return_notes, seeded.return_notes);
    assert_eq!(stored.version, seeded.version);
}

async fn reorder_count(app: &TestApp, original_request_id: Uuid) -> u64 {
    purchase_request::Entity::find()
        .filter(purchase_request::Column::OriginalRequestId.eq(original_request_id))
        .count(app.state.db.as_ref())
        .await
        .expect("count reorders")
}

// ==================== Quantity Scenarios ====================

#[tokio::test]
async fn partial_return_keeps_status_and_creates_no_request() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(100, 60, 0).await;

    let outcome = app
        .state
        .return_service()
        .return_order(return_input(seeded.order.id, 30, ReorderDecision::No))
        .await
        .expect("return succeeds");

    assert_eq!(outcome.total_returned_quantity, 30);
    assert_eq!(outcome.delivered_quantity, 60);
    assert!(!outcome.fully_returned);
    assert_eq!(outcome.status, OrderStatus::PartiallyDelivered);
    assert_eq!(outcome.reorder, ReorderOutcome::NotRequested);
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.message, "30 adet iade edildi");

    let stored = reload(&app, seeded.order.id).await;
    assert_eq!(stored.returned_quantity, 30);
    assert_eq!(stored.status, OrderStatus::PartiallyDelivered);
    assert_eq!(stored.reorder_decision, ReorderDecision::No);
    assert_eq!(
        stored.return_notes.as_deref(),
        Some("Kelepçelerin bir kısmı çatlak geldi")
    );
    assert_eq!(stored.version, seeded.order.version + 1);
    assert_eq!(reorder_count(&app, seeded.request.id).await, 0);
}

#[tokio::test]
async fn returning_the_whole_remainder_marks_order_returned() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(100, 60, 0).await;

    let outcome = app
        .state
        .return_service()
        .return_order(return_input(seeded.order.id, 40, ReorderDecision::No))
        .await
        .expect("return succeeds");

    assert!(outcome.fully_returned);
    assert_eq!(outcome.status, OrderStatus::Returned);
    assert_eq!(outcome.message, "40 adet iade edildi. Sipariş tamamen iade edildi");
    assert_eq!(reload(&app, seeded.order.id).await.status, OrderStatus::Returned);
}

#[tokio::test]
async fn returning_more_than_the_remainder_is_rejected_without_writes() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(100, 60, 0).await;

    let err = app
        .state
        .return_service()
        .return_order(return_input(seeded.order.id, 41, ReorderDecision::Yes))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ValidationError(msg) if msg == "İade miktarı en fazla 40 adet olabilir");
    assert_untouched(&app, &seeded.order).await;
    assert_eq!(reorder_count(&app, seeded.request.id).await, 0);
}

#[tokio::test]
async fn successive_returns_accumulate_until_nothing_is_left() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(100, 60, 0).await;
    let service = app.state.return_service();

    let first = service
        .return_order(return_input(seeded.order.id, 10, ReorderDecision::No))
        .await
        .expect("first return");
    let second = service
        .return_order(return_input(seeded.order.id, 30, ReorderDecision::No))
        .await
        .expect("second return");

    assert_eq!(first.total_returned_quantity, 10);
    assert_eq!(second.total_returned_quantity, 40);
    assert!(second.fully_returned);

    let err = service
        .return_order(return_input(seeded.order.id, 1, ReorderDecision::No))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(msg) if msg == "İade edilebilecek miktar bulunmuyor");

    let stored = reload(&app, seeded.order.id).await;
    assert_eq!(stored.returned_quantity, 40);
    assert_eq!(stored.status, OrderStatus::Returned);
}

#[tokio::test]
async fn unanswered_reorder_question_is_rejected() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(10, 0, 0).await;

    let err = app
        .state
        .return_service()
        .return_order(return_input(seeded.order.id, 2, ReorderDecision::Unanswered))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ValidationError(msg) if msg == "Yeniden sipariş verilip verilmeyeceğini belirtmelisiniz");
    assert_eq!(reload(&app, seeded.order.id).await.returned_quantity, 0);
}

// ==================== Reorder ====================

#[tokio::test]
async fn reorder_creates_one_request_with_one_line_item() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(100, 60, 0).await;

    let outcome = app
        .state
        .return_service()
        .return_order(return_input(seeded.order.id, 30, ReorderDecision::Yes))
        .await
        .expect("return succeeds");

    let (request_id, request_number) = match &outcome.reorder {
        ReorderOutcome::Created {
            request_id,
            request_number,
        } => (*request_id, request_number.clone()),
        other => panic!("expected created reorder, got {other:?}"),
    };
    assert!(outcome
        .message
        .ends_with(&format!(". Yeniden sipariş talebi oluşturuldu: {}", request_number)));
    assert!(request_number.starts_with("PR-"));

    let db = app.state.db.as_ref();
    let request = purchase_request::Entity::find_by_id(request_id)
        .one(db)
        .await
        .unwrap()
        .expect("reorder request stored");
    assert_eq!(request.status, "iade nedeniyle sipariş");
    assert_eq!(request.original_request_id, Some(seeded.request.id));
    assert_eq!(request.return_order_id, Some(seeded.order.id));
    assert_eq!(request.requested_by, ACTING_USER);
    assert_eq!(request.department, seeded.request.department);
    assert_eq!(request.currency, seeded.request.currency);
    assert_eq!(request.urgency, seeded.request.urgency);
    assert_eq!(request.site, seeded.request.site);
    assert!(request.is_reorder());

    let items = purchase_request_item::Entity::find()
        .filter(purchase_request_item::Column::PurchaseRequestId.eq(request_id))
        .all(db)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 30);
    assert_eq!(items[0].material_name, seeded.material.name);
    assert_eq!(items[0].unit, seeded.material.unit);
    assert_eq!(items[0].brand, seeded.material.brand);
    assert_eq!(items[0].specifications, seeded.material.specifications);

    assert_eq!(reorder_count(&app, seeded.request.id).await, 1);
}

#[tokio::test]
async fn missing_original_request_degrades_to_warning() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(100, 60, 0).await;

    app.execute_sql("PRAGMA foreign_keys = OFF").await;
    purchase_request::Entity::delete_by_id(seeded.request.id)
        .exec(app.state.db.as_ref())
        .await
        .expect("delete original request");

    let outcome = app
        .state
        .return_service()
        .return_order(return_input(seeded.order.id, 30, ReorderDecision::Yes))
        .await
        .expect("return still succeeds");

    assert_matches!(outcome.reorder, ReorderOutcome::Failed { .. });
    assert!(outcome.warnings.iter().any(|w| w == REORDER_FAILED_WARNING));
    assert!(outcome.message.ends_with(REORDER_FAILED_WARNING));
    assert_eq!(outcome.total_returned_quantity, 30);
    assert_eq!(reload(&app, seeded.order.id).await.returned_quantity, 30);

    let requests = purchase_request::Entity::find()
        .count(app.state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(requests, 0);
}

// ==================== Evidence & Audit ====================

#[tokio::test]
async fn evidence_photos_are_stored_and_audited() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(20, 5, 0).await;

    let mut input = return_input(seeded.order.id, 3, ReorderDecision::No);
    input.evidence_photos = vec![png("on.png"), png("arka.png")];

    let outcome = app
        .state
        .return_service()
        .return_order(input)
        .await
        .expect("return succeeds");

    assert_eq!(outcome.evidence_photo_urls.len(), 2);
    for url in &outcome.evidence_photo_urls {
        assert!(url.starts_with(&format!("{}/returns/{}/", PUBLIC_BASE_URL, seeded.order.id)));
        let key = url.trim_start_matches(&format!("{}/", PUBLIC_BASE_URL));
        assert!(app.evidence_dir.path().join(key).exists());
    }

    let entries = audit_log::Entity::find()
        .filter(audit_log::Column::PurchaseRequestId.eq(seeded.request.id))
        .filter(audit_log::Column::ActionType.eq("order_returned"))
        .all(app.state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].performed_by, ACTING_USER);
    assert_eq!(entries[0].metadata["return_quantity"], 3);
    assert_eq!(entries[0].metadata["evidence_photo_count"], 2);
    assert_eq!(entries[0].metadata["reorder_decision"], "no");
}

#[tokio::test]
async fn failed_upload_leaves_the_order_untouched() {
    let app = TestApp::with_evidence_store(Arc::new(FailingEvidenceStore)).await;
    let seeded = app.seed_order(100, 60, 0).await;

    let mut input = return_input(seeded.order.id, 30, ReorderDecision::Yes);
    input.evidence_photos = vec![png("hasar.png")];

    let err = app
        .state
        .return_service()
        .return_order(input)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::StorageError(_));
    assert_untouched(&app, &seeded.order).await;
    assert_eq!(reorder_count(&app, seeded.request.id).await, 0);
    let audit_entries = audit_log::Entity::find()
        .count(app.state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(audit_entries, 0);
}

#[tokio::test]
async fn upload_failure_removes_photos_already_stored() {
    let store = Arc::new(FlakyEvidenceStore::new(1));
    let app = TestApp::with_evidence_store(store.clone()).await;
    let seeded = app.seed_order(20, 5, 0).await;

    let mut input = return_input(seeded.order.id, 3, ReorderDecision::No);
    input.evidence_photos = vec![png("on.png"), png("arka.png"), png("yan.png")];

    let err = app
        .state
        .return_service()
        .return_order(input)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::StorageError(_));
    assert_eq!(store.stored_files(), 0);
    assert_untouched(&app, &seeded.order).await;
}

#[tokio::test]
async fn unsaved_notes_degrade_to_warning() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(20, 5, 0).await;
    app.execute_sql(
        "CREATE TRIGGER lock_return_notes BEFORE UPDATE OF return_notes ON orders \
         BEGIN SELECT RAISE(ABORT, 'return notes are locked'); END",
    )
    .await;

    let outcome = app
        .state
        .return_service()
        .return_order(return_input(seeded.order.id, 4, ReorderDecision::No))
        .await
        .expect("return still succeeds");

    assert_eq!(outcome.warnings, vec![NOTES_FAILED_WARNING.to_string()]);
    assert_eq!(outcome.total_returned_quantity, 4);
    let stored = reload(&app, seeded.order.id).await;
    assert_eq!(stored.returned_quantity, 4);
    assert_eq!(stored.return_notes, None);
}

#[tokio::test]
async fn unwritable_audit_log_degrades_to_warning() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(20, 5, 0).await;
    app.execute_sql("DROP TABLE audit_log").await;

    let outcome = app
        .state
        .return_service()
        .return_order(return_input(seeded.order.id, 2, ReorderDecision::No))
        .await
        .expect("return still succeeds");

    assert_eq!(outcome.warnings, vec![AUDIT_FAILED_WARNING.to_string()]);
    let stored = reload(&app, seeded.order.id).await;
    assert_eq!(stored.returned_quantity, 2);
    assert_eq!(stored.version, seeded.order.version + 1);
    assert_eq!(
        stored.return_notes.as_deref(),
        Some("Kelepçelerin bir kısmı çatlak geldi")
    );
}

// ==================== Concurrency ====================

#[tokio::test]
async fn stale_version_is_a_concurrent_modification() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(100, 60, 0).await;

    app.state
        .return_service()
        .return_order(return_input(seeded.order.id, 5, ReorderDecision::No))
        .await
        .expect("first writer wins");

    let err = ApplyOrderReturnCommand {
        order_id: seeded.order.id,
        expected_version: seeded.order.version,
        return_quantity: 5,
        delivered_quantity: 60,
        reorder_decision: ReorderDecision::No,
    }
    .execute(app.state.db.clone(), Arc::new(app.state.event_sender.clone()))
    .await
    .unwrap_err();

    assert_matches!(err, ServiceError::ConcurrentModification(id) if id == seeded.order.id);
    assert_eq!(reload(&app, seeded.order.id).await.returned_quantity, 5);
}

// ==================== HTTP ====================

#[tokio::test]
async fn http_return_reports_outcome() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(100, 60, 0).await;

    let response = app
        .request_as_user(
            Method::POST,
            &format!("/api/v1/orders/{}/returns", seeded.order.id),
            Some(json!({
                "return_quantity": 40,
                "return_notes": "Yanlış ebat gönderildi",
                "reorder_requested": true,
                "evidence_photos": [{
                    "file_name": "ebat.jpg",
                    "content_type": "image/jpeg",
                    "data_base64": STANDARD.encode(b"jpeg bytes"),
                }],
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["total_returned_quantity"], 40);
    assert_eq!(body["data"]["fully_returned"], true);
    assert_eq!(body["data"]["status"], "returned");
    assert_eq!(body["data"]["reorder"]["outcome"], "created");
    assert_eq!(body["data"]["evidence_photo_urls"].as_array().map(Vec::len), Some(1));
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("40 adet iade edildi. Sipariş tamamen iade edildi. Yeniden sipariş talebi oluşturuldu: PR-"));
}

#[tokio::test]
async fn http_return_requires_acting_user() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(10, 0, 0).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/returns", seeded.order.id),
            Some(json!({
                "return_quantity": 1,
                "return_notes": "not",
                "reorder_requested": false,
            })),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(reload(&app, seeded.order.id).await.returned_quantity, 0);
}

#[tokio::test]
async fn http_validation_failures_are_bad_requests() {
    let app = TestApp::new().await;
    let seeded = app.seed_order(10, 0, 0).await;
    let uri = format!("/api/v1/orders/{}/returns", seeded.order.id);

    let cases = [
        (
            json!({"return_quantity": 2, "return_notes": "  ", "reorder_requested": false}),
            "İade notu zorunludur",
        ),
        (
            json!({"return_quantity": 2, "return_notes": "hasarlı", "reorder_requested": null}),
            "Yeniden sipariş verilip verilmeyeceğini belirtmelisiniz",
        ),
        (
            json!({"return_quantity": 2, "return_notes": "hasarlı", "reorder_requested": false,
                   "evidence_photos": [{"file_name": "fatura.pdf", "content_type": "application/pdf", "data_base64": "JVBERg=="}]}),
            "Yalnızca görsel dosyaları yüklenebilir: fatura.pdf",
        ),
    ];

    for (payload, expected) in cases {
        let response = app.request_as_user(Method::POST, &uri, Some(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["message"], format!("Validation error: {}", expected));
    }

    assert_untouched(&app, &seeded.order).await;
}

#[tokio::test]
async fn http_unknown_order_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request_as_user(
            Method::POST,
            &format!("/api/v1/orders/{}/returns", Uuid::new_v4()),
            Some(json!({"return_quantity": 1, "return_notes": "x", "reorder_requested": false})),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
