#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use procurement_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::{
        material_item, order, order_delivery, purchase_request, OrderStatus, ReorderDecision,
    },
    errors::ServiceError,
    events::{self, EventSender},
    handlers::AppServices,
    middleware_helpers::ACTING_USER_HEADER,
    services::returns::ReturnSettings,
    storage::{EvidencePhoto, EvidenceStore, LocalEvidenceStore},
    AppState,
};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseBackend, Set, Statement};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const ACTING_USER: &str = "ayse.demir";
pub const PUBLIC_BASE_URL: &str = "http://files.test/evidence";

/// Evidence store that refuses every upload.
pub struct FailingEvidenceStore;

#[async_trait]
impl EvidenceStore for FailingEvidenceStore {
    async fn put(&self, key: &str, _photo: &EvidencePhoto) -> Result<String, ServiceError> {
        Err(ServiceError::StorageError(format!("bucket unavailable for {}", key)))
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        Err(ServiceError::StorageError(format!("bucket unavailable for {}", key)))
    }
}

/// Local store in its own directory that accepts the first `accepted`
/// uploads and refuses the rest.
pub struct FlakyEvidenceStore {
    pub dir: TempDir,
    inner: LocalEvidenceStore,
    accepted: usize,
    puts: AtomicUsize,
}

impl FlakyEvidenceStore {
    pub fn new(accepted: usize) -> Self {
        let dir = TempDir::new().expect("temp evidence dir");
        let inner = LocalEvidenceStore::new(dir.path(), PUBLIC_BASE_URL);
        Self {
            dir,
            inner,
            accepted,
            puts: AtomicUsize::new(0),
        }
    }

    /// Number of files currently stored under `dir`.
    pub fn stored_files(&self) -> usize {
        fn count(path: &std::path::Path) -> usize {
            std::fs::read_dir(path)
                .map(|entries| {
                    entries
                        .filter_map(Result::ok)
                        .map(|entry| {
                            let path = entry.path();
                            if path.is_dir() {
                                count(&path)
                            } else {
                                1
                            }
                        })
                        .sum()
                })
                .unwrap_or(0)
        }
        count(self.dir.path())
    }
}

#[async_trait]
impl EvidenceStore for FlakyEvidenceStore {
    async fn put(&self, key: &str, photo: &EvidencePhoto) -> Result<String, ServiceError> {
        if self.puts.fetch_add(1, Ordering::SeqCst) >= self.accepted {
            return Err(ServiceError::StorageError(format!("upload quota exceeded for {}", key)));
        }
        self.inner.put(key, photo).await
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        self.inner.delete(key).await
    }
}

/// An order seeded together with the request and material it belongs to.
pub struct SeededOrder {
    pub request: purchase_request::Model,
    pub material: material_item::Model,
    pub order: order::Model,
}

/// Application state backed by a fresh in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub evidence_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    /// Same as [`TestApp::new`] with a custom evidence store.
    pub async fn with_evidence_store(store: Arc<dyn EvidenceStore>) -> Self {
        Self::build(Some(store)).await
    }

    async fn build(store: Option<Arc<dyn EvidenceStore>>) -> Self {
        let evidence_dir = TempDir::new().expect("temp evidence dir");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.cors_allow_any_origin = true;
        cfg.evidence_storage_dir = evidence_dir.path().display().to_string();
        cfg.evidence_public_base_url = PUBLIC_BASE_URL.to_string();
        cfg.evidence_max_photo_bytes = 1024;

        let pool = db::establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let store = store.unwrap_or_else(|| {
            Arc::new(LocalEvidenceStore::new(
                evidence_dir.path(),
                PUBLIC_BASE_URL,
            ))
        });

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            store,
            ReturnSettings::from(&cfg),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = procurement_api::build_router(state.clone()).expect("router builds");

        Self {
            router,
            state,
            evidence_dir,
            _event_task: event_task,
        }
    }

    /// Sends a request, with the acting-user header when `acting_user` is set.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        acting_user: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(user) = acting_user {
            builder = builder.header(ACTING_USER_HEADER, user);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request sent as the default acting user.
    pub async fn request_as_user(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(ACTING_USER)).await
    }

    pub async fn execute_sql(&self, sql: &str) {
        self.state
            .db
            .execute(Statement::from_string(DatabaseBackend::Sqlite, sql.to_string()))
            .await
            .expect("raw sql statement");
    }

    pub async fn seed_purchase_request(&self) -> purchase_request::Model {
        let now = Utc::now();
        purchase_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            request_number: Set(format!("PR-SEED-{}", Uuid::new_v4().simple())),
            title: Set("Şantiye iskele malzemesi".to_string()),
            department: Set(Some("Yapım".to_string())),
            currency: Set("TRY".to_string()),
            urgency: Set(Some("yüksek".to_string())),
            site: Set(Some("Ankara Şantiyesi".to_string())),
            status: Set("onaylandı".to_string()),
            requested_by: Set("mehmet.kaya".to_string()),
            original_request_id: Set(None),
            return_order_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed purchase request")
    }

    pub async fn seed_material(&self, request_id: Uuid, quantity: i32) -> material_item::Model {
        material_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_request_id: Set(request_id),
            name: Set("İskele kelepçesi".to_string()),
            unit: Set("adet".to_string()),
            brand: Set(Some("Demirtaş".to_string())),
            specifications: Set(Some("48.3 mm, galvaniz".to_string())),
            quantity: Set(quantity),
            created_at: Set(Utc::now()),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed material item")
    }

    /// Seeds request, material and an order of `quantity` units, with
    /// `delivered` units already received and `returned` already returned.
    pub async fn seed_order(&self, quantity: i32, delivered: i32, returned: i32) -> SeededOrder {
        let request = self.seed_purchase_request().await;
        let material = self.seed_material(request.id, quantity).await;
        let now = Utc::now();

        let status = if delivered >= quantity {
            OrderStatus::Delivered
        } else if delivered > 0 {
            OrderStatus::PartiallyDelivered
        } else {
            OrderStatus::Pending
        };

        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(format!("SIP-{}", Uuid::new_v4().simple())),
            purchase_request_id: Set(request.id),
            material_item_id: Set(material.id),
            supplier_id: Set(None),
            quantity: Set(quantity),
            returned_quantity: Set(returned),
            reorder_decision: Set(ReorderDecision::Unanswered),
            status: Set(status),
            return_notes: Set(None),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed order");

        if delivered > 0 {
            order_delivery::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                quantity: Set(delivered),
                received_by: Set("depo".to_string()),
                delivered_at: Set(now),
            }
            .insert(self.state.db.as_ref())
            .await
            .expect("seed delivery");
        }

        SeededOrder {
            request,
            material,
            order,
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
