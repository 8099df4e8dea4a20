pub mod audit;
pub mod health;
pub mod orders;
pub mod purchase_requests;
pub mod returns;
pub mod stock;

use crate::{
    db::DbPool,
    events::EventSender,
    services::{
        audit::AuditService, orders::OrderService, purchase_requests::PurchaseRequestService,
        returns::{ReturnService, ReturnSettings},
        stock::StockService,
    },
    storage::EvidenceStore,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub returns: Arc<ReturnService>,
    pub orders: Arc<OrderService>,
    pub purchase_requests: Arc<PurchaseRequestService>,
    pub stock: Arc<StockService>,
    pub audit: Arc<AuditService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        evidence_store: Arc<dyn EvidenceStore>,
        return_settings: ReturnSettings,
    ) -> Self {
        Self {
            returns: Arc::new(ReturnService::new(
                db_pool.clone(),
                event_sender.clone(),
                evidence_store,
                return_settings,
            )),
            orders: Arc::new(OrderService::new(db_pool.clone(), event_sender.clone())),
            purchase_requests: Arc::new(PurchaseRequestService::new(db_pool.clone())),
            stock: Arc::new(StockService::new(db_pool.clone(), event_sender)),
            audit: Arc::new(AuditService::new(db_pool)),
        }
    }
}
