use crate::{
    commands::{
        audit::{actions, RecordAuditEntryCommand},
        orders::{delivered_quantity, load_order, ApplyOrderReturnCommand, SaveReturnNotesCommand},
        purchaserequests::CreateReorderRequestCommand,
        Command,
    },
    config::{AppConfig, MAX_EVIDENCE_PHOTOS},
    db::DbPool,
    entities::{material_item, order, OrderStatus, ReorderDecision},
    errors::ServiceError,
    events::EventSender,
    storage::{evidence_key, EvidencePhoto, EvidenceStore},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::Utc;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

pub const REORDER_FAILED_WARNING: &str =
    "İade başarılı, ancak otomatik yeniden sipariş talebi oluşturulamadı; lütfen manuel olarak oluşturun";
pub const NOTES_FAILED_WARNING: &str = "İade notu kaydedilemedi";
pub const AUDIT_FAILED_WARNING: &str = "İade işlemi denetim kaydına yazılamadı";

/// A photo as it arrives over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EncodedPhoto {
    #[schema(example = "kirik_ambalaj.jpg")]
    pub file_name: String,
    #[schema(example = "image/jpeg")]
    pub content_type: String,
    /// Standard base64 of the file content
    pub data_base64: String,
}

/// Everything the return workflow needs from one request.
#[derive(Debug, Clone)]
pub struct ReturnOrderInput {
    pub order_id: Uuid,
    pub return_quantity: i32,
    pub return_notes: String,
    pub reorder_decision: ReorderDecision,
    pub evidence_photos: Vec<EncodedPhoto>,
    pub acting_user: String,
}

/// Limits applied to every return.
#[derive(Debug, Clone)]
pub struct ReturnSettings {
    pub max_photos: usize,
    pub max_photo_bytes: usize,
    pub request_number_prefix: String,
    pub default_currency: String,
}

impl Default for ReturnSettings {
    fn default() -> Self {
        Self {
            max_photos: MAX_EVIDENCE_PHOTOS,
            max_photo_bytes: 5 * 1024 * 1024,
            request_number_prefix: "PR".to_string(),
            default_currency: "TRY".to_string(),
        }
    }
}

impl From<&AppConfig> for ReturnSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            max_photos: cfg.evidence_max_photos.min(MAX_EVIDENCE_PHOTOS),
            max_photo_bytes: cfg.evidence_max_photo_bytes,
            request_number_prefix: cfg.reorder_request_prefix.clone(),
            default_currency: cfg.default_currency.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReorderOutcome {
    NotRequested,
    Created {
        request_id: Uuid,
        request_number: String,
    },
    Failed {
        reason: String,
    },
}

/// Result of a completed return.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReturnOutcome {
    pub order_id: Uuid,
    pub return_quantity: i32,
    pub total_returned_quantity: i32,
    pub delivered_quantity: i32,
    pub fully_returned: bool,
    pub status: OrderStatus,
    pub reorder: ReorderOutcome,
    pub evidence_photo_urls: Vec<String>,
    /// Secondary steps that failed without undoing the return
    pub warnings: Vec<String>,
    pub message: String,
}

/// Runs the return-and-reorder workflow.
#[derive(Clone)]
pub struct ReturnService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    evidence_store: Arc<dyn EvidenceStore>,
    settings: ReturnSettings,
}

impl ReturnService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        evidence_store: Arc<dyn EvidenceStore>,
        settings: ReturnSettings,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            evidence_store,
            settings,
        }
    }

    /// Validates, uploads evidence, applies the return and, when asked,
    /// raises the replacement purchase request.
    ///
    /// Only the order update is fatal once validation has passed. Notes,
    /// the reorder request and the audit entry are reported through
    /// `warnings` when they fail.
    #[instrument(skip(self, input), fields(order_id = %input.order_id, quantity = input.return_quantity))]
    pub async fn return_order(&self, input: ReturnOrderInput) -> Result<ReturnOutcome, ServiceError> {
        let db = self.db_pool.as_ref();

        let order = load_order(db, input.order_id).await?;
        let material = material_item::Entity::find_by_id(order.material_item_id)
            .one(db)
            .await
            .map_err(|e| {
                let msg = format!("Failed to fetch material item {}: {}", order.material_item_id, e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Malzeme bulunamadı: {}", order.material_item_id))
            })?;
        let delivered = delivered_quantity(db, order.id).await?;

        validate_return(&order, delivered, &material.unit, &input)?;
        let photos = decode_photos(&input.evidence_photos, &self.settings)?;

        let evidence_photo_urls = self.upload_photos(order.id, &photos).await?;

        let applied = ApplyOrderReturnCommand {
            order_id: order.id,
            expected_version: order.version,
            return_quantity: input.return_quantity,
            delivered_quantity: delivered,
            reorder_decision: input.reorder_decision,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await?;

        let mut warnings = Vec::new();

        let notes = SaveReturnNotesCommand {
            order_id: order.id,
            notes: input.return_notes.clone(),
        };
        if let Err(e) = notes
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
        {
            warn!("Return notes were not saved: {}", e);
            warnings.push(NOTES_FAILED_WARNING.to_string());
        }

        let reorder = match input.reorder_decision {
            ReorderDecision::Yes => {
                let command = CreateReorderRequestCommand {
                    original_request_id: applied.order.purchase_request_id,
                    order_id: order.id,
                    return_quantity: input.return_quantity,
                    requested_by: input.acting_user.clone(),
                    request_number_prefix: self.settings.request_number_prefix.clone(),
                    fallback_currency: self.settings.default_currency.clone(),
                };
                match command
                    .execute(self.db_pool.clone(), self.event_sender.clone())
                    .await
                {
                    Ok(created) => ReorderOutcome::Created {
                        request_id: created.request.id,
                        request_number: created.request.request_number,
                    },
                    Err(e) => {
                        warn!("Automatic reorder request failed: {}", e);
                        warnings.push(REORDER_FAILED_WARNING.to_string());
                        ReorderOutcome::Failed {
                            reason: e.response_message(),
                        }
                    }
                }
            }
            _ => ReorderOutcome::NotRequested,
        };

        let reorder_request_id = match &reorder {
            ReorderOutcome::Created { request_id, .. } => Some(*request_id),
            _ => None,
        };
        let audit = RecordAuditEntryCommand {
            purchase_request_id: Some(applied.order.purchase_request_id),
            action_type: actions::ORDER_RETURNED.to_string(),
            performed_by: input.acting_user.clone(),
            description: format!(
                "{} numaralı siparişten {} {} {} iade edildi",
                applied.order.order_number, input.return_quantity, material.unit, material.name
            ),
            metadata: json!({
                "order_id": order.id,
                "return_quantity": input.return_quantity,
                "total_returned_quantity": applied.order.returned_quantity,
                "reorder_decision": input.reorder_decision,
                "evidence_photo_count": evidence_photo_urls.len(),
                "evidence_photo_urls": evidence_photo_urls,
                "reorder_request_id": reorder_request_id,
            }),
        };
        if let Err(e) = audit
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
        {
            warn!("Return audit entry was not written: {}", e);
            warnings.push(AUDIT_FAILED_WARNING.to_string());
        }

        let message = outcome_message(
            input.return_quantity,
            &material.unit,
            applied.fully_returned,
            &reorder,
        );

        info!(
            total_returned = applied.order.returned_quantity,
            fully_returned = applied.fully_returned,
            warnings = warnings.len(),
            "Order return completed"
        );

        Ok(ReturnOutcome {
            order_id: order.id,
            return_quantity: input.return_quantity,
            total_returned_quantity: applied.order.returned_quantity,
            delivered_quantity: delivered,
            fully_returned: applied.fully_returned,
            status: applied.order.status,
            reorder,
            evidence_photo_urls,
            warnings,
            message,
        })
    }

    async fn upload_photos(
        &self,
        order_id: Uuid,
        photos: &[EvidencePhoto],
    ) -> Result<Vec<String>, ServiceError> {
        let at = Utc::now();
        let mut urls = Vec::with_capacity(photos.len());
        let mut stored = Vec::with_capacity(photos.len());
        for (index, photo) in photos.iter().enumerate() {
            let key = evidence_key(order_id, at, index, photo);
            match self.evidence_store.put(&key, photo).await {
                Ok(url) => {
                    urls.push(url);
                    stored.push(key);
                }
                Err(e) => {
                    error!(key = %key, "Evidence photo upload failed: {}", e);
                    self.discard_photos(&stored).await;
                    return Err(e);
                }
            }
        }
        Ok(urls)
    }

    /// Removes photos of a return that will not be applied. Failures are
    /// only logged; the upload error is what the caller sees.
    async fn discard_photos(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.evidence_store.delete(key).await {
                warn!(key = %key, "Orphaned evidence photo could not be removed: {}", e);
            }
        }
    }
}

/// Checks quantity, notes and the reorder answer against the order's state.
pub fn validate_return(
    order: &order::Model,
    delivered: i32,
    unit: &str,
    input: &ReturnOrderInput,
) -> Result<(), ServiceError> {
    let max_returnable = order.max_returnable(delivered);
    if max_returnable <= 0 {
        return Err(ServiceError::ValidationError(
            "İade edilebilecek miktar bulunmuyor".to_string(),
        ));
    }
    if input.return_quantity <= 0 {
        return Err(ServiceError::ValidationError(
            "İade miktarı 0'dan büyük olmalıdır".to_string(),
        ));
    }
    if input.return_quantity > max_returnable {
        return Err(ServiceError::ValidationError(format!(
            "İade miktarı en fazla {} {} olabilir",
            max_returnable, unit
        )));
    }
    if input.return_notes.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "İade notu zorunludur".to_string(),
        ));
    }
    if input.reorder_decision == ReorderDecision::Unanswered {
        return Err(ServiceError::ValidationError(
            "Yeniden sipariş verilip verilmeyeceğini belirtmelisiniz".to_string(),
        ));
    }
    Ok(())
}

/// Decodes and checks evidence photos without touching storage.
pub fn decode_photos(
    photos: &[EncodedPhoto],
    settings: &ReturnSettings,
) -> Result<Vec<EvidencePhoto>, ServiceError> {
    if photos.len() > settings.max_photos {
        return Err(ServiceError::ValidationError(format!(
            "En fazla {} fotoğraf yüklenebilir",
            settings.max_photos
        )));
    }

    photos
        .iter()
        .map(|photo| {
            if !photo.content_type.trim().to_ascii_lowercase().starts_with("image/") {
                return Err(ServiceError::ValidationError(format!(
                    "Yalnızca görsel dosyaları yüklenebilir: {}",
                    photo.file_name
                )));
            }
            let data = STANDARD.decode(photo.data_base64.trim()).map_err(|_| {
                ServiceError::ValidationError(format!("Fotoğraf okunamadı: {}", photo.file_name))
            })?;
            if data.is_empty() {
                return Err(ServiceError::ValidationError(format!(
                    "Fotoğraf boş: {}",
                    photo.file_name
                )));
            }
            if data.len() > settings.max_photo_bytes {
                return Err(ServiceError::ValidationError(format!(
                    "Fotoğraf boyutu sınırı aşıyor ({} bayt): {}",
                    settings.max_photo_bytes, photo.file_name
                )));
            }
            Ok(EvidencePhoto {
                file_name: photo.file_name.clone(),
                content_type: photo.content_type.trim().to_ascii_lowercase(),
                data: Bytes::from(data),
            })
        })
        .collect()
}

fn outcome_message(quantity: i32, unit: &str, fully_returned: bool, reorder: &ReorderOutcome) -> String {
    let mut message = format!("{} {} iade edildi", quantity, unit);
    if fully_returned {
        message.push_str(". Sipariş tamamen iade edildi");
    }
    match reorder {
        ReorderOutcome::Created { request_number, .. } => {
            message.push_str(&format!(". Yeniden sipariş talebi oluşturuldu: {}", request_number));
        }
        ReorderOutcome::Failed { .. } => {
            message.push_str(". ");
            message.push_str(REORDER_FAILED_WARNING);
        }
        ReorderOutcome::NotRequested => {}
    }
    message
}
