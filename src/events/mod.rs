use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is gone.
    /// Domain writes have already committed by the time events go out.
    pub async fn send_or_log(&self, event: Event) {
        let kind = event.kind();
        if let Err(e) = self.send(event).await {
            warn!(event = kind, "Dropping event: {}", e);
        }
    }
}

/// Domain events published after successful writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderReturned {
        order_id: Uuid,
        quantity: i32,
        total_returned: i32,
        fully_returned: bool,
    },
    OrderDelivered {
        order_id: Uuid,
        delivery_id: Uuid,
        quantity: i32,
    },
    ReorderRequestCreated {
        request_id: Uuid,
        original_request_id: Uuid,
        order_id: Uuid,
    },
    StockRecordCreated(Uuid),
    StockAdjusted {
        stock_record_id: Uuid,
        condition: String,
        delta: i32,
        new_quantity: i32,
    },
    CustodyCheckedOut {
        assignment_id: Uuid,
        stock_record_id: Uuid,
        quantity: i32,
    },
    CustodyReturned {
        assignment_id: Uuid,
        stock_record_id: Uuid,
        quantity: i32,
    },
    AuditEntryRecorded(Uuid),
}

impl Event {
    /// Short, stable name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::OrderReturned { .. } => "order_returned",
            Event::OrderDelivered { .. } => "order_delivered",
            Event::ReorderRequestCreated { .. } => "reorder_request_created",
            Event::StockRecordCreated(_) => "stock_record_created",
            Event::StockAdjusted { .. } => "stock_adjusted",
            Event::CustodyCheckedOut { .. } => "custody_checked_out",
            Event::CustodyReturned { .. } => "custody_returned",
            Event::AuditEntryRecorded(_) => "audit_entry_recorded",
        }
    }
}

/// Drains the event channel, logging every event until all senders are dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderReturned {
                order_id,
                quantity,
                fully_returned,
                ..
            } => info!(
                order_id = %order_id,
                quantity,
                fully_returned,
                "Order return processed"
            ),
            Event::ReorderRequestCreated {
                request_id,
                original_request_id,
                ..
            } => info!(
                request_id = %request_id,
                original_request_id = %original_request_id,
                "Reorder request created"
            ),
            Event::StockAdjusted {
                stock_record_id,
                condition,
                delta,
                new_quantity,
            } => info!(
                stock_record_id = %stock_record_id,
                condition = %condition,
                delta,
                new_quantity,
                "Stock adjusted"
            ),
            other => debug!(event = other.kind(), "Received event: {:?}", other),
        }
    }

    info!("Event channel closed; event processing loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_tolerates_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender
            .send(Event::StockRecordCreated(Uuid::new_v4()))
            .await
            .is_err());
        sender
            .send_or_log(Event::StockRecordCreated(Uuid::new_v4()))
            .await;
    }

    #[tokio::test]
    async fn events_reach_the_receiver_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let first = Uuid::new_v4();
        sender.send(Event::AuditEntryRecorded(first)).await.unwrap();
        sender
            .send(Event::StockRecordCreated(Uuid::new_v4()))
            .await
            .unwrap();

        assert!(matches!(rx.recv().await, Some(Event::AuditEntryRecorded(id)) if id == first));
        assert_eq!(rx.recv().await.map(|e| e.kind()), Some("stock_record_created"));
    }
}
