use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Handle used by services to publish domain events.
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
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(Uuid),
    OrderUpdated(Uuid),
    OrderDeleted(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderPaymentRecorded {
        order_id: Uuid,
        amount: Decimal,
    },
    OrderPartiallyCompleted(Uuid),

    // Stock events
    StockBatchCreated {
        batch_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
        free_quantity: i32,
    },
    StockAdjusted {
        adjustment_id: Uuid,
        variant_id: Uuid,
        batch_id: Option<Uuid>,
        quantity: i32,
        free_quantity: i32,
    },

    // Settlement events
    ReturnRecorded {
        order_id: Uuid,
        order_item_id: Uuid,
        return_amount: Decimal,
    },
    CustomerDueRecorded {
        order_id: Uuid,
        amount: Decimal,
    },
    DsrDueRecorded {
        order_id: Uuid,
        amount: Decimal,
    },
    ExpenseRecorded {
        order_id: Uuid,
        amount: Decimal,
    },

    // Damage return events
    DamageReturnCreated(Uuid),
    DamageReturnApproved(Uuid),
    DamageReturnRejected(Uuid),
    DamageReturnDeleted(Uuid),
}

/// Drains the event channel. Spawned once at startup; downstream consumers
/// (webhooks, notifications) would hang off this loop.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        debug!(?event, "Processing event");
    }
    info!("Event processor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let order_id = Uuid::new_v4();

        sender.send(Event::OrderCreated(order_id)).await.unwrap();

        match rx.recv().await {
            Some(Event::OrderCreated(id)) => assert_eq!(id, order_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender
            .send(Event::OrderDeleted(Uuid::new_v4()))
            .await
            .is_err());
    }
}
