use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Default capacity of the in-process event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

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
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping domain event");
        }
    }
}

/// Domain events raised by the cart, checkout and order services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    CartItemAdded {
        user_id: i32,
        product_id: i32,
        quantity: i32,
    },
    CartItemUpdated {
        user_id: i32,
        cart_item_id: i32,
        quantity: i32,
    },
    CartItemRemoved {
        user_id: i32,
        cart_item_id: i32,
    },
    CartCleared {
        user_id: i32,
    },
    PaymentAuthorized {
        user_id: i32,
        authorization_id: String,
        amount_cents: i64,
    },
    OrderCreated {
        order_id: Uuid,
        user_id: i32,
        total_cents: i64,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    /// A payment exists at the provider without a matching local order.
    OrderReconciliationRequired {
        user_id: i32,
        authorization_id: String,
        amount_cents: i64,
    },
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderReconciliationRequired {
                user_id,
                authorization_id,
                amount_cents,
            } => {
                error!(
                    user_id,
                    authorization_id = %authorization_id,
                    amount_cents,
                    reconciliation_required = true,
                    "Payment authorized without a persisted order"
                );
            }
            other => info!(event = ?other, "Domain event"),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::CartCleared { user_id: 7 })
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(Event::CartCleared { user_id: 7 }));
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender.send(Event::CartCleared { user_id: 1 }).await.is_err());
        // send_or_log swallows the same failure
        sender.send_or_log(Event::CartCleared { user_id: 1 }).await;
    }
}
