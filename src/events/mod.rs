use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Best-effort delivery; a closed channel is logged and the request
    /// carries on.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Event dropped: {}", e);
        }
    }
}

/// Domain events emitted by the services and consumed by the logger task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Account events
    UserRegistered { user_id: Uuid, role: String },

    // Cart events
    CartItemAdded {
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    CartItemUpdated {
        user_id: Uuid,
        cart_item_id: Uuid,
        quantity: i32,
    },
    CartItemRemoved { user_id: Uuid, cart_item_id: Uuid },

    // Checkout events
    OrderPlaced {
        order_id: Uuid,
        buyer_id: Uuid,
        order_number: String,
        total_amount: Decimal,
        item_count: usize,
    },
}

/// Consumes domain events off the channel and logs them. Runs for the
/// lifetime of the process; exits when every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Event consumer started");

    while let Some(event) = rx.recv().await {
        match event {
            Event::UserRegistered { user_id, ref role } => {
                info!(user_id = %user_id, role = %role, "User registered");
            }
            Event::CartItemAdded {
                user_id,
                product_id,
                quantity,
            } => {
                info!(user_id = %user_id, product_id = %product_id, quantity, "Cart item added");
            }
            Event::CartItemUpdated {
                user_id,
                cart_item_id,
                quantity,
            } => {
                info!(user_id = %user_id, cart_item_id = %cart_item_id, quantity, "Cart item updated");
            }
            Event::CartItemRemoved {
                user_id,
                cart_item_id,
            } => {
                info!(user_id = %user_id, cart_item_id = %cart_item_id, "Cart item removed");
            }
            Event::OrderPlaced {
                order_id,
                buyer_id,
                ref order_number,
                total_amount,
                item_count,
            } => {
                info!(
                    order_id = %order_id,
                    buyer_id = %buyer_id,
                    order_number = %order_number,
                    total = %total_amount,
                    item_count,
                    "Order placed"
                );
            }
        }
    }

    info!("Event consumer stopped");
}
