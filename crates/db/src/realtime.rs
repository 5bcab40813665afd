// crates/db/src/realtime.rs
//! In-process change notifications.
//!
//! Writes publish a [`ChangeEvent`] after they commit. Subscribers pick a
//! filter (one table or one conversation) and re-fetch whatever they show
//! when a matching event arrives.

use agencydesk_types::{ChangeEvent, Table};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Events buffered per subscriber before it is considered lagging.
const BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(BUS_CAPACITY)
    }
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity).0,
        }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::debug!(table = %event.table, op = %event.op, id = %event.id, "change");
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            tracing::trace!(table = %event.table, id = %event.id, "change dropped, no subscribers");
        }
    }

    pub fn subscribe_all(&self) -> Subscription {
        self.subscribe(Filter::All)
    }

    pub fn subscribe_table(&self, table: Table) -> Subscription {
        self.subscribe(Filter::Table(table))
    }

    /// Messages, participants and the conversation row itself.
    pub fn subscribe_conversation(&self, conversation_id: impl Into<String>) -> Subscription {
        self.subscribe(Filter::Conversation(conversation_id.into()))
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn subscribe(&self, filter: Filter) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            filter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Filter {
    All,
    Table(Table),
    Conversation(String),
}

impl Filter {
    fn matches(&self, event: &ChangeEvent) -> bool {
        match self {
            Filter::All => true,
            Filter::Table(table) => event.table == *table,
            Filter::Conversation(id) => {
                event.conversation_id.as_deref() == Some(id.as_str())
                    || (event.table == Table::Conversations && event.id == *id)
            }
        }
    }
}

/// What a subscriber should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Changed(ChangeEvent),
    /// The subscriber fell behind and `missed` events were dropped. Treat it
    /// as "something changed" and re-fetch everything.
    Resync { missed: u64 },
}

/// A filtered receiver. Dropping it closes the subscription.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
    filter: Filter,
}

impl Subscription {
    /// Wait for the next matching notification. Returns `None` once the bus
    /// is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => {
                    return Some(Notification::Changed(event));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "change subscriber lagged, forcing resync");
                    return Some(Notification::Resync { missed });
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
