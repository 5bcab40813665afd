// crates/db/src/feed.rs
//! Per-viewer conversation controller.
//!
//! The feed holds at most one open conversation. Every change notification
//! for that conversation triggers a full re-fetch of its messages; the feed
//! never merges individual rows. Sending does not touch the loaded list:
//! the new message shows up through the next re-fetch like anyone else's.
//!
//! Waiting ([`ConversationFeed::changed`]) and re-fetching
//! ([`ConversationFeed::refresh`]) are separate steps. A change that has been
//! observed stays pending until a refresh completes, so callers may race the
//! wait against timers and drop it at any point without losing an update.

use agencydesk_core::MessageDraft;

use crate::realtime::Subscription;
use crate::{Database, DbError, DbResult, Message};

#[derive(Debug, Clone, PartialEq)]
pub enum FeedState {
    NoConversationSelected,
    Loading { conversation_id: String },
    Loaded {
        conversation_id: String,
        messages: Vec<Message>,
    },
}

pub struct ConversationFeed {
    db: Database,
    viewer_id: String,
    state: FeedState,
    subscription: Option<Subscription>,
    /// A change was observed and the loaded list has not caught up yet.
    stale: bool,
}

impl ConversationFeed {
    pub fn new(db: Database, viewer_id: impl Into<String>) -> Self {
        Self {
            db,
            viewer_id: viewer_id.into(),
            state: FeedState::NoConversationSelected,
            subscription: None,
            stale: false,
        }
    }

    pub fn viewer_id(&self) -> &str {
        &self.viewer_id
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn conversation_id(&self) -> Option<&str> {
        match &self.state {
            FeedState::NoConversationSelected => None,
            FeedState::Loading { conversation_id } | FeedState::Loaded { conversation_id, .. } => {
                Some(conversation_id.as_str())
            }
        }
    }

    /// Messages of the loaded conversation, oldest first. Empty unless loaded.
    pub fn messages(&self) -> &[Message] {
        match &self.state {
            FeedState::Loaded { messages, .. } => messages.as_slice(),
            _ => &[],
        }
    }

    /// Open a conversation: fetch its messages, mark them read for the
    /// viewer and follow its changes. Any previously open conversation is
    /// closed first.
    pub async fn select(&mut self, conversation_id: &str) -> DbResult<()> {
        self.subscription = None;
        self.stale = false;
        self.state = FeedState::Loading {
            conversation_id: conversation_id.to_string(),
        };

        match self.load(conversation_id).await {
            Ok((messages, subscription)) => {
                self.subscription = Some(subscription);
                self.state = FeedState::Loaded {
                    conversation_id: conversation_id.to_string(),
                    messages,
                };
                Ok(())
            }
            Err(e) => {
                self.state = FeedState::NoConversationSelected;
                Err(e)
            }
        }
    }

    async fn load(&self, conversation_id: &str) -> DbResult<(Vec<Message>, Subscription)> {
        if !self.db.is_participant(conversation_id, &self.viewer_id).await? {
            self.db.get_conversation(conversation_id).await?;
            return Err(DbError::Forbidden(format!(
                "{} is not a participant of conversation {conversation_id}",
                self.viewer_id
            )));
        }
        // Subscribe before fetching so nothing committed after the fetch
        // can be missed.
        let subscription = self.db.changes().subscribe_conversation(conversation_id);
        let messages = self.db.get_messages(conversation_id).await?;
        self.db
            .mark_conversation_read(conversation_id, &self.viewer_id)
            .await?;
        Ok((messages, subscription))
    }

    /// Wait until the open conversation changes.
    ///
    /// Cancel-safe: the only await is the subscription, and an observed
    /// change is recorded before returning. Returns immediately while a
    /// change is pending. Returns `false` when there is nothing to wait on:
    /// no conversation is open or the change bus has shut down.
    pub async fn changed(&mut self) -> bool {
        if self.stale {
            return true;
        }
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        if subscription.recv().await.is_none() {
            self.subscription = None;
            return false;
        }
        self.stale = true;
        true
    }

    /// Re-fetch the open conversation. The pending change is cleared only
    /// once the fetch has succeeded.
    pub async fn refresh(&mut self) -> DbResult<()> {
        let Some(conversation_id) = self.conversation_id().map(str::to_string) else {
            self.stale = false;
            return Ok(());
        };
        let messages = self.db.get_messages(&conversation_id).await?;
        self.stale = false;
        self.state = FeedState::Loaded {
            conversation_id,
            messages,
        };
        Ok(())
    }

    /// Wait for the open conversation to change, then re-fetch it.
    ///
    /// Returns `false` when there is nothing to wait on.
    pub async fn next_update(&mut self) -> DbResult<bool> {
        if !self.changed().await {
            return Ok(false);
        }
        self.refresh().await?;
        Ok(true)
    }

    /// Send a message to the open conversation as the viewer.
    pub async fn send(&self, draft: MessageDraft) -> DbResult<Message> {
        let draft = draft.validate()?;
        let conversation_id = self
            .conversation_id()
            .ok_or_else(|| DbError::Conflict("no conversation selected".into()))?;
        self.db
            .send_message(conversation_id, &self.viewer_id, draft)
            .await
    }

    pub fn deselect(&mut self) {
        self.subscription = None;
        self.stale = false;
        self.state = FeedState::NoConversationSelected;
    }
}
