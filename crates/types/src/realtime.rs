// crates/types/src/realtime.rs
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::string_enum;

string_enum! {
    /// Tables that publish change notifications.
    Table ("table") {
        Profiles => "profiles",
        Clients => "clients",
        Projects => "projects",
        Tasks => "tasks",
        Invoices => "invoices",
        Leads => "leads",
        Approvals => "approvals",
        Reports => "reports",
        Conversations => "conversations",
        Messages => "messages",
        BlogPosts => "blog_posts",
        BlogCategories => "blog_categories",
        BlogTags => "blog_tags",
    }
}

string_enum! {
    ChangeOp ("change operation") {
        Insert => "INSERT",
        Update => "UPDATE",
        Delete => "DELETE",
    }
}

/// A committed row change, published after the write succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub table: Table,
    pub op: ChangeOp,
    /// Primary key of the changed row.
    pub id: String,
    /// Set for message and participant changes so per-conversation
    /// subscribers can filter without a lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ChangeEvent {
    pub fn new(table: Table, op: ChangeOp, id: impl Into<String>) -> Self {
        Self {
            table,
            op,
            id: id.into(),
            conversation_id: None,
        }
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}
