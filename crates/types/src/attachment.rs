// crates/types/src/attachment.rs
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A file attached to a chat message. Stored as a JSON array on the
/// message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct Attachment {
    pub name: String,
    pub url: String,
    /// MIME type as reported by the uploader.
    #[serde(rename = "type")]
    pub mime_type: String,
    #[ts(type = "number")]
    pub size: u64,
}

/// A reviewer comment on an approval asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ReviewComment {
    pub author_id: Option<String>,
    pub body: String,
    #[ts(type = "number")]
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_type_field_name() {
        let attachment = Attachment {
            name: "brief.pdf".into(),
            url: "http://localhost/storage/chat-attachments/1-brief.pdf".into(),
            mime_type: "application/pdf".into(),
            size: 2048,
        };
        let json = serde_json::to_value(&attachment).unwrap();
        assert_eq!(json["type"], "application/pdf");
        assert!(json.get("mime_type").is_none());
    }
}
