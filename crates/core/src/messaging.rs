// crates/core/src/messaging.rs
//! Client-side rules for chat messages.

use agencydesk_types::Attachment;
use serde::Deserialize;

use crate::error::ValidationError;

/// A message as typed by the user, before it is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl MessageDraft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Check the draft can be sent and return it with surrounding
    /// whitespace stripped from the text.
    ///
    /// Text-only, attachment-only and mixed messages are all accepted.
    /// A draft with neither is rejected.
    pub fn validate(self) -> Result<MessageDraft, ValidationError> {
        let content = self.content.trim().to_string();
        if content.is_empty() && self.attachments.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        for attachment in &self.attachments {
            if attachment.url.trim().is_empty() {
                return Err(ValidationError::empty("attachment url"));
            }
        }
        Ok(MessageDraft {
            content,
            attachments: self.attachments,
        })
    }
}

/// Short single-line preview for conversation lists.
pub fn preview(content: &str, attachments: usize, max_chars: usize) -> String {
    let line = content.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        return match attachments {
            0 => String::new(),
            1 => "Sent an attachment".to_string(),
            n => format!("Sent {n} attachments"),
        };
    }
    if line.chars().count() <= max_chars {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment() -> Attachment {
        Attachment {
            name: "logo.png".into(),
            url: "http://localhost:47900/storage/chat-attachments/1-logo.png".into(),
            mime_type: "image/png".into(),
            size: 512,
        }
    }

    #[test]
    fn test_attachment_only_message_is_accepted() {
        let draft = MessageDraft::default().with_attachment(attachment());
        let validated = draft.validate().unwrap();
        assert_eq!(validated.content, "");
        assert_eq!(validated.attachments.len(), 1);
    }

    #[test]
    fn test_empty_message_is_rejected() {
        assert_eq!(
            MessageDraft::default().validate(),
            Err(ValidationError::EmptyMessage)
        );
        assert_eq!(
            MessageDraft::text("   \n ").validate(),
            Err(ValidationError::EmptyMessage)
        );
    }

    #[test]
    fn test_text_is_trimmed() {
        let validated = MessageDraft::text("  hello  ").validate().unwrap();
        assert_eq!(validated.content, "hello");
    }

    #[test]
    fn test_attachment_without_url_is_rejected() {
        let mut bad = attachment();
        bad.url = " ".into();
        let err = MessageDraft::default().with_attachment(bad).validate();
        assert!(err.is_err());
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("hello\nsecond line", 0, 40), "hello");
        assert_eq!(preview("", 1, 40), "Sent an attachment");
        assert_eq!(preview("", 3, 40), "Sent 3 attachments");
        assert_eq!(preview("abcdefghij", 0, 4), "abcd…");
    }
}
