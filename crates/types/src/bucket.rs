// crates/types/src/bucket.rs
use crate::string_enum;

string_enum! {
    /// Named object-storage buckets.
    Bucket ("bucket") {
        ProjectAssets => "project-assets",
        ChatAttachments => "chat-attachments",
        BlogMedia => "blog-media",
    }
}
