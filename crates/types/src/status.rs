// crates/types/src/status.rs
use crate::string_enum;

string_enum! {
    /// Profile role. Admins and staff see the agency dashboard; clients see
    /// their portal; influencers only the collaboration views.
    Role ("role") {
        Client => "client",
        Admin => "admin",
        Staff => "staff",
        Influencer => "influencer",
    }
}

string_enum! {
    ClientStatus ("client status") {
        Active => "active",
        Paused => "paused",
        Lead => "lead",
    }
}

string_enum! {
    ProjectStatus ("project status") {
        Active => "active",
        Completed => "completed",
        Paused => "paused",
    }
}

string_enum! {
    TaskStatus ("task status") {
        Todo => "todo",
        InProgress => "in-progress",
        Done => "done",
    }
}

impl TaskStatus {
    /// Next status in the board cycle: todo → in-progress → done → todo.
    pub fn next(self) -> Self {
        match self {
            TaskStatus::Todo => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Todo,
        }
    }
}

string_enum! {
    TaskPriority ("task priority") {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

string_enum! {
    InvoiceStatus ("invoice status") {
        Paid => "paid",
        Pending => "pending",
        Overdue => "overdue",
    }
}

string_enum! {
    LeadStatus ("lead status") {
        New => "new",
        Contacted => "contacted",
        Qualified => "qualified",
        Closed => "closed",
    }
}

string_enum! {
    /// Review state of a client-facing asset.
    ApprovalStatus ("approval status") {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Uploaded => "uploaded",
    }
}

impl ApprovalStatus {
    /// Entry status for a new asset. Submissions flagged as needing
    /// sign-off wait in `pending`; everything else is just `uploaded`.
    pub fn initial(requires_sign_off: bool) -> Self {
        if requires_sign_off {
            ApprovalStatus::Pending
        } else {
            ApprovalStatus::Uploaded
        }
    }

    /// `approved` and `rejected` are reviewer decisions.
    pub fn is_decision(self) -> bool {
        matches!(self, ApprovalStatus::Approved | ApprovalStatus::Rejected)
    }
}

string_enum! {
    AssetKind ("asset kind") {
        Image => "image",
        Video => "video",
        Document => "document",
        Copy => "copy",
        Other => "other",
    }
}

string_enum! {
    PostStatus ("post status") {
        Draft => "draft",
        Published => "published",
    }
}
