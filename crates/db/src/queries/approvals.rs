//! Client-facing assets awaiting sign-off.
//!
//! Any status may be set from any other; the only workflow rule is the
//! entry status chosen by [`ApprovalStatus::initial`].

use agencydesk_core::require_text;
use agencydesk_types::{ApprovalStatus, AssetKind, ChangeOp, ReviewComment, Table};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use ts_rs::TS;

use super::row::{double_option, enum_col, json_col, Changes};
use crate::{new_id, now, Database, DbError, DbResult};

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub kind: AssetKind,
    pub file_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: ApprovalStatus,
    pub comments: Vec<ReviewComment>,
    #[ts(type = "number")]
    pub created_at: i64,
    #[ts(type = "number")]
    pub updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Approval {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            client_name: row.try_get("client_name")?,
            project_id: row.try_get("project_id")?,
            project_name: row.try_get("project_name")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            kind: enum_col(row, "kind")?,
            file_url: row.try_get("file_url")?,
            thumbnail_url: row.try_get("thumbnail_url")?,
            status: enum_col(row, "status")?,
            comments: json_col(row, "comments")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct NewApproval {
    pub client_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: Option<AssetKind>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Start in `pending` instead of `uploaded`.
    #[serde(default)]
    pub requires_sign_off: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub project_id: Option<Option<String>>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub kind: Option<AssetKind>,
    #[serde(default, deserialize_with = "double_option")]
    pub file_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub thumbnail_url: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<ApprovalStatus>,
}

/// A reviewer's status change, optionally with a comment.
#[derive(Debug, Clone, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDecision {
    pub status: ApprovalStatus,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
}

const APPROVAL_SELECT: &str = "
    SELECT a.id, a.client_id, c.name AS client_name, a.project_id, pr.name AS project_name,
           a.title, a.description, a.kind, a.file_url, a.thumbnail_url, a.status,
           a.comments, a.created_at, a.updated_at
    FROM approvals a
    JOIN clients c ON c.id = a.client_id
    LEFT JOIN projects pr ON pr.id = a.project_id";

const NEWEST_FIRST: &str = "ORDER BY a.created_at DESC, a.rowid DESC";

impl Database {
    pub async fn list_approvals(&self) -> DbResult<Vec<Approval>> {
        let rows = sqlx::query_as::<_, Approval>(&format!("{APPROVAL_SELECT} {NEWEST_FIRST}"))
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn list_approvals_for_project(&self, project_id: &str) -> DbResult<Vec<Approval>> {
        let rows = sqlx::query_as::<_, Approval>(&format!(
            "{APPROVAL_SELECT} WHERE a.project_id = ? {NEWEST_FIRST}"
        ))
        .bind(project_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn list_approvals_for_client(&self, client_id: &str) -> DbResult<Vec<Approval>> {
        let rows = sqlx::query_as::<_, Approval>(&format!(
            "{APPROVAL_SELECT} WHERE a.client_id = ? {NEWEST_FIRST}"
        ))
        .bind(client_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get_approval(&self, id: &str) -> DbResult<Approval> {
        sqlx::query_as::<_, Approval>(&format!("{APPROVAL_SELECT} WHERE a.id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DbError::not_found("approval", id))
    }

    pub async fn create_approval(&self, input: NewApproval) -> DbResult<Approval> {
        let title = require_text("title", &input.title)?;
        let status = ApprovalStatus::initial(input.requires_sign_off);

        let id = new_id();
        let ts = now();
        sqlx::query(
            "INSERT INTO approvals (id, client_id, project_id, title, description, kind,
                                    file_url, thumbnail_url, status, comments,
                                    created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, '[]', ?, ?)",
        )
        .bind(&id)
        .bind(&input.client_id)
        .bind(&input.project_id)
        .bind(title)
        .bind(&input.description)
        .bind(input.kind.unwrap_or(AssetKind::Other).as_str())
        .bind(&input.file_url)
        .bind(&input.thumbnail_url)
        .bind(status.as_str())
        .bind(ts)
        .bind(ts)
        .execute(self.pool())
        .await?;

        self.notify(Table::Approvals, ChangeOp::Insert, &id);
        self.get_approval(&id).await
    }

    pub async fn update_approval(&self, id: &str, patch: ApprovalPatch) -> DbResult<Approval> {
        let title = patch
            .title
            .as_deref()
            .map(|t| require_text("title", t).map(str::to_string))
            .transpose()?;

        let mut changes = Changes::new("approvals");
        changes
            .set("project_id", patch.project_id)
            .set("title", title)
            .set("description", patch.description)
            .set("kind", patch.kind.map(AssetKind::as_str))
            .set("file_url", patch.file_url)
            .set("thumbnail_url", patch.thumbnail_url)
            .set("status", patch.status.map(ApprovalStatus::as_str));
        if changes.apply(self.pool(), id).await? == 0 {
            return Err(DbError::not_found("approval", id));
        }
        self.notify(Table::Approvals, ChangeOp::Update, id);
        self.get_approval(id).await
    }

    /// Set the review status. A comment is appended only with an approve or
    /// reject; other statuses ignore it.
    pub async fn set_approval_status(
        &self,
        id: &str,
        decision: ApprovalDecision,
    ) -> DbResult<Approval> {
        let mut tx = self.pool().begin().await?;
        let ts = now();

        // Write first so the transaction holds the write lock before it
        // reads the comment list; concurrent reviewers then queue instead
        // of overwriting each other's comments.
        let claimed = sqlx::query("UPDATE approvals SET updated_at = ? WHERE id = ?")
            .bind(ts)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Err(DbError::not_found("approval", id));
        }

        let raw: Option<String> = sqlx::query_scalar("SELECT comments FROM approvals WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let raw = raw.ok_or_else(|| DbError::not_found("approval", id))?;
        let mut comments: Vec<ReviewComment> = serde_json::from_str(&raw)?;

        let comment = decision
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty() && decision.status.is_decision());
        if let Some(body) = comment {
            comments.push(ReviewComment {
                author_id: decision.author_id.clone(),
                body: body.to_string(),
                created_at: ts,
            });
        }

        sqlx::query("UPDATE approvals SET status = ?, comments = ?, updated_at = ? WHERE id = ?")
            .bind(decision.status.as_str())
            .bind(serde_json::to_string(&comments)?)
            .bind(ts)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(approval = %id, status = %decision.status, "Approval status set");
        self.notify(Table::Approvals, ChangeOp::Update, id);
        self.get_approval(id).await
    }

    pub async fn delete_approval(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM approvals WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("approval", id));
        }
        self.notify(Table::Approvals, ChangeOp::Delete, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewClient, NewProject};

    async fn seed(db: &Database) -> (String, String) {
        let client = db
            .create_client(NewClient {
                name: "Acme".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let project = db
            .create_project(NewProject {
                client_id: client.id.clone(),
                name: "Launch".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        (client.id, project.id)
    }

    fn asset(client_id: &str, project_id: Option<&str>, title: &str) -> NewApproval {
        NewApproval {
            client_id: client_id.into(),
            project_id: project_id.map(str::to_string),
            title: title.into(),
            kind: Some(AssetKind::Image),
            file_url: Some("http://x/storage/project-assets/1-hero.png".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_initial_status_follows_sign_off_flag() {
        let db = Database::new_in_memory().await.unwrap();
        let (client_id, _) = seed(&db).await;

        let plain = db.create_approval(asset(&client_id, None, "Hero")).await.unwrap();
        assert_eq!(plain.status, ApprovalStatus::Uploaded);

        let flagged = db
            .create_approval(NewApproval {
                requires_sign_off: true,
                ..asset(&client_id, None, "Banner")
            })
            .await
            .unwrap();
        assert_eq!(flagged.status, ApprovalStatus::Pending);
        assert!(flagged.comments.is_empty());
    }

    #[tokio::test]
    async fn test_decision_appends_comment() {
        let db = Database::new_in_memory().await.unwrap();
        let (client_id, _) = seed(&db).await;
        let created = db.create_approval(asset(&client_id, None, "Hero")).await.unwrap();

        let rejected = db
            .set_approval_status(
                &created.id,
                ApprovalDecision {
                    status: ApprovalStatus::Rejected,
                    comment: Some("Logo is too small".into()),
                    author_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, ApprovalStatus::Rejected);
        assert_eq!(rejected.comments.len(), 1);
        assert_eq!(rejected.comments[0].body, "Logo is too small");

        // No transition table: rejected can go straight back to approved.
        let approved = db
            .set_approval_status(
                &created.id,
                ApprovalDecision {
                    status: ApprovalStatus::Approved,
                    comment: Some("   ".into()),
                    author_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);
        assert_eq!(approved.comments.len(), 1);

        // Sending an asset back to pending is not a decision; the note is dropped.
        let reopened = db
            .set_approval_status(
                &created.id,
                ApprovalDecision {
                    status: ApprovalStatus::Pending,
                    comment: Some("reopening".into()),
                    author_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(reopened.status, ApprovalStatus::Pending);
        assert_eq!(reopened.comments.len(), 1);
    }

    #[tokio::test]
    async fn test_project_list_filters_and_orders() {
        let db = Database::new_in_memory().await.unwrap();
        let (client_id, project_id) = seed(&db).await;
        let first = db
            .create_approval(asset(&client_id, Some(&project_id), "First"))
            .await
            .unwrap();
        db.create_approval(asset(&client_id, None, "Loose")).await.unwrap();
        let second = db
            .create_approval(asset(&client_id, Some(&project_id), "Second"))
            .await
            .unwrap();

        let titles: Vec<String> = db
            .list_approvals_for_project(&project_id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(titles, vec![second.id, first.id]);
        assert_eq!(db.list_approvals_for_client(&client_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_approval() {
        let db = Database::new_in_memory().await.unwrap();
        let err = db
            .set_approval_status(
                "ghost",
                ApprovalDecision {
                    status: ApprovalStatus::Approved,
                    comment: None,
                    author_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { entity: "approval", .. }));
    }
}
