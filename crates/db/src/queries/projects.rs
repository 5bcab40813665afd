//! Project queries.

use agencydesk_core::{require_text, validate_amount, validate_date, validate_progress};
use agencydesk_types::{ChangeOp, ProjectStatus, Table};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use ts_rs::TS;

use super::row::{double_option, enum_col, Changes};
use crate::{new_id, now, Database, DbError, DbResult};

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    #[ts(type = "number")]
    pub progress: i64,
    pub value: f64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[ts(type = "number")]
    pub created_at: i64,
    #[ts(type = "number")]
    pub updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Project {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            client_name: row.try_get("client_name")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            status: enum_col(row, "status")?,
            progress: row.try_get("progress")?,
            value: row.try_get("value")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub client_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    #[ts(type = "number | null")]
    pub progress: Option<i64>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub progress: Option<i64>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<String>>,
}

const PROJECT_SELECT: &str = "
    SELECT pr.id, pr.client_id, c.name AS client_name, pr.name, pr.description,
           pr.status, pr.progress, pr.value, pr.start_date, pr.end_date,
           pr.created_at, pr.updated_at
    FROM projects pr
    JOIN clients c ON c.id = pr.client_id";

impl Database {
    pub async fn list_projects(&self) -> DbResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, Project>(&format!(
            "{PROJECT_SELECT} ORDER BY pr.created_at DESC, pr.rowid DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn list_projects_for_client(&self, client_id: &str) -> DbResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, Project>(&format!(
            "{PROJECT_SELECT} WHERE pr.client_id = ? ORDER BY pr.created_at DESC, pr.rowid DESC"
        ))
        .bind(client_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get_project(&self, id: &str) -> DbResult<Project> {
        sqlx::query_as::<_, Project>(&format!("{PROJECT_SELECT} WHERE pr.id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DbError::not_found("project", id))
    }

    pub async fn create_project(&self, input: NewProject) -> DbResult<Project> {
        let name = require_text("name", &input.name)?;
        let progress = input.progress.unwrap_or(0);
        validate_progress(progress)?;
        let value = input.value.unwrap_or(0.0);
        validate_amount("value", value)?;
        validate_date("startDate", input.start_date.as_deref())?;
        validate_date("endDate", input.end_date.as_deref())?;

        let id = new_id();
        let ts = now();
        sqlx::query(
            "INSERT INTO projects (id, client_id, name, description, status, progress, value,
                                   start_date, end_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&input.client_id)
        .bind(name)
        .bind(&input.description)
        .bind(input.status.unwrap_or(ProjectStatus::Active).as_str())
        .bind(progress)
        .bind(value)
        .bind(&input.start_date)
        .bind(&input.end_date)
        .bind(ts)
        .bind(ts)
        .execute(self.pool())
        .await?;

        self.notify(Table::Projects, ChangeOp::Insert, &id);
        self.get_project(&id).await
    }

    pub async fn update_project(&self, id: &str, patch: ProjectPatch) -> DbResult<Project> {
        let name = patch
            .name
            .as_deref()
            .map(|n| require_text("name", n).map(str::to_string))
            .transpose()?;
        if let Some(progress) = patch.progress {
            validate_progress(progress)?;
        }
        if let Some(value) = patch.value {
            validate_amount("value", value)?;
        }
        validate_date("startDate", patch.start_date.as_ref().and_then(|d| d.as_deref()))?;
        validate_date("endDate", patch.end_date.as_ref().and_then(|d| d.as_deref()))?;

        let mut changes = Changes::new("projects");
        changes
            .set("client_id", patch.client_id)
            .set("name", name)
            .set("description", patch.description)
            .set("status", patch.status.map(ProjectStatus::as_str))
            .set("progress", patch.progress)
            .set("value", patch.value)
            .set("start_date", patch.start_date)
            .set("end_date", patch.end_date);
        if changes.apply(self.pool(), id).await? == 0 {
            return Err(DbError::not_found("project", id));
        }
        self.notify(Table::Projects, ChangeOp::Update, id);
        self.get_project(id).await
    }

    /// Tasks go with the project; invoices and approvals are detached.
    pub async fn delete_project(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("project", id));
        }
        self.notify(Table::Projects, ChangeOp::Delete, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewClient;
    use agencydesk_core::ValidationError;

    async fn seed_client(db: &Database, name: &str) -> String {
        db.create_client(NewClient {
            name: name.into(),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
    }

    fn launch(client_id: &str) -> NewProject {
        NewProject {
            client_id: client_id.into(),
            name: "Spring launch".into(),
            value: Some(12_000.0),
            start_date: Some("2026-03-01".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_project_carries_client_name() {
        let db = Database::new_in_memory().await.unwrap();
        let client_id = seed_client(&db, "Acme").await;
        let project = db.create_project(launch(&client_id)).await.unwrap();
        assert_eq!(project.client_name, "Acme");
        assert_eq!(project.progress, 0);
        assert_eq!(project.status, ProjectStatus::Active);
    }

    #[tokio::test]
    async fn test_progress_bounds_enforced() {
        let db = Database::new_in_memory().await.unwrap();
        let client_id = seed_client(&db, "Acme").await;
        let err = db
            .create_project(NewProject {
                progress: Some(140),
                ..launch(&client_id)
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Invalid(ValidationError::ProgressOutOfRange(140))
        ));

        let project = db.create_project(launch(&client_id)).await.unwrap();
        let err = db
            .update_project(
                &project.id,
                ProjectPatch {
                    progress: Some(-5),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));

        let done = db
            .update_project(
                &project.id,
                ProjectPatch {
                    progress: Some(100),
                    status: Some(ProjectStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(done.progress, 100);
        assert_eq!(done.status, ProjectStatus::Completed);
    }

    #[tokio::test]
    async fn test_unknown_client_is_constraint() {
        let db = Database::new_in_memory().await.unwrap();
        let err = db.create_project(launch("missing")).await.unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_list_for_client_filters() {
        let db = Database::new_in_memory().await.unwrap();
        let acme = seed_client(&db, "Acme").await;
        let globex = seed_client(&db, "Globex").await;
        db.create_project(launch(&acme)).await.unwrap();
        db.create_project(launch(&globex)).await.unwrap();

        let projects = db.list_projects_for_client(&acme).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].client_id, acme);
        assert_eq!(db.list_projects().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bad_date_rejected() {
        let db = Database::new_in_memory().await.unwrap();
        let client_id = seed_client(&db, "Acme").await;
        let err = db
            .create_project(NewProject {
                end_date: Some("next week".into()),
                ..launch(&client_id)
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Invalid(ValidationError::InvalidDate { field: "endDate", .. })
        ));
    }
}
