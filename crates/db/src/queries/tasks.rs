//! Task queries.

use agencydesk_core::{require_text, validate_date};
use agencydesk_types::{ChangeOp, Table, TaskPriority, TaskStatus};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use ts_rs::TS;

use super::row::{double_option, enum_col, opt_enum_col, Changes};
use crate::{new_id, now, Database, DbError, DbResult};

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub project_name: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Option<TaskPriority>,
    /// Free text; not a profile reference.
    pub assignee: Option<String>,
    pub due_date: Option<String>,
    #[ts(type = "number")]
    pub created_at: i64,
    #[ts(type = "number")]
    pub updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Task {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            project_id: row.try_get("project_id")?,
            project_name: row.try_get("project_name")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            status: enum_col(row, "status")?,
            priority: opt_enum_col(row, "priority")?,
            assignee: row.try_get("assignee")?,
            due_date: row.try_get("due_date")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub priority: Option<Option<TaskPriority>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
}

const TASK_SELECT: &str = "
    SELECT t.id, t.project_id, pr.name AS project_name, t.title, t.description,
           t.status, t.priority, t.assignee, t.due_date, t.created_at, t.updated_at
    FROM tasks t
    JOIN projects pr ON pr.id = t.project_id";

impl Database {
    pub async fn list_tasks(&self) -> DbResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(&format!(
            "{TASK_SELECT} ORDER BY t.created_at DESC, t.rowid DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn list_tasks_for_project(&self, project_id: &str) -> DbResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(&format!(
            "{TASK_SELECT} WHERE t.project_id = ? ORDER BY t.created_at DESC, t.rowid DESC"
        ))
        .bind(project_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get_task(&self, id: &str) -> DbResult<Task> {
        sqlx::query_as::<_, Task>(&format!("{TASK_SELECT} WHERE t.id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DbError::not_found("task", id))
    }

    pub async fn create_task(&self, input: NewTask) -> DbResult<Task> {
        let title = require_text("title", &input.title)?;
        validate_date("dueDate", input.due_date.as_deref())?;

        let id = new_id();
        let ts = now();
        sqlx::query(
            "INSERT INTO tasks (id, project_id, title, description, status, priority,
                                assignee, due_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&input.project_id)
        .bind(title)
        .bind(&input.description)
        .bind(input.status.unwrap_or(TaskStatus::Todo).as_str())
        .bind(input.priority.map(TaskPriority::as_str))
        .bind(&input.assignee)
        .bind(&input.due_date)
        .bind(ts)
        .bind(ts)
        .execute(self.pool())
        .await?;

        self.notify(Table::Tasks, ChangeOp::Insert, &id);
        self.get_task(&id).await
    }

    pub async fn update_task(&self, id: &str, patch: TaskPatch) -> DbResult<Task> {
        let title = patch
            .title
            .as_deref()
            .map(|t| require_text("title", t).map(str::to_string))
            .transpose()?;
        validate_date("dueDate", patch.due_date.as_ref().and_then(|d| d.as_deref()))?;

        let mut changes = Changes::new("tasks");
        changes
            .set("title", title)
            .set("description", patch.description)
            .set("status", patch.status.map(TaskStatus::as_str))
            .set("priority", patch.priority.map(|p| p.map(TaskPriority::as_str)))
            .set("assignee", patch.assignee)
            .set("due_date", patch.due_date);
        if changes.apply(self.pool(), id).await? == 0 {
            return Err(DbError::not_found("task", id));
        }
        self.notify(Table::Tasks, ChangeOp::Update, id);
        self.get_task(id).await
    }

    /// Advance `todo → in-progress → done → todo`.
    ///
    /// The successor is computed by the UPDATE itself, so concurrent cycles
    /// each advance one step.
    pub async fn cycle_task_status(&self, id: &str) -> DbResult<Task> {
        let status: Option<String> = sqlx::query_scalar(
            "UPDATE tasks
             SET status = CASE status
                     WHEN 'todo' THEN 'in-progress'
                     WHEN 'in-progress' THEN 'done'
                     ELSE 'todo'
                 END,
                 updated_at = ?
             WHERE id = ?
             RETURNING status",
        )
        .bind(now())
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        let Some(status) = status else {
            return Err(DbError::not_found("task", id));
        };
        tracing::debug!(task = %id, to = %status, "Task status cycled");
        self.notify(Table::Tasks, ChangeOp::Update, id);
        self.get_task(id).await
    }

    pub async fn delete_task(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("task", id));
        }
        self.notify(Table::Tasks, ChangeOp::Delete, id);
        Ok(())
    }
}
