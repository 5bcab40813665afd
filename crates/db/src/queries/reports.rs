//! Downloadable client reports.

use agencydesk_core::require_text;
use agencydesk_types::{ChangeOp, Table};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use ts_rs::TS;

use crate::{new_id, now, Database, DbError, DbResult};

/// A saved report row.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub client_id: String,
    pub title: String,
    /// Free-form label such as "March 2026" or "Q1".
    pub period: Option<String>,
    pub file_url: String,
    #[ts(type = "number")]
    pub created_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Report {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            title: row.try_get("title")?,
            period: row.try_get("period")?,
            file_url: row.try_get("file_url")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub client_id: String,
    pub title: String,
    #[serde(default)]
    pub period: Option<String>,
    pub file_url: String,
}

const REPORT_COLUMNS: &str = "id, client_id, title, period, file_url, created_at";

impl Database {
    pub async fn list_reports(&self) -> DbResult<Vec<Report>> {
        let rows = sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn list_reports_for_client(&self, client_id: &str) -> DbResult<Vec<Report>> {
        let rows = sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE client_id = ?
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(client_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get_report(&self, id: &str) -> DbResult<Report> {
        sqlx::query_as::<_, Report>(&format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DbError::not_found("report", id))
    }

    pub async fn create_report(&self, input: NewReport) -> DbResult<Report> {
        let title = require_text("title", &input.title)?;
        let file_url = require_text("fileUrl", &input.file_url)?;

        let id = new_id();
        sqlx::query(
            "INSERT INTO reports (id, client_id, title, period, file_url, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&input.client_id)
        .bind(title)
        .bind(&input.period)
        .bind(file_url)
        .bind(now())
        .execute(self.pool())
        .await?;

        self.notify(Table::Reports, ChangeOp::Insert, &id);
        self.get_report(&id).await
    }

    pub async fn delete_report(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM reports WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("report", id));
        }
        self.notify(Table::Reports, ChangeOp::Delete, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewClient;

    #[tokio::test]
    async fn test_report_lifecycle() {
        let db = Database::new_in_memory().await.unwrap();
        let client = db
            .create_client(NewClient {
                name: "Acme".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let report = db
            .create_report(NewReport {
                client_id: client.id.clone(),
                title: "March performance".into(),
                period: Some("March 2026".into()),
                file_url: "http://x/storage/project-assets/1-march.pdf".into(),
            })
            .await
            .unwrap();
        assert_eq!(db.list_reports_for_client(&client.id).await.unwrap(), vec![report.clone()]);
        assert!(db.list_reports_for_client("other").await.unwrap().is_empty());

        db.delete_report(&report.id).await.unwrap();
        assert!(db.list_reports().await.unwrap().is_empty());
        assert!(matches!(
            db.delete_report(&report.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_report_requires_file_url() {
        let db = Database::new_in_memory().await.unwrap();
        let err = db
            .create_report(NewReport {
                client_id: "c".into(),
                title: "Empty".into(),
                period: None,
                file_url: " ".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));
    }
}
