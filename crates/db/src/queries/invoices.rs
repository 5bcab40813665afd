//! Invoice queries.

use agencydesk_core::{validate_amount, validate_date};
use agencydesk_types::{ChangeOp, InvoiceStatus, Table};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use ts_rs::TS;

use super::row::{double_option, enum_col, Changes};
use crate::{new_id, now, Database, DbError, DbResult};

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub invoice_number: Option<String>,
    pub amount: f64,
    pub status: InvoiceStatus,
    pub issued_date: Option<String>,
    pub due_date: Option<String>,
    #[ts(type = "number")]
    pub created_at: i64,
    #[ts(type = "number")]
    pub updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Invoice {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            client_name: row.try_get("client_name")?,
            project_id: row.try_get("project_id")?,
            project_name: row.try_get("project_name")?,
            invoice_number: row.try_get("invoice_number")?,
            amount: row.try_get("amount")?,
            status: enum_col(row, "status")?,
            issued_date: row.try_get("issued_date")?,
            due_date: row.try_get("due_date")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    pub client_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub issued_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePatch {
    #[serde(default, deserialize_with = "double_option")]
    pub project_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub invoice_number: Option<Option<String>>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub issued_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
}

const INVOICE_SELECT: &str = "
    SELECT i.id, i.client_id, c.name AS client_name, i.project_id, pr.name AS project_name,
           i.invoice_number, i.amount, i.status, i.issued_date, i.due_date,
           i.created_at, i.updated_at
    FROM invoices i
    JOIN clients c ON c.id = i.client_id
    LEFT JOIN projects pr ON pr.id = i.project_id";

impl Database {
    pub async fn list_invoices(&self) -> DbResult<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, Invoice>(&format!(
            "{INVOICE_SELECT} ORDER BY i.created_at DESC, i.rowid DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn list_invoices_for_client(&self, client_id: &str) -> DbResult<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, Invoice>(&format!(
            "{INVOICE_SELECT} WHERE i.client_id = ? ORDER BY i.created_at DESC, i.rowid DESC"
        ))
        .bind(client_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get_invoice(&self, id: &str) -> DbResult<Invoice> {
        sqlx::query_as::<_, Invoice>(&format!("{INVOICE_SELECT} WHERE i.id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DbError::not_found("invoice", id))
    }

    pub async fn create_invoice(&self, input: NewInvoice) -> DbResult<Invoice> {
        validate_amount("amount", input.amount)?;
        validate_date("issuedDate", input.issued_date.as_deref())?;
        validate_date("dueDate", input.due_date.as_deref())?;

        let id = new_id();
        let ts = now();
        sqlx::query(
            "INSERT INTO invoices (id, client_id, project_id, invoice_number, amount, status,
                                   issued_date, due_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&input.client_id)
        .bind(&input.project_id)
        .bind(&input.invoice_number)
        .bind(input.amount)
        .bind(input.status.unwrap_or(InvoiceStatus::Pending).as_str())
        .bind(&input.issued_date)
        .bind(&input.due_date)
        .bind(ts)
        .bind(ts)
        .execute(self.pool())
        .await?;

        self.notify(Table::Invoices, ChangeOp::Insert, &id);
        self.get_invoice(&id).await
    }

    pub async fn update_invoice(&self, id: &str, patch: InvoicePatch) -> DbResult<Invoice> {
        if let Some(amount) = patch.amount {
            validate_amount("amount", amount)?;
        }
        validate_date("issuedDate", patch.issued_date.as_ref().and_then(|d| d.as_deref()))?;
        validate_date("dueDate", patch.due_date.as_ref().and_then(|d| d.as_deref()))?;

        let mut changes = Changes::new("invoices");
        changes
            .set("project_id", patch.project_id)
            .set("invoice_number", patch.invoice_number)
            .set("amount", patch.amount)
            .set("status", patch.status.map(InvoiceStatus::as_str))
            .set("issued_date", patch.issued_date)
            .set("due_date", patch.due_date);
        if changes.apply(self.pool(), id).await? == 0 {
            return Err(DbError::not_found("invoice", id));
        }
        self.notify(Table::Invoices, ChangeOp::Update, id);
        self.get_invoice(id).await
    }

    pub async fn delete_invoice(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("invoice", id));
        }
        self.notify(Table::Invoices, ChangeOp::Delete, id);
        Ok(())
    }

    /// Flip pending invoices due before `today` (`YYYY-MM-DD`) to overdue.
    /// Returns how many changed.
    pub async fn mark_overdue_invoices(&self, today: &str) -> DbResult<u64> {
        validate_date("today", Some(today))?;
        let ids: Vec<String> = sqlx::query_scalar(
            "UPDATE invoices SET status = 'overdue', updated_at = ?
             WHERE status = 'pending' AND due_date IS NOT NULL AND due_date < ?
             RETURNING id",
        )
        .bind(now())
        .bind(today)
        .fetch_all(self.pool())
        .await?;

        for id in &ids {
            self.notify(Table::Invoices, ChangeOp::Update, id);
        }
        if !ids.is_empty() {
            tracing::info!(count = ids.len(), "Marked invoices overdue");
        }
        Ok(ids.len() as u64)
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
                name: "Campaign".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        (client.id, project.id)
    }

    fn invoice(client_id: &str, due: Option<&str>) -> NewInvoice {
        NewInvoice {
            client_id: client_id.into(),
            amount: 2500.0,
            due_date: due.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_invoice_joins_names() {
        let db = Database::new_in_memory().await.unwrap();
        let (client_id, project_id) = seed(&db).await;
        let created = db
            .create_invoice(NewInvoice {
                project_id: Some(project_id),
                invoice_number: Some("INV-001".into()),
                ..invoice(&client_id, None)
            })
            .await
            .unwrap();
        assert_eq!(created.client_name, "Acme");
        assert_eq!(created.project_name.as_deref(), Some("Campaign"));
        assert_eq!(created.status, InvoiceStatus::Pending);
    }

    #[tokio::test]
    async fn test_negative_amount_rejected() {
        let db = Database::new_in_memory().await.unwrap();
        let (client_id, _) = seed(&db).await;
        let err = db
            .create_invoice(NewInvoice {
                amount: -1.0,
                ..invoice(&client_id, None)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_project_delete_detaches_invoice() {
        let db = Database::new_in_memory().await.unwrap();
        let (client_id, project_id) = seed(&db).await;
        let created = db
            .create_invoice(NewInvoice {
                project_id: Some(project_id.clone()),
                ..invoice(&client_id, None)
            })
            .await
            .unwrap();

        db.delete_project(&project_id).await.unwrap();
        let detached = db.get_invoice(&created.id).await.unwrap();
        assert_eq!(detached.project_id, None);
        assert_eq!(detached.project_name, None);
    }

    #[tokio::test]
    async fn test_mark_overdue() {
        let db = Database::new_in_memory().await.unwrap();
        let (client_id, _) = seed(&db).await;
        let late = db.create_invoice(invoice(&client_id, Some("2026-01-10"))).await.unwrap();
        let future = db.create_invoice(invoice(&client_id, Some("2026-12-01"))).await.unwrap();
        let undated = db.create_invoice(invoice(&client_id, None)).await.unwrap();
        let paid = db
            .create_invoice(NewInvoice {
                status: Some(InvoiceStatus::Paid),
                ..invoice(&client_id, Some("2026-01-01"))
            })
            .await
            .unwrap();

        assert_eq!(db.mark_overdue_invoices("2026-02-01").await.unwrap(), 1);
        assert_eq!(db.get_invoice(&late.id).await.unwrap().status, InvoiceStatus::Overdue);
        assert_eq!(db.get_invoice(&future.id).await.unwrap().status, InvoiceStatus::Pending);
        assert_eq!(db.get_invoice(&undated.id).await.unwrap().status, InvoiceStatus::Pending);
        assert_eq!(db.get_invoice(&paid.id).await.unwrap().status, InvoiceStatus::Paid);

        // Idempotent.
        assert_eq!(db.mark_overdue_invoices("2026-02-01").await.unwrap(), 0);
        assert!(db.mark_overdue_invoices("Feb 1").await.is_err());
    }
}
