//! Sales leads and their conversion into clients.

use agencydesk_core::{require_text, validate_amount};
use agencydesk_types::{ChangeOp, ClientStatus, LeadStatus, Table};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use ts_rs::TS;

use super::row::{double_option, enum_col, Changes};
use crate::{new_id, now, Client, Database, DbError, DbResult};

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub estimated_value: Option<f64>,
    /// Set once the lead has been turned into a client.
    pub converted_client_id: Option<String>,
    #[ts(type = "number")]
    pub created_at: i64,
    #[ts(type = "number")]
    pub updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Lead {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            company: row.try_get("company")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            source: row.try_get("source")?,
            status: enum_col(row, "status")?,
            notes: row.try_get("notes")?,
            estimated_value: row.try_get("estimated_value")?,
            converted_client_id: row.try_get("converted_client_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub status: Option<LeadStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub estimated_value: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub company: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub source: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<LeadStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub estimated_value: Option<Option<f64>>,
}

/// Result of [`Database::convert_lead_to_client`].
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct LeadConversion {
    pub lead: Lead,
    pub client: Client,
}

const LEAD_COLUMNS: &str = "id, name, company, email, phone, source, status, notes, \
                            estimated_value, converted_client_id, created_at, updated_at";

impl Database {
    pub async fn list_leads(&self) -> DbResult<Vec<Lead>> {
        let rows = sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get_lead(&self, id: &str) -> DbResult<Lead> {
        sqlx::query_as::<_, Lead>(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DbError::not_found("lead", id))
    }

    pub async fn create_lead(&self, input: NewLead) -> DbResult<Lead> {
        let name = require_text("name", &input.name)?;
        if let Some(value) = input.estimated_value {
            validate_amount("estimatedValue", value)?;
        }

        let id = new_id();
        let ts = now();
        sqlx::query(
            "INSERT INTO leads (id, name, company, email, phone, source, status, notes,
                                estimated_value, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(&input.company)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.source)
        .bind(input.status.unwrap_or(LeadStatus::New).as_str())
        .bind(&input.notes)
        .bind(input.estimated_value)
        .bind(ts)
        .bind(ts)
        .execute(self.pool())
        .await?;

        self.notify(Table::Leads, ChangeOp::Insert, &id);
        self.get_lead(&id).await
    }

    pub async fn update_lead(&self, id: &str, patch: LeadPatch) -> DbResult<Lead> {
        let name = patch
            .name
            .as_deref()
            .map(|n| require_text("name", n).map(str::to_string))
            .transpose()?;
        if let Some(Some(value)) = patch.estimated_value {
            validate_amount("estimatedValue", value)?;
        }

        let mut changes = Changes::new("leads");
        changes
            .set("name", name)
            .set("company", patch.company)
            .set("email", patch.email)
            .set("phone", patch.phone)
            .set("source", patch.source)
            .set("status", patch.status.map(LeadStatus::as_str))
            .set("notes", patch.notes)
            .set("estimated_value", patch.estimated_value);
        if changes.apply(self.pool(), id).await? == 0 {
            return Err(DbError::not_found("lead", id));
        }
        self.notify(Table::Leads, ChangeOp::Update, id);
        self.get_lead(id).await
    }

    pub async fn delete_lead(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM leads WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("lead", id));
        }
        self.notify(Table::Leads, ChangeOp::Delete, id);
        Ok(())
    }

    /// Turn a lead into an active client.
    ///
    /// The client insert and the lead update commit together or not at all.
    /// A lead that is already `closed` is a conflict. The lead is claimed by
    /// its first write, so of two concurrent conversions exactly one wins.
    pub async fn convert_lead_to_client(&self, lead_id: &str) -> DbResult<LeadConversion> {
        let mut tx = self.pool().begin().await?;
        let ts = now();

        let claimed = sqlx::query(
            "UPDATE leads SET status = ?, updated_at = ? WHERE id = ? AND status <> ?",
        )
        .bind(LeadStatus::Closed.as_str())
        .bind(ts)
        .bind(lead_id)
        .bind(LeadStatus::Closed.as_str())
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM leads WHERE id = ?")
                .bind(lead_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => DbError::Conflict(format!("lead {lead_id} is already closed")),
                None => DbError::not_found("lead", lead_id),
            });
        }

        let lead = sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?"
        ))
        .bind(lead_id)
        .fetch_one(&mut *tx)
        .await?;

        let client_id = new_id();
        sqlx::query(
            "INSERT INTO clients (id, name, company, email, phone, status, total_spent,
                                  created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&client_id)
        .bind(&lead.name)
        .bind(&lead.company)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(ClientStatus::Active.as_str())
        .bind(ts)
        .bind(ts)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE leads SET converted_client_id = ? WHERE id = ?")
            .bind(&client_id)
            .bind(lead_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(lead = %lead_id, client = %client_id, "Lead converted to client");
        self.notify(Table::Clients, ChangeOp::Insert, &client_id);
        self.notify(Table::Leads, ChangeOp::Update, lead_id);

        Ok(LeadConversion {
            lead: self.get_lead(lead_id).await?,
            client: self.get_client(&client_id).await?,
        })
    }
}
