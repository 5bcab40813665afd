//! Client accounts and their linked profile.

use agencydesk_core::{require_text, validate_amount};
use agencydesk_types::{ChangeOp, ClientStatus, Table};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use ts_rs::TS;

use super::row::{double_option, enum_col, Changes};
use crate::{new_id, now, Database, DbError, DbResult};

/// The slice of a profile shown next to a client.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: ClientStatus,
    pub total_spent: f64,
    pub account_manager: Option<String>,
    /// Present when `user_id` points at a profile.
    pub profile: Option<ProfileSummary>,
    #[ts(type = "number")]
    pub created_at: i64,
    #[ts(type = "number")]
    pub updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Client {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let profile_email: Option<String> = row.try_get("profile_email")?;
        let profile = match profile_email {
            Some(email) => Some(ProfileSummary {
                email,
                full_name: row.try_get("profile_full_name")?,
                avatar_url: row.try_get("profile_avatar_url")?,
            }),
            None => None,
        };
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            company: row.try_get("company")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            status: enum_col(row, "status")?,
            total_spent: row.try_get("total_spent")?,
            account_manager: row.try_get("account_manager")?,
            profile,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: Option<ClientStatus>,
    #[serde(default)]
    pub total_spent: Option<f64>,
    #[serde(default)]
    pub account_manager: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub user_id: Option<Option<String>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub company: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<ClientStatus>,
    #[serde(default)]
    pub total_spent: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    pub account_manager: Option<Option<String>>,
}

const CLIENT_SELECT: &str = "
    SELECT c.id, c.user_id, c.name, c.company, c.email, c.phone, c.status,
           c.total_spent, c.account_manager, c.created_at, c.updated_at,
           p.email AS profile_email, p.full_name AS profile_full_name,
           p.avatar_url AS profile_avatar_url
    FROM clients c
    LEFT JOIN profiles p ON p.id = c.user_id";

impl Database {
    pub async fn list_clients(&self) -> DbResult<Vec<Client>> {
        let rows = sqlx::query_as::<_, Client>(&format!(
            "{CLIENT_SELECT} ORDER BY c.created_at DESC, c.rowid DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get_client(&self, id: &str) -> DbResult<Client> {
        sqlx::query_as::<_, Client>(&format!("{CLIENT_SELECT} WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DbError::not_found("client", id))
    }

    /// The client account a portal user is linked to.
    pub async fn get_client_for_user(&self, user_id: &str) -> DbResult<Client> {
        sqlx::query_as::<_, Client>(&format!(
            "{CLIENT_SELECT} WHERE c.user_id = ? ORDER BY c.created_at LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DbError::not_found("client for user", user_id))
    }

    pub async fn create_client(&self, input: NewClient) -> DbResult<Client> {
        let name = require_text("name", &input.name)?;
        let total_spent = input.total_spent.unwrap_or(0.0);
        validate_amount("totalSpent", total_spent)?;

        let id = new_id();
        let ts = now();
        sqlx::query(
            "INSERT INTO clients (id, user_id, name, company, email, phone, status,
                                  total_spent, account_manager, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&input.user_id)
        .bind(name)
        .bind(&input.company)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.status.unwrap_or(ClientStatus::Active).as_str())
        .bind(total_spent)
        .bind(&input.account_manager)
        .bind(ts)
        .bind(ts)
        .execute(self.pool())
        .await?;

        self.notify(Table::Clients, ChangeOp::Insert, &id);
        self.get_client(&id).await
    }

    pub async fn update_client(&self, id: &str, patch: ClientPatch) -> DbResult<Client> {
        let name = patch
            .name
            .as_deref()
            .map(|n| require_text("name", n).map(str::to_string))
            .transpose()?;
        if let Some(total) = patch.total_spent {
            validate_amount("totalSpent", total)?;
        }

        let mut changes = Changes::new("clients");
        changes
            .set("user_id", patch.user_id)
            .set("name", name)
            .set("company", patch.company)
            .set("email", patch.email)
            .set("phone", patch.phone)
            .set("status", patch.status.map(ClientStatus::as_str))
            .set("total_spent", patch.total_spent)
            .set("account_manager", patch.account_manager);
        if changes.apply(self.pool(), id).await? == 0 {
            return Err(DbError::not_found("client", id));
        }
        self.notify(Table::Clients, ChangeOp::Update, id);
        self.get_client(id).await
    }

    /// Removes the client together with its projects, tasks, invoices,
    /// approvals and reports.
    pub async fn delete_client(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("client", id));
        }
        tracing::info!(client = %id, "Client deleted");
        self.notify(Table::Clients, ChangeOp::Delete, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewProfile;
    use pretty_assertions::assert_eq;

    fn acme() -> NewClient {
        NewClient {
            name: "Acme Co".into(),
            company: Some("Acme".into()),
            email: Some("ops@acme.test".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get_client() {
        let db = Database::new_in_memory().await.unwrap();
        let client = db.create_client(acme()).await.unwrap();
        assert_eq!(client.status, ClientStatus::Active);
        assert_eq!(client.total_spent, 0.0);
        assert_eq!(client.profile, None);
        assert_eq!(db.get_client(&client.id).await.unwrap(), client);
    }

    #[tokio::test]
    async fn test_client_joins_profile_summary() {
        let db = Database::new_in_memory().await.unwrap();
        let profile = db
            .create_profile(NewProfile {
                email: "owner@acme.test".into(),
                full_name: Some("Owner".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let client = db
            .create_client(NewClient {
                user_id: Some(profile.id.clone()),
                ..acme()
            })
            .await
            .unwrap();

        assert_eq!(
            client.profile,
            Some(ProfileSummary {
                email: "owner@acme.test".into(),
                full_name: Some("Owner".into()),
                avatar_url: None,
            })
        );
        let portal = db.get_client_for_user(&profile.id).await.unwrap();
        assert_eq!(portal.id, client.id);

        // Deleting the profile unlinks the client instead of removing it.
        db.delete_profile(&profile.id).await.unwrap();
        let unlinked = db.get_client(&client.id).await.unwrap();
        assert_eq!(unlinked.user_id, None);
        assert_eq!(unlinked.profile, None);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = Database::new_in_memory().await.unwrap();
        let err = db
            .create_client(NewClient {
                name: "   ".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let db = Database::new_in_memory().await.unwrap();
        let client = db.create_client(acme()).await.unwrap();
        let updated = db
            .update_client(
                &client.id,
                ClientPatch {
                    status: Some(ClientStatus::Paused),
                    company: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ClientStatus::Paused);
        assert_eq!(updated.company, None);
        assert_eq!(updated.name, "Acme Co");
        assert_eq!(updated.email.as_deref(), Some("ops@acme.test"));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let db = Database::new_in_memory().await.unwrap();
        let err = db
            .update_client("ghost", ClientPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { entity: "client", .. }));
        assert!(matches!(
            db.delete_client("ghost").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let db = Database::new_in_memory().await.unwrap();
        let first = db.create_client(acme()).await.unwrap();
        let second = db
            .create_client(NewClient {
                name: "Globex".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<String> = db.list_clients().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
