//! Profile queries: the identities the external auth provider signs in.

use agencydesk_core::require_text;
use agencydesk_types::{ChangeOp, Role, Table};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use ts_rs::TS;

use super::row::{double_option, enum_col, Changes};
use crate::{new_id, now, Database, DbError, DbResult};

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    #[ts(type = "number")]
    pub created_at: i64,
    #[ts(type = "number")]
    pub updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Profile {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            full_name: row.try_get("full_name")?,
            avatar_url: row.try_get("avatar_url")?,
            role: enum_col(row, "role")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A profile as registered on sign-up. `id` is the auth provider's user id
/// when there is one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    #[serde(default)]
    pub id: Option<String>,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Self-service edits. Role changes go through [`Database::set_profile_role`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default, deserialize_with = "double_option")]
    pub full_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,
}

const PROFILE_COLUMNS: &str = "id, email, full_name, avatar_url, role, created_at, updated_at";

impl Database {
    pub async fn list_profiles(&self) -> DbResult<Vec<Profile>> {
        let rows = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get_profile(&self, id: &str) -> DbResult<Profile> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DbError::not_found("profile", id))
    }

    pub async fn create_profile(&self, input: NewProfile) -> DbResult<Profile> {
        let email = require_text("email", &input.email)?.to_lowercase();
        let id = input.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(new_id);
        let ts = now();

        sqlx::query(
            "INSERT INTO profiles (id, email, full_name, avatar_url, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&input.full_name)
        .bind(&input.avatar_url)
        .bind(input.role.unwrap_or(Role::Client).as_str())
        .bind(ts)
        .bind(ts)
        .execute(self.pool())
        .await?;

        self.notify(Table::Profiles, ChangeOp::Insert, &id);
        self.get_profile(&id).await
    }

    pub async fn update_profile(&self, id: &str, patch: ProfilePatch) -> DbResult<Profile> {
        let mut changes = Changes::new("profiles");
        changes
            .set("full_name", patch.full_name)
            .set("avatar_url", patch.avatar_url);
        if changes.apply(self.pool(), id).await? == 0 {
            return Err(DbError::not_found("profile", id));
        }
        self.notify(Table::Profiles, ChangeOp::Update, id);
        self.get_profile(id).await
    }

    /// Admin-only role change.
    pub async fn set_profile_role(&self, id: &str, role: Role) -> DbResult<Profile> {
        let result = sqlx::query("UPDATE profiles SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(now())
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("profile", id));
        }
        tracing::info!(profile = %id, role = %role, "Profile role changed");
        self.notify(Table::Profiles, ChangeOp::Update, id);
        self.get_profile(id).await
    }

    /// Linked clients keep their row with `user_id` cleared.
    pub async fn delete_profile(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("profile", id));
        }
        self.notify(Table::Profiles, ChangeOp::Delete, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_profile(email: &str) -> NewProfile {
        NewProfile {
            email: email.to_string(),
            full_name: Some("Dana Reyes".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_client_role() {
        let db = Database::new_in_memory().await.unwrap();
        let profile = db.create_profile(new_profile("Dana@Agency.io")).await.unwrap();
        assert_eq!(profile.role, Role::Client);
        assert_eq!(profile.email, "dana@agency.io");
        assert_eq!(db.get_profile(&profile.id).await.unwrap(), profile);
    }

    #[tokio::test]
    async fn test_external_id_is_kept() {
        let db = Database::new_in_memory().await.unwrap();
        let profile = db
            .create_profile(NewProfile {
                id: Some("auth-123".into()),
                ..new_profile("a@b.io")
            })
            .await
            .unwrap();
        assert_eq!(profile.id, "auth-123");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_constraint() {
        let db = Database::new_in_memory().await.unwrap();
        db.create_profile(new_profile("x@y.io")).await.unwrap();
        let err = db.create_profile(new_profile("x@y.io")).await.unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_update_clears_and_sets() {
        let db = Database::new_in_memory().await.unwrap();
        let profile = db.create_profile(new_profile("x@y.io")).await.unwrap();

        let updated = db
            .update_profile(
                &profile.id,
                ProfilePatch {
                    full_name: Some(None),
                    avatar_url: Some(Some("http://img/a.png".into())),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name, None);
        assert_eq!(updated.avatar_url.as_deref(), Some("http://img/a.png"));
    }

    #[tokio::test]
    async fn test_set_role_and_missing_profile() {
        let db = Database::new_in_memory().await.unwrap();
        let profile = db.create_profile(new_profile("x@y.io")).await.unwrap();
        let admin = db.set_profile_role(&profile.id, Role::Staff).await.unwrap();
        assert_eq!(admin.role, Role::Staff);

        let err = db.set_profile_role("nope", Role::Admin).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { entity: "profile", .. }));
        let err = db.delete_profile("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
