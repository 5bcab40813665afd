// crates/db/src/queries/blog.rs
//! Public marketing-site content: posts, categories and tags.

use std::collections::HashMap;

use agencydesk_core::{require_text, slugify, ValidationError};
use agencydesk_types::{ChangeOp, PostStatus, Table};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use ts_rs::TS;

use super::row::{double_option, enum_col, Changes};
use crate::{new_id, now, Database, DbError, DbResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct BlogCategory {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[ts(type = "number")]
    pub created_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for BlogCategory {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct BlogTag {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[ts(type = "number")]
    pub created_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for BlogTag {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image_url: Option<String>,
    pub status: PostStatus,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub tags: Vec<BlogTag>,
    #[ts(type = "number | null")]
    pub published_at: Option<i64>,
    #[ts(type = "number")]
    pub created_at: i64,
    #[ts(type = "number")]
    pub updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for BlogPost {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            excerpt: row.try_get("excerpt")?,
            content: row.try_get("content")?,
            cover_image_url: row.try_get("cover_image_url")?,
            status: enum_col(row, "status")?,
            author_id: row.try_get("author_id")?,
            author_name: row.try_get("author_name")?,
            category_id: row.try_get("category_id")?,
            category_name: row.try_get("category_name")?,
            tags: Vec::new(),
            published_at: row.try_get("published_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    /// Derived from the title when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub excerpt: Option<Option<String>>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub cover_image_url: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<String>>,
}

/// Name plus optional slug, for categories and tags.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct NewTerm {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

const POST_SELECT: &str = "
    SELECT bp.id, bp.title, bp.slug, bp.excerpt, bp.content, bp.cover_image_url, bp.status,
           bp.author_id, COALESCE(p.full_name, p.email) AS author_name,
           bp.category_id, bc.name AS category_name,
           bp.published_at, bp.created_at, bp.updated_at
    FROM blog_posts bp
    LEFT JOIN profiles p ON p.id = bp.author_id
    LEFT JOIN blog_categories bc ON bc.id = bp.category_id";

/// Slug from an explicit value or, failing that, from the name.
fn resolve_slug(explicit: Option<&str>, fallback: &str) -> Result<String, ValidationError> {
    let slug = slugify(explicit.filter(|s| !s.trim().is_empty()).unwrap_or(fallback));
    if slug.is_empty() {
        Err(ValidationError::empty("slug"))
    } else {
        Ok(slug)
    }
}

impl Database {
    /// Published posts for the public site, newest publication first.
    pub async fn list_published_posts(&self) -> DbResult<Vec<BlogPost>> {
        let mut posts = sqlx::query_as::<_, BlogPost>(&format!(
            "{POST_SELECT} WHERE bp.status = 'published'
             ORDER BY bp.published_at DESC, bp.rowid DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        self.attach_tags(&mut posts).await?;
        Ok(posts)
    }

    /// A published post by slug. Drafts are not visible here.
    pub async fn get_post_by_slug(&self, slug: &str) -> DbResult<BlogPost> {
        let post = sqlx::query_as::<_, BlogPost>(&format!(
            "{POST_SELECT} WHERE bp.slug = ? AND bp.status = 'published'"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DbError::not_found("post", slug))?;
        self.with_tags(post).await
    }

    /// Every post, drafts included.
    pub async fn list_posts(&self) -> DbResult<Vec<BlogPost>> {
        let mut posts = sqlx::query_as::<_, BlogPost>(&format!(
            "{POST_SELECT} ORDER BY bp.created_at DESC, bp.rowid DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        self.attach_tags(&mut posts).await?;
        Ok(posts)
    }

    pub async fn get_post(&self, id: &str) -> DbResult<BlogPost> {
        let post = sqlx::query_as::<_, BlogPost>(&format!("{POST_SELECT} WHERE bp.id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DbError::not_found("post", id))?;
        self.with_tags(post).await
    }

    pub async fn create_post(&self, input: NewPost) -> DbResult<BlogPost> {
        let title = require_text("title", &input.title)?;
        let slug = resolve_slug(input.slug.as_deref(), title)?;
        let status = input.status.unwrap_or(PostStatus::Draft);
        let ts = now();
        let published_at = (status == PostStatus::Published).then_some(ts);

        let id = new_id();
        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT INTO blog_posts (id, title, slug, excerpt, content, cover_image_url, status,
                                     author_id, category_id, published_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(title)
        .bind(&slug)
        .bind(&input.excerpt)
        .bind(&input.content)
        .bind(&input.cover_image_url)
        .bind(status.as_str())
        .bind(&input.author_id)
        .bind(&input.category_id)
        .bind(published_at)
        .bind(ts)
        .bind(ts)
        .execute(&mut *tx)
        .await?;
        for tag_id in &input.tag_ids {
            sqlx::query("INSERT OR IGNORE INTO blog_post_tags (post_id, tag_id) VALUES (?, ?)")
                .bind(&id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        self.notify(Table::BlogPosts, ChangeOp::Insert, &id);
        self.get_post(&id).await
    }

    /// Publishing stamps `published_at` the first time. The slug only
    /// changes when one is given explicitly.
    pub async fn update_post(&self, id: &str, patch: PostPatch) -> DbResult<BlogPost> {
        let title = patch
            .title
            .as_deref()
            .map(|t| require_text("title", t).map(str::to_string))
            .transpose()?;
        let slug = patch
            .slug
            .as_deref()
            .map(|s| resolve_slug(Some(s), s))
            .transpose()?;

        let mut changes = Changes::new("blog_posts");
        changes
            .set("title", title)
            .set("slug", slug)
            .set("excerpt", patch.excerpt)
            .set("content", patch.content)
            .set("cover_image_url", patch.cover_image_url)
            .set("status", patch.status.map(PostStatus::as_str))
            .set("category_id", patch.category_id);
        if changes.apply(self.pool(), id).await? == 0 {
            return Err(DbError::not_found("post", id));
        }
        if patch.status == Some(PostStatus::Published) {
            sqlx::query(
                "UPDATE blog_posts SET published_at = ? WHERE id = ? AND published_at IS NULL",
            )
            .bind(now())
            .bind(id)
            .execute(self.pool())
            .await?;
        }
        self.notify(Table::BlogPosts, ChangeOp::Update, id);
        self.get_post(id).await
    }

    pub async fn delete_post(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("post", id));
        }
        self.notify(Table::BlogPosts, ChangeOp::Delete, id);
        Ok(())
    }

    /// Replace the post's tag set.
    pub async fn set_post_tags(&self, post_id: &str, tag_ids: &[String]) -> DbResult<BlogPost> {
        let mut tx = self.pool().begin().await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM blog_posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("post", post_id));
        }
        sqlx::query("DELETE FROM blog_post_tags WHERE post_id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        for tag_id in tag_ids {
            sqlx::query("INSERT OR IGNORE INTO blog_post_tags (post_id, tag_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("UPDATE blog_posts SET updated_at = ? WHERE id = ?")
            .bind(now())
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.notify(Table::BlogPosts, ChangeOp::Update, post_id);
        self.get_post(post_id).await
    }

    async fn with_tags(&self, post: BlogPost) -> DbResult<BlogPost> {
        let id = post.id.clone();
        let mut posts = vec![post];
        self.attach_tags(&mut posts).await?;
        posts.pop().ok_or_else(|| DbError::not_found("post", id))
    }

    async fn attach_tags(&self, posts: &mut [BlogPost]) -> DbResult<()> {
        if posts.is_empty() {
            return Ok(());
        }
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT pt.post_id, t.id, t.name, t.slug, t.created_at
             FROM blog_post_tags pt
             JOIN blog_tags t ON t.id = pt.tag_id
             WHERE pt.post_id IN (",
        );
        let mut ids = qb.separated(", ");
        for post in posts.iter() {
            ids.push_bind(post.id.clone());
        }
        ids.push_unseparated(") ORDER BY t.name");
        let rows = qb.build().fetch_all(self.pool()).await?;

        let mut by_post: HashMap<String, Vec<BlogTag>> = HashMap::new();
        for row in rows {
            let post_id: String = row.try_get("post_id")?;
            by_post.entry(post_id).or_default().push(BlogTag {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                slug: row.try_get("slug")?,
                created_at: row.try_get("created_at")?,
            });
        }
        for post in posts.iter_mut() {
            post.tags = by_post.remove(&post.id).unwrap_or_default();
        }
        Ok(())
    }

    // ── Categories ───────────────────────────────────────────────────

    pub async fn list_categories(&self) -> DbResult<Vec<BlogCategory>> {
        let rows = sqlx::query_as::<_, BlogCategory>(
            "SELECT id, name, slug, created_at FROM blog_categories ORDER BY name",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn create_category(&self, input: NewTerm) -> DbResult<BlogCategory> {
        let name = require_text("name", &input.name)?;
        let slug = resolve_slug(input.slug.as_deref(), name)?;
        let id = new_id();
        sqlx::query(
            "INSERT INTO blog_categories (id, name, slug, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(&slug)
        .bind(now())
        .execute(self.pool())
        .await?;
        self.notify(Table::BlogCategories, ChangeOp::Insert, &id);

        sqlx::query_as::<_, BlogCategory>(
            "SELECT id, name, slug, created_at FROM blog_categories WHERE id = ?",
        )
        .bind(&id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DbError::not_found("category", &id))
    }

    /// Posts in the category keep existing, uncategorized.
    pub async fn delete_category(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM blog_categories WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("category", id));
        }
        self.notify(Table::BlogCategories, ChangeOp::Delete, id);
        Ok(())
    }

    // ── Tags ─────────────────────────────────────────────────────────

    pub async fn list_tags(&self) -> DbResult<Vec<BlogTag>> {
        let rows = sqlx::query_as::<_, BlogTag>(
            "SELECT id, name, slug, created_at FROM blog_tags ORDER BY name",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn create_tag(&self, input: NewTerm) -> DbResult<BlogTag> {
        let name = require_text("name", &input.name)?;
        let slug = resolve_slug(input.slug.as_deref(), name)?;
        let id = new_id();
        sqlx::query("INSERT INTO blog_tags (id, name, slug, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(&slug)
            .bind(now())
            .execute(self.pool())
            .await?;
        self.notify(Table::BlogTags, ChangeOp::Insert, &id);

        sqlx::query_as::<_, BlogTag>("SELECT id, name, slug, created_at FROM blog_tags WHERE id = ?")
            .bind(&id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DbError::not_found("tag", &id))
    }

    pub async fn delete_tag(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM blog_tags WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("tag", id));
        }
        self.notify(Table::BlogTags, ChangeOp::Delete, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str) -> NewPost {
        NewPost {
            title: title.into(),
            content: "<p>Body</p>".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_slug_derived_from_title() {
        let db = Database::new_in_memory().await.unwrap();
        let created = db.create_post(post("10 SEO Tips for 2026!")).await.unwrap();
        assert_eq!(created.slug, "10-seo-tips-for-2026");
        assert_eq!(created.status, PostStatus::Draft);
        assert_eq!(created.published_at, None);

        let err = db.create_post(post("!!!")).await.unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_constraint() {
        let db = Database::new_in_memory().await.unwrap();
        db.create_post(post("Same title")).await.unwrap();
        let err = db.create_post(post("Same title")).await.unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_drafts_hidden_from_public_reads() {
        let db = Database::new_in_memory().await.unwrap();
        let draft = db.create_post(post("Work in progress")).await.unwrap();
        assert!(db.list_published_posts().await.unwrap().is_empty());
        assert!(matches!(
            db.get_post_by_slug(&draft.slug).await,
            Err(DbError::NotFound { .. })
        ));

        let published = db
            .update_post(
                &draft.id,
                PostPatch {
                    status: Some(PostStatus::Published),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(published.published_at.is_some());
        assert_eq!(db.get_post_by_slug(&draft.slug).await.unwrap().id, draft.id);
        assert_eq!(db.list_posts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tags_and_categories() {
        let db = Database::new_in_memory().await.unwrap();
        let category = db
            .create_category(NewTerm {
                name: "Social Media".into(),
                slug: None,
            })
            .await
            .unwrap();
        assert_eq!(category.slug, "social-media");

        let seo = db
            .create_tag(NewTerm {
                name: "SEO".into(),
                slug: None,
            })
            .await
            .unwrap();
        let ads = db
            .create_tag(NewTerm {
                name: "Ads".into(),
                slug: None,
            })
            .await
            .unwrap();

        let created = db
            .create_post(NewPost {
                category_id: Some(category.id.clone()),
                tag_ids: vec![seo.id.clone()],
                ..post("Reels that convert")
            })
            .await
            .unwrap();
        assert_eq!(created.category_name.as_deref(), Some("Social Media"));
        assert_eq!(created.tags, vec![seo.clone()]);

        let retagged = db
            .set_post_tags(&created.id, &[ads.id.clone(), seo.id.clone()])
            .await
            .unwrap();
        let names: Vec<&str> = retagged.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Ads", "SEO"]);

        db.delete_category(&category.id).await.unwrap();
        let uncategorized = db.get_post(&created.id).await.unwrap();
        assert_eq!(uncategorized.category_id, None);

        db.delete_tag(&seo.id).await.unwrap();
        assert_eq!(db.get_post(&created.id).await.unwrap().tags, vec![ads]);
    }
}
