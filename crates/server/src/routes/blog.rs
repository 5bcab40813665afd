// crates/server/src/routes/blog.rs
//! Blog endpoints.
//!
//! Public site:
//! - `GET /api/blog/posts`          -- published posts only
//! - `GET /api/blog/posts/{slug}`   -- a published post by slug
//!
//! Editor:
//! - `GET|POST /api/blog/admin/posts`
//! - `GET|PATCH|DELETE /api/blog/admin/posts/{id}`
//! - `PUT /api/blog/admin/posts/{id}/tags`
//! - `GET|POST /api/blog/categories`, `DELETE /api/blog/categories/{id}`
//! - `GET|POST /api/blog/tags`, `DELETE /api/blog/tags/{id}`

use std::sync::Arc;

use agencydesk_db::{BlogCategory, BlogPost, BlogTag, NewPost, NewTerm, OrEmpty, PostPatch};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/blog/posts", get(list_published))
        .route("/blog/posts/{slug}", get(get_published))
        .route("/blog/admin/posts", get(list_all_posts).post(create_post))
        .route(
            "/blog/admin/posts/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/blog/admin/posts/{id}/tags", put(set_tags))
        .route("/blog/categories", get(list_categories).post(create_category))
        .route("/blog/categories/{id}", delete(delete_category))
        .route("/blog/tags", get(list_tags).post(create_tag))
        .route("/blog/tags/{id}", delete(delete_tag))
}

async fn list_published(State(state): State<Arc<AppState>>) -> Json<Vec<BlogPost>> {
    Json(state.db.list_published_posts().await.or_empty("published posts"))
}

async fn get_published(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<Json<BlogPost>> {
    Ok(Json(state.db.get_post_by_slug(&slug).await?))
}

async fn list_all_posts(State(state): State<Arc<AppState>>) -> Json<Vec<BlogPost>> {
    Json(state.db.list_posts().await.or_empty("posts"))
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BlogPost>> {
    Ok(Json(state.db.get_post(&id).await?))
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewPost>,
) -> ApiResult<(StatusCode, Json<BlogPost>)> {
    let post = state.db.create_post(input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<PostPatch>,
) -> ApiResult<Json<BlogPost>> {
    Ok(Json(state.db.update_post(&id, patch).await?))
}

async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_post(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagSet {
    tag_ids: Vec<String>,
}

/// Replaces the post's tags with exactly `tagIds`.
async fn set_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<TagSet>,
) -> ApiResult<Json<BlogPost>> {
    Ok(Json(state.db.set_post_tags(&id, &body.tag_ids).await?))
}

async fn list_categories(State(state): State<Arc<AppState>>) -> Json<Vec<BlogCategory>> {
    Json(state.db.list_categories().await.or_empty("blog categories"))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewTerm>,
) -> ApiResult<(StatusCode, Json<BlogCategory>)> {
    let category = state.db.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_category(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_tags(State(state): State<Arc<AppState>>) -> Json<Vec<BlogTag>> {
    Json(state.db.list_tags().await.or_empty("blog tags"))
}

async fn create_tag(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewTerm>,
) -> ApiResult<(StatusCode, Json<BlogTag>)> {
    let tag = state.db.create_tag(input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_tag(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
