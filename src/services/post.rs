//! Post service
//!
//! Business rules for posts on top of `PostRepository`:
//! - slug uniqueness, checked before insert and when a slug changes
//! - ownership: only the author or an admin may edit or delete
//! - publication timestamp bookkeeping
//! - generated excerpts and rendered detail views

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::blocks::{extract_seo, SeoData};
use crate::db::repositories::PostRepository;
use crate::models::{
    Actor, ContentStatus, CreatePostInput, ListParams, PagedResult, Post, PostFilter, UpdatePostInput,
};
use crate::services::content::ContentRenderer;
use crate::services::error::{ServiceError, ServiceResult, INSUFFICIENT_PERMISSIONS, SLUG_EXISTS};

const POST_NOT_FOUND: &str = "Post not found";

/// A post with its rendered HTML and SEO data, as served by the detail view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPost {
    #[serde(flatten)]
    pub post: Post,
    pub rendered_content: String,
    pub seo: SeoData,
}

pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    renderer: ContentRenderer,
}

impl PostService {
    pub fn new(post_repo: Arc<dyn PostRepository>, renderer: ContentRenderer) -> Self {
        Self { post_repo, renderer }
    }

    pub async fn list(&self, filter: &PostFilter, params: &ListParams) -> ServiceResult<PagedResult<Post>> {
        let (posts, total) = self.post_repo.list(filter, params).await?;
        Ok(PagedResult::new(posts, total, params))
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Post> {
        self.post_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(POST_NOT_FOUND))
    }

    /// Get a post together with its rendered content.
    pub async fn get_rendered(&self, id: i64) -> ServiceResult<RenderedPost> {
        let post = self.get(id).await?;
        let rendered = self.renderer.render(&post.content).await;

        Ok(RenderedPost {
            post,
            rendered_content: rendered.html,
            seo: rendered.seo,
        })
    }

    pub async fn create(&self, actor: &Actor, input: CreatePostInput) -> ServiceResult<Post> {
        if input.title.trim().is_empty() || input.slug.trim().is_empty() {
            return Err(ServiceError::validation("Invalid request data"));
        }
        if self.post_repo.slug_exists(&input.slug, None).await? {
            return Err(ServiceError::validation(SLUG_EXISTS));
        }

        let mut post = Post::new(input.title, input.slug, input.content, actor.id);
        post.excerpt = match input.excerpt.filter(|e| !e.is_empty()) {
            Some(excerpt) => Some(excerpt),
            None => Some(extract_seo(&post.content).description),
        };
        post.status = input.status.unwrap_or_default();
        if post.status.is_published() {
            post.published_at = Some(input.published_at.unwrap_or_else(Utc::now));
        }

        let created = self
            .post_repo
            .create(&post)
            .await
            .map_err(|e| ServiceError::from_write(e, SLUG_EXISTS))?;
        tracing::info!("Post {} created by user {}", created.slug, actor.id);
        Ok(created)
    }

    pub async fn update(&self, actor: &Actor, id: i64, input: UpdatePostInput) -> ServiceResult<Post> {
        if input.title.as_deref().is_some_and(|t| t.trim().is_empty())
            || input.slug.as_deref().is_some_and(|s| s.trim().is_empty())
        {
            return Err(ServiceError::validation("Invalid request data"));
        }

        let mut post = self.get(id).await?;
        if !actor.can_manage(post.author_id) {
            return Err(ServiceError::forbidden(INSUFFICIENT_PERMISSIONS));
        }

        if let Some(slug) = input.slug {
            if slug != post.slug && self.post_repo.slug_exists(&slug, Some(id)).await? {
                return Err(ServiceError::validation(SLUG_EXISTS));
            }
            post.slug = slug;
        }
        if let Some(title) = input.title {
            post.title = title;
        }
        if let Some(content) = input.content {
            post.content = content;
        }
        if let Some(excerpt) = input.excerpt {
            post.excerpt = Some(excerpt);
        }

        apply_status_change(&mut post, input.status, input.published_at);

        self.post_repo
            .update(&post)
            .await
            .map_err(|e| ServiceError::from_write(e, SLUG_EXISTS))
    }

    /// Delete a post, returning its id.
    pub async fn delete(&self, actor: &Actor, id: i64) -> ServiceResult<i64> {
        let post = self.get(id).await?;
        if !actor.can_manage(post.author_id) {
            return Err(ServiceError::forbidden(INSUFFICIENT_PERMISSIONS));
        }

        if !self.post_repo.delete(id).await? {
            return Err(ServiceError::not_found(POST_NOT_FOUND));
        }
        tracing::info!("Post {} deleted by user {}", post.slug, actor.id);
        Ok(id)
    }
}

/// Publication bookkeeping for an update.
///
/// Publishing for the first time stamps `published_at` (the given time, or
/// now). Moving to a non-published status clears it. Leaving the status out
/// keeps the existing timestamp, though an explicit time still replaces it
/// on a published post.
fn apply_status_change(
    post: &mut Post,
    status: Option<ContentStatus>,
    published_at: Option<chrono::DateTime<Utc>>,
) {
    match status {
        Some(status) if !status.is_published() => {
            post.status = status;
            post.published_at = None;
        }
        Some(status) => {
            post.status = status;
            if let Some(at) = published_at {
                post.published_at = Some(at);
            } else if post.published_at.is_none() {
                post.published_at = Some(Utc::now());
            }
        }
        None => {
            if post.status.is_published() {
                if let Some(at) = published_at {
                    post.published_at = Some(at);
                }
            }
        }
    }
}
