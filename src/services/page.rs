//! Page service
//!
//! Same rules as posts, without excerpts or publication timestamps.

use serde::Serialize;
use std::sync::Arc;

use crate::blocks::SeoData;
use crate::db::repositories::PageRepository;
use crate::models::{Actor, CreatePageInput, ListParams, Page, PageFilter, PagedResult, UpdatePageInput};
use crate::services::content::ContentRenderer;
use crate::services::error::{ServiceError, ServiceResult, INSUFFICIENT_PERMISSIONS, SLUG_EXISTS};

const PAGE_NOT_FOUND: &str = "Page not found";

/// A page with its rendered HTML and SEO data
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    #[serde(flatten)]
    pub page: Page,
    pub rendered_content: String,
    pub seo: SeoData,
}

pub struct PageService {
    page_repo: Arc<dyn PageRepository>,
    renderer: ContentRenderer,
}

impl PageService {
    pub fn new(page_repo: Arc<dyn PageRepository>, renderer: ContentRenderer) -> Self {
        Self { page_repo, renderer }
    }

    pub async fn list(&self, filter: &PageFilter, params: &ListParams) -> ServiceResult<PagedResult<Page>> {
        let (pages, total) = self.page_repo.list(filter, params).await?;
        Ok(PagedResult::new(pages, total, params))
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Page> {
        self.page_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(PAGE_NOT_FOUND))
    }

    pub async fn get_rendered(&self, id: i64) -> ServiceResult<RenderedPage> {
        let page = self.get(id).await?;
        let rendered = self.renderer.render(&page.content).await;

        Ok(RenderedPage {
            page,
            rendered_content: rendered.html,
            seo: rendered.seo,
        })
    }

    pub async fn create(&self, actor: &Actor, input: CreatePageInput) -> ServiceResult<Page> {
        if input.title.trim().is_empty() || input.slug.trim().is_empty() {
            return Err(ServiceError::validation("Invalid request data"));
        }
        if self.page_repo.slug_exists(&input.slug, None).await? {
            return Err(ServiceError::validation(SLUG_EXISTS));
        }

        let mut page = Page::new(input.title, input.slug, input.content, actor.id);
        page.status = input.status.unwrap_or_default();

        let created = self
            .page_repo
            .create(&page)
            .await
            .map_err(|e| ServiceError::from_write(e, SLUG_EXISTS))?;
        tracing::info!("Page {} created by user {}", created.slug, actor.id);
        Ok(created)
    }

    pub async fn update(&self, actor: &Actor, id: i64, input: UpdatePageInput) -> ServiceResult<Page> {
        if input.title.as_deref().is_some_and(|t| t.trim().is_empty())
            || input.slug.as_deref().is_some_and(|s| s.trim().is_empty())
        {
            return Err(ServiceError::validation("Invalid request data"));
        }

        let mut page = self.get(id).await?;
        if !actor.can_manage(page.author_id) {
            return Err(ServiceError::forbidden(INSUFFICIENT_PERMISSIONS));
        }

        if let Some(slug) = input.slug {
            if slug != page.slug && self.page_repo.slug_exists(&slug, Some(id)).await? {
                return Err(ServiceError::validation(SLUG_EXISTS));
            }
            page.slug = slug;
        }
        if let Some(title) = input.title {
            page.title = title;
        }
        if let Some(content) = input.content {
            page.content = content;
        }
        if let Some(status) = input.status {
            page.status = status;
        }

        self.page_repo
            .update(&page)
            .await
            .map_err(|e| ServiceError::from_write(e, SLUG_EXISTS))
    }

    pub async fn delete(&self, actor: &Actor, id: i64) -> ServiceResult<i64> {
        let page = self.get(id).await?;
        if !actor.can_manage(page.author_id) {
            return Err(ServiceError::forbidden(INSUFFICIENT_PERMISSIONS));
        }

        if !self.page_repo.delete(id).await? {
            return Err(ServiceError::not_found(PAGE_NOT_FOUND));
        }
        tracing::info!("Page {} deleted by user {}", page.slug, actor.id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::{SqlxPageRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{ContentStatus, User, UserRole};

    async fn setup() -> (PageService, Actor, Actor) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::new(pool.clone());
        let owner = users
            .create(&User::new("owner".into(), "owner@example.com".into(), "hash".into(), UserRole::Editor))
            .await
            .unwrap();
        let other = users
            .create(&User::new("other".into(), "other@example.com".into(), "hash".into(), UserRole::Author))
            .await
            .unwrap();

        let service = PageService::new(
            SqlxPageRepository::boxed(pool),
            ContentRenderer::new(Arc::new(MemoryCache::new())),
        );
        (service, Actor::new(owner.id, owner.role), Actor::new(other.id, other.role))
    }

    fn input(slug: &str) -> CreatePageInput {
        CreatePageInput {
            title: "About".into(),
            slug: slug.into(),
            content: "<!-- wp:heading {\"level\":3} -->About us<!-- /wp:heading -->".into(),
            status: Some(ContentStatus::Published),
        }
    }

    #[tokio::test]
    async fn test_create_and_render() {
        let (service, owner, _) = setup().await;
        let page = service.create(&owner, input("about")).await.unwrap();
        assert_eq!(page.status, ContentStatus::Published);

        let rendered = service.get_rendered(page.id).await.unwrap();
        assert_eq!(rendered.rendered_content, "<h3>About us</h3>");
        assert_eq!(rendered.seo.keywords, vec!["about"]);

        let json = serde_json::to_value(&rendered).unwrap();
        assert!(json.get("excerpt").is_none());
        assert!(json.get("publishedAt").is_none());
    }

    #[tokio::test]
    async fn test_slug_conflicts() {
        let (service, owner, other) = setup().await;
        service.create(&owner, input("taken")).await.unwrap();
        let err = service.create(&other, input("taken")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "Slug already exists"));
    }

    #[tokio::test]
    async fn test_update_and_delete_permissions() {
        let (service, owner, other) = setup().await;
        let page = service.create(&owner, input("mine")).await.unwrap();

        let err = service
            .update(&other, page.id, UpdatePageInput { status: Some(ContentStatus::Draft), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let updated = service
            .update(&owner, page.id, UpdatePageInput { status: Some(ContentStatus::Draft), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.status, ContentStatus::Draft);

        assert!(matches!(
            service.delete(&other, page.id).await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));
        assert_eq!(service.delete(&owner, page.id).await.unwrap(), page.id);
        assert!(matches!(
            service.get(page.id).await.unwrap_err(),
            ServiceError::NotFound(ref m) if m == "Page not found"
        ));
    }
}
