//! Content rendering with a read-through cache
//!
//! Rendering a block document is a pure function of its text, so results are
//! cached under the SHA-256 of the content. An edit changes the hash and the
//! stale entry simply ages out.

use data_encoding::HEXLOWER;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::blocks::{render_content, RenderedContent};
use crate::cache::{CacheLayer, MemoryCache};

/// Renders stored documents to HTML plus SEO data.
#[derive(Debug, Clone)]
pub struct ContentRenderer {
    cache: Arc<MemoryCache>,
}

impl ContentRenderer {
    pub fn new(cache: Arc<MemoryCache>) -> Self {
        Self { cache }
    }

    /// Render a document, serving repeated content from the cache.
    ///
    /// Cache failures are logged and fall back to rendering.
    pub async fn render(&self, content: &str) -> RenderedContent {
        let key = cache_key(content);

        match self.cache.get::<RenderedContent>(&key).await {
            Ok(Some(rendered)) => return rendered,
            Ok(None) => {}
            Err(e) => tracing::warn!("Discarding unreadable render cache entry {}: {}", key, e),
        }

        let rendered = render_content(content);
        if let Err(e) = self.cache.set(&key, &rendered).await {
            tracing::warn!("Failed to cache rendered content: {}", e);
        }
        rendered
    }
}

fn cache_key(content: &str) -> String {
    format!("render:{}", HEXLOWER.encode(&Sha256::digest(content.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<!-- wp:paragraph -->Hello cached world<!-- /wp:paragraph -->";

    #[tokio::test]
    async fn test_render_matches_uncached() {
        let renderer = ContentRenderer::new(Arc::new(MemoryCache::new()));
        let rendered = renderer.render(DOC).await;

        assert_eq!(rendered, render_content(DOC));
        assert_eq!(rendered.html, "<p>Hello cached world</p>");
        assert_eq!(rendered.seo.word_count, 3);
    }

    #[tokio::test]
    async fn test_second_render_is_served_from_cache() {
        let cache = Arc::new(MemoryCache::new());
        let renderer = ContentRenderer::new(cache.clone());

        renderer.render(DOC).await;
        let cached: Option<RenderedContent> = cache.get(&cache_key(DOC)).await.unwrap();
        assert_eq!(cached, Some(render_content(DOC)));

        // A planted entry proves the read goes through the cache.
        let planted = RenderedContent {
            html: "<p>planted</p>".to_string(),
            seo: Default::default(),
        };
        cache.set(&cache_key(DOC), &planted).await.unwrap();
        assert_eq!(renderer.render(DOC).await, planted);
    }

    #[test]
    fn test_cache_key_depends_on_content() {
        assert_eq!(cache_key("a"), cache_key("a"));
        assert_ne!(cache_key("a"), cache_key("b"));
        assert!(cache_key("").starts_with("render:"));
        assert_eq!(cache_key("").len(), "render:".len() + 64);
    }
}
