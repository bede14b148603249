//! Gutenberg block engine
//!
//! Post and page content is stored the way the block editor serializes it:
//! HTML interleaved with block delimiter comments.
//!
//! ```text
//! <!-- wp:heading {"level":3} -->
//! <h3>Hello</h3>
//! <!-- /wp:heading -->
//! ```
//!
//! This module turns such documents into a [`Block`] tree ([`parser`]),
//! renders the tree to HTML with a fixed dispatch table ([`render`]) and
//! derives SEO data from the text it contains ([`seo`]).
//!
//! All functions here are pure. Caching of rendered output lives in
//! `services::content`.

pub mod parser;
pub mod render;
pub mod seo;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub use parser::{decode_document, parse_blocks};
pub use render::{render_block, render_document};
pub use seo::{extract_seo, SeoData};

/// Block attributes, the JSON object from the opening delimiter
pub type Attrs = Map<String, Value>;

/// A node of the block tree.
///
/// A block without a name is *freeform*: raw HTML that sat outside any block
/// delimiters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Fully qualified name such as `core/paragraph`
    #[serde(rename = "blockName", default)]
    pub block_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty_attrs")]
    pub attrs: Attrs,
    #[serde(rename = "innerBlocks", default)]
    pub inner_blocks: Vec<Block>,
    /// The block's own HTML, without the HTML of its inner blocks
    #[serde(rename = "innerHTML", default)]
    pub inner_html: String,
    /// HTML chunks in document order; `None` marks where an inner block sits
    #[serde(rename = "innerContent", default)]
    pub inner_content: Vec<Option<String>>,
}

impl Block {
    /// Create a named block with no content
    pub fn new(name: impl Into<String>, attrs: Attrs) -> Self {
        Self {
            block_name: Some(name.into()),
            attrs,
            inner_blocks: Vec::new(),
            inner_html: String::new(),
            inner_content: Vec::new(),
        }
    }

    /// Create a freeform block holding raw HTML
    pub fn freeform(html: impl Into<String>) -> Self {
        let html = html.into();
        Self {
            block_name: None,
            attrs: Attrs::new(),
            inner_blocks: Vec::new(),
            inner_content: vec![Some(html.clone())],
            inner_html: html,
        }
    }

    pub fn is_freeform(&self) -> bool {
        self.block_name.is_none()
    }

    /// Append an HTML chunk to this block's own content
    pub(crate) fn push_html(&mut self, html: &str) {
        self.inner_html.push_str(html);
        self.inner_content.push(Some(html.to_string()));
    }
}

fn null_as_empty_attrs<'de, D>(deserializer: D) -> Result<Attrs, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Attrs>::deserialize(deserializer)?.unwrap_or_default())
}

/// Rendered HTML together with the SEO data of the same document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedContent {
    pub html: String,
    pub seo: SeoData,
}

/// Render a document and extract its SEO data in one pass over the parse.
pub fn render_content(content: &str) -> RenderedContent {
    let blocks = decode_document(content);
    RenderedContent {
        html: render::render_blocks(&blocks),
        seo: seo::extract_seo_from_blocks(&blocks),
    }
}
