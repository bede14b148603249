//! Block renderer
//!
//! Maps each block to HTML through a fixed dispatch on its name. Container
//! blocks (columns, group, buttons, ...) wrap the HTML of their rendered
//! inner blocks; leaf blocks wrap their own inner HTML. Unknown blocks fall
//! back to a `wp-block-<namespace>-<name>` div.
//!
//! Attribute values are escaped before they are written into the output.
//! Inner HTML comes from the editor and is passed through unchanged.

use serde_json::Value;

use super::{decode_document, Attrs, Block};

/// Render a stored document to HTML. Top-level blocks are joined with `\n`.
pub fn render_document(content: &str) -> String {
    render_blocks(&decode_document(content))
}

pub(crate) fn render_blocks(blocks: &[Block]) -> String {
    blocks.iter().map(render_block).collect::<Vec<_>>().join("\n")
}

/// Render a single block, recursing into its inner blocks.
pub fn render_block(block: &Block) -> String {
    let Some(name) = block.block_name.as_deref() else {
        return block.inner_html.clone();
    };

    let attrs = &block.attrs;
    let html = block.inner_html.as_str();
    let class_name = attr_text(attrs, "className");

    match name {
        "core/paragraph" => {
            let class = optional_attr("class", class_name.as_deref());
            let style = attr_text(attrs, "align")
                .map(|align| format!(" style=\"text-align: {}\"", escape_attr(&align)))
                .unwrap_or_default();
            format!("<p{}{}>{}</p>", class, style, html)
        }
        "core/heading" => {
            let level = heading_level(attrs);
            let class = optional_attr("class", class_name.as_deref());
            let style = attr_text(attrs, "textAlign")
                .map(|align| format!(" style=\"text-align: {}\"", escape_attr(&align)))
                .unwrap_or_default();
            format!("<h{level}{}{}>{}</h{level}>", class, style, html)
        }
        "core/image" => render_image(attrs, class_name.as_deref()),
        "core/list" => {
            let tag = if is_truthy(attrs.get("ordered")) { "ol" } else { "ul" };
            let class = optional_attr("class", class_name.as_deref());
            format!("<{tag}{}>{}</{tag}>", class, html)
        }
        "core/list-item" => format!("<li>{}</li>", html),
        "core/quote" => {
            format!("<blockquote{}>{}</blockquote>", block_class("wp-block-quote", class_name.as_deref()), html)
        }
        "core/code" => {
            format!("<pre{}><code>{}</code></pre>", block_class("wp-block-code", class_name.as_deref()), html)
        }
        "core/preformatted" => {
            format!("<pre{}>{}</pre>", block_class("wp-block-preformatted", class_name.as_deref()), html)
        }
        "core/columns" => container("wp-block-columns", class_name.as_deref(), "", block),
        "core/column" => {
            let style = attr_text(attrs, "width")
                .map(|width| format!(" style=\"flex-basis: {}\"", escape_attr(&width)))
                .unwrap_or_default();
            container("wp-block-column", class_name.as_deref(), &style, block)
        }
        "core/group" => container("wp-block-group", class_name.as_deref(), "", block),
        "core/media-text" => container("wp-block-media-text", class_name.as_deref(), "", block),
        "core/buttons" => container("wp-block-buttons", class_name.as_deref(), "", block),
        "core/embed" | "core-embed/youtube" | "core-embed/vimeo" => {
            let body = if html.is_empty() {
                escape_attr(&attr_text(attrs, "url").unwrap_or_default())
            } else {
                html.to_string()
            };
            format!(
                "<figure{}><div class=\"wp-block-embed__wrapper\">{}</div></figure>",
                block_class("wp-block-embed", class_name.as_deref()),
                body
            )
        }
        "core/separator" => {
            format!("<hr{} />", block_class("wp-block-separator", class_name.as_deref()))
        }
        "core/spacer" => {
            let style = attr_text(attrs, "height")
                .map(|height| format!(" style=\"height: {}px\"", escape_attr(&height)))
                .unwrap_or_default();
            format!("<div{}{}></div>", block_class("wp-block-spacer", class_name.as_deref()), style)
        }
        "core/button" => {
            let text = if html.is_empty() {
                escape_attr(&attr_text(attrs, "text").unwrap_or_default())
            } else {
                html.to_string()
            };
            let url = attr_text(attrs, "url").unwrap_or_else(|| "#".to_string());
            let mut classes = vec!["wp-block-button__link".to_string()];
            classes.extend(class_name.as_deref().map(escape_attr));
            format!(
                "<div class=\"wp-block-button\"><a class=\"{}\" href=\"{}\">{}</a></div>",
                classes.join(" "),
                escape_attr(&url),
                text
            )
        }
        other => {
            let fallback = format!("wp-block-{}", other.replacen('/', "-", 1));
            let custom = class_name
                .map(|class| format!(" {}", escape_attr(&class)))
                .unwrap_or_default();
            format!(
                "<div class=\"{}{}\">{}{}</div>",
                escape_attr(&fallback),
                custom,
                html,
                render_inner(block)
            )
        }
    }
}

fn render_image(attrs: &Attrs, class_name: Option<&str>) -> String {
    let src = attr_text(attrs, "url")
        .or_else(|| attr_text(attrs, "src"))
        .unwrap_or_default();
    let alt = attr_text(attrs, "alt").unwrap_or_default();
    let id = attr_text(attrs, "id")
        .map(|id| format!(" id=\"wp-image-{}\"", escape_attr(&id)))
        .unwrap_or_default();

    let mut classes = vec!["wp-image".to_string()];
    if let Some(class) = class_name {
        classes.push(escape_attr(class));
    }
    if let Some(size) = attr_text(attrs, "sizeSlug") {
        classes.push(format!("size-{}", escape_attr(&size)));
    }

    let img = format!(
        "<img{} src=\"{}\" alt=\"{}\" class=\"{}\" />",
        id,
        escape_attr(&src),
        escape_attr(&alt),
        classes.join(" ")
    );

    // Captions are rich text and keep their markup, like inner HTML does.
    match attr_text(attrs, "caption") {
        Some(caption) => format!(
            "<figure class=\"wp-block-image\">{}<figcaption>{}</figcaption></figure>",
            img, caption
        ),
        None => format!("<figure class=\"wp-block-image\">{}</figure>", img),
    }
}

/// `<div class="base [className]"{extra}>rendered inner blocks</div>`
fn container(base: &str, class_name: Option<&str>, extra: &str, block: &Block) -> String {
    format!("<div{}{}>{}</div>", block_class(base, class_name), extra, render_inner(block))
}

fn render_inner(block: &Block) -> String {
    block.inner_blocks.iter().map(render_block).collect()
}

/// ` class="base"` or ` class="base custom"`
fn block_class(base: &str, class_name: Option<&str>) -> String {
    match class_name {
        Some(class) => format!(" class=\"{} {}\"", base, escape_attr(class)),
        None => format!(" class=\"{}\"", base),
    }
}

fn optional_attr(name: &str, value: Option<&str>) -> String {
    value
        .map(|v| format!(" {}=\"{}\"", name, escape_attr(v)))
        .unwrap_or_default()
}

/// Heading level from `attrs.level`, limited to 1..=6 (default 2)
fn heading_level(attrs: &Attrs) -> u8 {
    let level = match attrs.get("level") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match level {
        Some(level @ 1..=6) => level as u8,
        _ => 2,
    }
}

/// Whether an attribute counts as set: present and not null, false, 0 or "".
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// A set attribute as text. Integral numbers print without a fraction.
fn attr_text(attrs: &Attrs, key: &str) -> Option<String> {
    let value = attrs.get(key);
    if !is_truthy(value) {
        return None;
    }
    value.map(|value| match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    })
}

/// Escape text for use inside a double-quoted HTML attribute or as element text.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(name: &str, attrs: serde_json::Value, html: &str) -> Block {
        let mut block = Block::new(name, attrs.as_object().cloned().unwrap_or_default());
        if !html.is_empty() {
            block.push_html(html);
        }
        block
    }

    fn with_children(mut parent: Block, children: Vec<Block>) -> Block {
        for child in children {
            parent.inner_blocks.push(child);
            parent.inner_content.push(None);
        }
        parent
    }

    #[test]
    fn test_freeform_passes_through() {
        assert_eq!(render_block(&Block::freeform("<em>raw</em>")), "<em>raw</em>");
    }

    #[test]
    fn test_paragraph() {
        assert_eq!(render_block(&block("core/paragraph", json!({}), "Hello")), "<p>Hello</p>");
        assert_eq!(
            render_block(&block("core/paragraph", json!({"align": "center", "className": "lead"}), "Hi")),
            "<p class=\"lead\" style=\"text-align: center\">Hi</p>"
        );
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(render_block(&block("core/heading", json!({}), "T")), "<h2>T</h2>");
        assert_eq!(
            render_block(&block("core/heading", json!({"level": 4, "textAlign": "right"}), "T")),
            "<h4 style=\"text-align: right\">T</h4>"
        );
        assert_eq!(render_block(&block("core/heading", json!({"level": 9}), "T")), "<h2>T</h2>");
        assert_eq!(render_block(&block("core/heading", json!({"level": "3"}), "T")), "<h3>T</h3>");
    }

    #[test]
    fn test_image_without_caption() {
        let image = block(
            "core/image",
            json!({"id": 12, "url": "/uploads/a.png", "alt": "A cat", "sizeSlug": "large"}),
            "",
        );
        assert_eq!(
            render_block(&image),
            "<figure class=\"wp-block-image\"><img id=\"wp-image-12\" src=\"/uploads/a.png\" alt=\"A cat\" class=\"wp-image size-large\" /></figure>"
        );
    }

    #[test]
    fn test_image_with_caption_and_src_fallback() {
        let image = block("core/image", json!({"src": "b.jpg", "caption": "Look", "className": "wide"}), "");
        assert_eq!(
            render_block(&image),
            "<figure class=\"wp-block-image\"><img src=\"b.jpg\" alt=\"\" class=\"wp-image wide\" /><figcaption>Look</figcaption></figure>"
        );
    }

    #[test]
    fn test_image_caption_keeps_markup() {
        let image = block(
            "core/image",
            json!({"url": "c.jpg", "caption": "Photo by <a href=\"https://example.com\">someone</a>, <em>2024</em>"}),
            "",
        );
        assert!(render_block(&image).ends_with(
            "<figcaption>Photo by <a href=\"https://example.com\">someone</a>, <em>2024</em></figcaption></figure>"
        ));
    }

    #[test]
    fn test_lists() {
        assert_eq!(render_block(&block("core/list", json!({}), "<li>a</li>")), "<ul><li>a</li></ul>");
        assert_eq!(
            render_block(&block("core/list", json!({"ordered": true, "className": "steps"}), "<li>a</li>")),
            "<ol class=\"steps\"><li>a</li></ol>"
        );
        assert_eq!(render_block(&block("core/list-item", json!({}), "a")), "<li>a</li>");
    }

    #[test]
    fn test_quote_code_preformatted() {
        assert_eq!(
            render_block(&block("core/quote", json!({}), "<p>q</p>")),
            "<blockquote class=\"wp-block-quote\"><p>q</p></blockquote>"
        );
        assert_eq!(
            render_block(&block("core/code", json!({"className": "rust"}), "fn main() {}")),
            "<pre class=\"wp-block-code rust\"><code>fn main() {}</code></pre>"
        );
        assert_eq!(
            render_block(&block("core/preformatted", json!({}), "  x")),
            "<pre class=\"wp-block-preformatted\">  x</pre>"
        );
    }

    #[test]
    fn test_columns_render_inner_blocks() {
        let columns = with_children(
            block("core/columns", json!({}), ""),
            vec![
                with_children(
                    block("core/column", json!({"width": "33%"}), ""),
                    vec![block("core/paragraph", json!({}), "a")],
                ),
                with_children(block("core/column", json!({}), ""), vec![block("core/separator", json!({}), "")]),
            ],
        );

        assert_eq!(
            render_block(&columns),
            "<div class=\"wp-block-columns\"><div class=\"wp-block-column\" style=\"flex-basis: 33%\"><p>a</p></div><div class=\"wp-block-column\"><hr class=\"wp-block-separator\" /></div></div>"
        );
    }

    #[test]
    fn test_group_and_media_text() {
        let group = with_children(
            block("core/group", json!({"className": "box"}), "<div></div>"),
            vec![block("core/paragraph", json!({}), "in")],
        );
        assert_eq!(render_block(&group), "<div class=\"wp-block-group box\"><p>in</p></div>");

        let media_text = block("core/media-text", json!({}), "");
        assert_eq!(render_block(&media_text), "<div class=\"wp-block-media-text\"></div>");
    }

    #[test]
    fn test_embeds() {
        let embed = block("core-embed/youtube", json!({"url": "https://youtu.be/x"}), "");
        assert_eq!(
            render_block(&embed),
            "<figure class=\"wp-block-embed\"><div class=\"wp-block-embed__wrapper\">https://youtu.be/x</div></figure>"
        );

        let embed = block("core/embed", json!({"url": "https://vimeo.com/1"}), "<iframe></iframe>");
        assert_eq!(
            render_block(&embed),
            "<figure class=\"wp-block-embed\"><div class=\"wp-block-embed__wrapper\"><iframe></iframe></div></figure>"
        );
    }

    #[test]
    fn test_separator_and_spacer() {
        assert_eq!(
            render_block(&block("core/separator", json!({"className": "is-style-wide"}), "")),
            "<hr class=\"wp-block-separator is-style-wide\" />"
        );
        assert_eq!(
            render_block(&block("core/spacer", json!({"height": 50}), "")),
            "<div class=\"wp-block-spacer\" style=\"height: 50px\"></div>"
        );
        assert_eq!(render_block(&block("core/spacer", json!({}), "")), "<div class=\"wp-block-spacer\"></div>");
    }

    #[test]
    fn test_buttons() {
        let buttons = with_children(
            block("core/buttons", json!({}), ""),
            vec![
                block("core/button", json!({"url": "/signup", "className": "cta"}), "Join"),
                block("core/button", json!({"text": "More"}), ""),
            ],
        );
        assert_eq!(
            render_block(&buttons),
            "<div class=\"wp-block-buttons\"><div class=\"wp-block-button\"><a class=\"wp-block-button__link cta\" href=\"/signup\">Join</a></div><div class=\"wp-block-button\"><a class=\"wp-block-button__link\" href=\"#\">More</a></div></div>"
        );
    }

    #[test]
    fn test_unknown_block_fallback() {
        let unknown = with_children(
            block("acme/hero-banner", json!({"className": "dark"}), "<h1>Hi</h1>"),
            vec![block("core/paragraph", json!({}), "child")],
        );
        assert_eq!(
            render_block(&unknown),
            "<div class=\"wp-block-acme-hero-banner dark\"><h1>Hi</h1><p>child</p></div>"
        );
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let image = block("core/image", json!({"url": "x.png\" onerror=\"alert(1)", "alt": "<b>"}), "");
        let html = render_block(&image);
        assert!(html.contains("src=\"x.png&quot; onerror=&quot;alert(1)\""));
        assert!(html.contains("alt=\"&lt;b&gt;\""));

        let para = block("core/paragraph", json!({"className": "a\"b"}), "<strong>ok</strong>");
        assert_eq!(render_block(&para), "<p class=\"a&quot;b\"><strong>ok</strong></p>");
    }

    #[test]
    fn test_falsy_attributes_are_ignored() {
        let para = block("core/paragraph", json!({"className": "", "align": null}), "x");
        assert_eq!(render_block(&para), "<p>x</p>");

        let list = block("core/list", json!({"ordered": false}), "");
        assert_eq!(render_block(&list), "<ul></ul>");
    }

    #[test]
    fn test_render_document_joins_top_level_blocks() {
        let doc = concat!(
            "<!-- wp:heading {\"level\":1} -->Title<!-- /wp:heading -->",
            "<!-- wp:paragraph -->Body<!-- /wp:paragraph -->",
            "<!-- wp:separator /-->"
        );
        assert_eq!(
            render_document(doc),
            "<h1>Title</h1>\n<p>Body</p>\n<hr class=\"wp-block-separator\" />"
        );
    }

    #[test]
    fn test_render_document_from_json() {
        let doc = r#"[{"blockName":"core/paragraph","attrs":{},"innerBlocks":[],"innerHTML":"A","innerContent":["A"]},{"blockName":null,"attrs":{},"innerBlocks":[],"innerHTML":"<hr>","innerContent":["<hr>"]}]"#;
        assert_eq!(render_document(doc), "<p>A</p>\n<hr>");
    }

    #[test]
    fn test_render_empty_document() {
        assert_eq!(render_document(""), "");
    }
}
