//! Card content rendering.
//!
//! A card's `content` field holds a serialized document tree: nodes with a
//! `type`, optional `attrs`, child `content` and, for text leaves, `text`
//! plus formatting `marks`. This module turns that tree into markdown, HTML
//! or plain text. Content that does not parse is rendered as-is.

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One node of a card document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub attrs: Value,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

/// Inline formatting applied to a text leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub attrs: Value,
}

impl Node {
    fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }

    fn heading_level(&self) -> usize {
        self.attrs
            .get("level")
            .and_then(Value::as_u64)
            .map(|l| l.clamp(1, 6) as usize)
            .unwrap_or(1)
    }
}

/// A parsed card document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    root: Node,
}

impl Document {
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(Self {
            root: serde_json::from_str(raw)?,
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        markdown_node(&self.root, &mut out);
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        html_node(&self.root, &mut out);
        out
    }

    /// Text leaves joined with single spaces.
    pub fn plain_text(&self) -> String {
        let mut leaves = Vec::new();
        collect_text(&self.root, &mut leaves);
        leaves.join(" ")
    }
}

/// Render raw card content as markdown, falling back to the raw string.
pub fn to_markdown(raw: &str) -> String {
    match Document::parse(raw) {
        Ok(doc) => doc.to_markdown(),
        Err(_) => raw.to_string(),
    }
}

/// Render raw card content as HTML, falling back to an escaped paragraph.
pub fn to_html(raw: &str) -> String {
    match Document::parse(raw) {
        Ok(doc) => doc.to_html(),
        Err(_) => format!("<p>{}</p>", escape_html(raw)),
    }
}

/// Extract plain text from raw card content, falling back to the raw string.
pub fn plain_text(raw: &str) -> String {
    match Document::parse(raw) {
        Ok(doc) => doc.plain_text(),
        Err(_) => raw.to_string(),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn markdown_children(node: &Node) -> String {
    let mut out = String::new();
    for child in &node.content {
        markdown_node(child, &mut out);
    }
    out
}

fn markdown_node(node: &Node, out: &mut String) {
    match node.kind.as_str() {
        "text" => {
            let mut text = node.text.clone().unwrap_or_default();
            for mark in &node.marks {
                text = match mark.kind.as_str() {
                    "bold" => format!("**{}**", text),
                    "italic" => format!("*{}*", text),
                    "code" => format!("`{}`", text),
                    "strike" => format!("~~{}~~", text),
                    "link" => {
                        let href = mark.attrs.get("href").and_then(Value::as_str).unwrap_or("#");
                        format!("[{}]({})", text, href)
                    }
                    _ => text,
                };
            }
            out.push_str(&text);
        }
        "heading" => {
            out.push_str(&"#".repeat(node.heading_level()));
            out.push(' ');
            out.push_str(&markdown_children(node));
            out.push_str("\n\n");
        }
        "paragraph" => {
            out.push_str(&markdown_children(node));
            out.push_str("\n\n");
        }
        "bullet_list_item" => {
            out.push_str("- ");
            out.push_str(markdown_children(node).trim());
            out.push('\n');
        }
        "ordered_list" => {
            for (i, item) in node.content.iter().enumerate() {
                let mut text = String::new();
                markdown_node(item, &mut text);
                out.push_str(&format!("{}. {}\n", i + 1, text.trim()));
            }
        }
        "code_block" => {
            let lang = node.attr_str("params").unwrap_or("").replace('!', "");
            out.push_str(&format!("```{}\n{}\n```\n\n", lang, markdown_children(node)));
        }
        "horizontal_rule" => out.push_str("---\n\n"),
        "blockquote" => {
            let body = markdown_children(node);
            let quoted: Vec<String> = body
                .trim_end()
                .lines()
                .map(|line| format!("> {}", line))
                .collect();
            out.push_str(&quoted.join("\n"));
            out.push_str("\n\n");
        }
        "card" => {
            out.push_str(&format!(
                "[Card Reference: {}]\n",
                node.attr_str("cardId").unwrap_or("")
            ));
        }
        "image" => {
            out.push_str(&format!(
                "![{}]({})\n\n",
                node.attr_str("alt").unwrap_or(""),
                node.attr_str("src").unwrap_or("")
            ));
        }
        // doc, bullet_list and anything unknown
        _ => out.push_str(&markdown_children(node)),
    }
}

fn html_children(node: &Node) -> String {
    let mut out = String::new();
    for child in &node.content {
        html_node(child, &mut out);
    }
    out
}

fn html_node(node: &Node, out: &mut String) {
    match node.kind.as_str() {
        "text" => {
            let mut text = escape_html(node.text.as_deref().unwrap_or(""));
            for mark in &node.marks {
                text = match mark.kind.as_str() {
                    "bold" => format!("<strong>{}</strong>", text),
                    "italic" => format!("<em>{}</em>", text),
                    "code" => format!("<code>{}</code>", text),
                    "strike" => format!("<s>{}</s>", text),
                    "link" => {
                        let href = mark.attrs.get("href").and_then(Value::as_str).unwrap_or("#");
                        format!("<a href=\"{}\">{}</a>", escape_html(href), text)
                    }
                    _ => text,
                };
            }
            out.push_str(&text);
        }
        "heading" => {
            let level = node.heading_level();
            out.push_str(&format!("<h{0}>{1}</h{0}>", level, html_children(node)));
        }
        "paragraph" => out.push_str(&format!("<p>{}</p>", html_children(node))),
        "bullet_list" => out.push_str(&format!("<ul>{}</ul>", html_children(node))),
        "ordered_list" => out.push_str(&format!("<ol>{}</ol>", html_children(node))),
        "bullet_list_item" | "ordered_list_item" | "list_item" => {
            out.push_str(&format!("<li>{}</li>", html_children(node)))
        }
        "code_block" => out.push_str(&format!("<pre><code>{}</code></pre>", html_children(node))),
        "blockquote" => out.push_str(&format!("<blockquote>{}</blockquote>", html_children(node))),
        "horizontal_rule" => out.push_str("<hr>"),
        "card" => {
            let id = escape_html(node.attr_str("cardId").unwrap_or(""));
            out.push_str(&format!(
                "<div class=\"card-reference\" data-card-id=\"{0}\">[Card: {0}]</div>",
                id
            ));
        }
        "image" => out.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\">",
            escape_html(node.attr_str("src").unwrap_or("")),
            escape_html(node.attr_str("alt").unwrap_or(""))
        )),
        _ => out.push_str(&html_children(node)),
    }
}

fn collect_text<'a>(node: &'a Node, leaves: &mut Vec<&'a str>) {
    if let Some(text) = node.text.as_deref().filter(|t| !t.is_empty()) {
        leaves.push(text);
        return;
    }
    for child in &node.content {
        collect_text(child, leaves);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> Value {
        json!({"type": "text", "text": s})
    }

    fn para(children: Vec<Value>) -> Value {
        json!({"type": "paragraph", "content": children})
    }

    fn doc(children: Vec<Value>) -> String {
        json!({"type": "doc", "content": children}).to_string()
    }

    #[test]
    fn test_markdown_heading_paragraph_marks() {
        let raw = doc(vec![
            json!({"type": "heading", "attrs": {"level": 2}, "content": [text("Title")]}),
            para(vec![
                text("Hello "),
                json!({"type": "text", "text": "world", "marks": [{"type": "bold"}]}),
                text(" and "),
                json!({"type": "text", "text": "docs", "marks": [{"type": "link", "attrs": {"href": "https://x.dev"}}]}),
            ]),
        ]);
        assert_eq!(
            to_markdown(&raw),
            "## Title\n\nHello **world** and [docs](https://x.dev)\n\n"
        );
    }

    #[test]
    fn test_markdown_marks_nest_in_order() {
        let raw = doc(vec![json!({
            "type": "text",
            "text": "x",
            "marks": [{"type": "bold"}, {"type": "italic"}, {"type": "strike"}],
        })]);
        assert_eq!(to_markdown(&raw), "~~***x***~~");
    }

    #[test]
    fn test_markdown_lists() {
        let item = |s: &str| json!({"type": "bullet_list_item", "content": [para(vec![text(s)])]});
        let bullets = doc(vec![json!({"type": "bullet_list", "content": [item("a"), item("b")]})]);
        assert_eq!(to_markdown(&bullets), "- a\n- b\n");

        let numbered = doc(vec![json!({
            "type": "ordered_list",
            "content": [
                {"type": "ordered_list_item", "content": [para(vec![text("x")])]},
                {"type": "ordered_list_item", "content": [para(vec![text("y")])]},
            ],
        })]);
        assert_eq!(to_markdown(&numbered), "1. x\n2. y\n");
    }

    #[test]
    fn test_markdown_blocks() {
        let raw = doc(vec![
            json!({"type": "code_block", "attrs": {"params": "rust!"}, "content": [text("fn main() {}")]}),
            json!({"type": "horizontal_rule"}),
            json!({"type": "blockquote", "content": [para(vec![text("quoted")])]}),
            json!({"type": "card", "attrs": {"cardId": "card-7"}}),
            json!({"type": "image", "attrs": {"src": "a.png", "alt": "diagram"}}),
        ]);
        assert_eq!(
            to_markdown(&raw),
            "```rust\nfn main() {}\n```\n\n---\n\n> quoted\n\n[Card Reference: card-7]\n![diagram](a.png)\n\n"
        );
    }

    #[test]
    fn test_unknown_nodes_render_children() {
        let raw = doc(vec![json!({"type": "toggle", "content": [para(vec![text("inside")])]})]);
        assert_eq!(to_markdown(&raw), "inside\n\n");
    }

    #[test]
    fn test_unparseable_content_falls_back() {
        assert_eq!(to_markdown("just <text>"), "just <text>");
        assert_eq!(plain_text("just text"), "just text");
        assert_eq!(to_html("a & b"), "<p>a &amp; b</p>");
    }

    #[test]
    fn test_html_escapes_text_and_attributes() {
        let raw = doc(vec![para(vec![json!({
            "type": "text",
            "text": "a < b",
            "marks": [{"type": "link", "attrs": {"href": "http://x?a=1&b=2"}}],
        })])]);
        assert_eq!(
            to_html(&raw),
            "<p><a href=\"http://x?a=1&amp;b=2\">a &lt; b</a></p>"
        );
    }

    #[test]
    fn test_html_structure() {
        let raw = doc(vec![
            json!({"type": "heading", "attrs": {"level": 9}, "content": [text("Deep")]}),
            json!({"type": "bullet_list", "content": [{"type": "bullet_list_item", "content": [text("one")]}]}),
            json!({"type": "card", "attrs": {"cardId": "c1"}}),
        ]);
        assert_eq!(
            to_html(&raw),
            "<h6>Deep</h6><ul><li>one</li></ul><div class=\"card-reference\" data-card-id=\"c1\">[Card: c1]</div>"
        );
    }

    #[test]
    fn test_plain_text_joins_leaves() {
        let raw = doc(vec![
            json!({"type": "heading", "content": [text("Title")]}),
            para(vec![text("first"), text("second")]),
        ]);
        assert_eq!(plain_text(&raw), "Title first second");
        assert_eq!(Document::parse(&raw).unwrap().root().kind, "doc");
    }
}
