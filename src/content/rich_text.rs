//! Structured rich text and its plain-text / HTML renderings
//!
//! Blocks arrive as repository JSON (`paragraph`, `heading1`..`heading6`,
//! `preformatted`, list items, images and embeds). HTML is produced by turning
//! blocks and their spans into `pulldown_cmark` events and handing them to its
//! HTML writer, which takes care of escaping.

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Tag, TagEnd};
use serde::{Deserialize, Serialize};

/// An ordered sequence of rich text blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<Block>);

/// A single rich text block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Block {
    Paragraph(TextBlock),
    Heading1(TextBlock),
    Heading2(TextBlock),
    Heading3(TextBlock),
    Heading4(TextBlock),
    Heading5(TextBlock),
    Heading6(TextBlock),
    Preformatted(TextBlock),
    ListItem(TextBlock),
    OListItem(TextBlock),
    Image(ImageBlock),
    Embed(EmbedBlock),
    #[serde(other)]
    Unknown,
}

/// Text with formatting spans
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
}

/// A formatting range; offsets count UTF-16 code units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedBlock {
    #[serde(default)]
    pub oembed: serde_json::Value,
}

impl Block {
    /// Text payload, `None` for images, embeds and unknown blocks
    pub fn text(&self) -> Option<&TextBlock> {
        match self {
            Block::Paragraph(t)
            | Block::Heading1(t)
            | Block::Heading2(t)
            | Block::Heading3(t)
            | Block::Heading4(t)
            | Block::Heading5(t)
            | Block::Heading6(t)
            | Block::Preformatted(t)
            | Block::ListItem(t)
            | Block::OListItem(t) => Some(t),
            Block::Image(_) | Block::Embed(_) | Block::Unknown => None,
        }
    }

    /// `Some(ordered)` for list items
    fn list_kind(&self) -> Option<bool> {
        match self {
            Block::ListItem(_) => Some(false),
            Block::OListItem(_) => Some(true),
            _ => None,
        }
    }
}

impl RichText {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Plain text of every text block, joined with a single space
    pub fn as_text(&self) -> String {
        self.0
            .iter()
            .filter_map(Block::text)
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Semantic HTML; consecutive list items share one list element
    pub fn as_html(&self) -> String {
        let mut events: Vec<Event<'static>> = Vec::new();
        let mut open_list: Option<bool> = None;

        for block in &self.0 {
            let list = block.list_kind();
            if list != open_list {
                if let Some(ordered) = open_list {
                    events.push(Event::End(TagEnd::List(ordered)));
                }
                if let Some(ordered) = list {
                    events.push(Event::Start(Tag::List(ordered.then_some(1))));
                }
                open_list = list;
            }

            match block {
                Block::Paragraph(t) => wrap(&mut events, Tag::Paragraph, TagEnd::Paragraph, t),
                Block::Heading1(t) => heading(&mut events, HeadingLevel::H1, t),
                Block::Heading2(t) => heading(&mut events, HeadingLevel::H2, t),
                Block::Heading3(t) => heading(&mut events, HeadingLevel::H3, t),
                Block::Heading4(t) => heading(&mut events, HeadingLevel::H4, t),
                Block::Heading5(t) => heading(&mut events, HeadingLevel::H5, t),
                Block::Heading6(t) => heading(&mut events, HeadingLevel::H6, t),
                Block::Preformatted(t) => {
                    events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(
                        CowStr::from(""),
                    ))));
                    events.push(Event::Text(CowStr::from(t.text.clone())));
                    events.push(Event::End(TagEnd::CodeBlock));
                }
                Block::ListItem(t) | Block::OListItem(t) => {
                    wrap(&mut events, Tag::Item, TagEnd::Item, t)
                }
                Block::Image(image) => {
                    events.push(Event::Start(Tag::Paragraph));
                    events.push(Event::Start(Tag::Image {
                        link_type: LinkType::Inline,
                        dest_url: CowStr::from(image.url.clone()),
                        title: CowStr::from(""),
                        id: CowStr::from(""),
                    }));
                    if let Some(alt) = &image.alt {
                        events.push(Event::Text(CowStr::from(alt.clone())));
                    }
                    events.push(Event::End(TagEnd::Image));
                    events.push(Event::End(TagEnd::Paragraph));
                }
                Block::Embed(embed) => {
                    if let Some(markup) = embed.oembed.get("html").and_then(|v| v.as_str()) {
                        let kind = embed
                            .oembed
                            .get("type")
                            .and_then(|v| v.as_str())
                            .unwrap_or("");
                        events.push(Event::Html(CowStr::from(format!(
                            "<div data-oembed-type=\"{}\">{}</div>\n",
                            escape_attr(kind),
                            markup
                        ))));
                    }
                }
                Block::Unknown => {}
            }
        }

        if let Some(ordered) = open_list {
            events.push(Event::End(TagEnd::List(ordered)));
        }

        let mut output = String::new();
        html::push_html(&mut output, events.into_iter());
        output
    }
}

fn heading(events: &mut Vec<Event<'static>>, level: HeadingLevel, block: &TextBlock) {
    wrap(
        events,
        Tag::Heading {
            level,
            id: None,
            classes: Vec::new(),
            attrs: Vec::new(),
        },
        TagEnd::Heading(level),
        block,
    )
}

fn wrap(events: &mut Vec<Event<'static>>, start: Tag<'static>, end: TagEnd, block: &TextBlock) {
    events.push(Event::Start(start));
    push_inline(events, block);
    events.push(Event::End(end));
}

/// Inline formatting a span applies
#[derive(Debug, Clone, PartialEq)]
enum Mark {
    Strong,
    Em,
    Link(String),
    Label(String),
}

impl Mark {
    fn from_span(span: &Span) -> Option<Self> {
        let data = span.data.as_ref();
        let field = |name: &str| {
            data.and_then(|d| d.get(name))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        match span.kind.as_str() {
            "strong" => Some(Mark::Strong),
            "em" => Some(Mark::Em),
            "hyperlink" => field("url")
                .or_else(|| field("uid").map(|uid| format!("/{}", crate::helpers::post_path(&uid))))
                .map(Mark::Link),
            "label" => field("label").map(Mark::Label),
            _ => None,
        }
    }

    fn open(&self) -> Event<'static> {
        match self {
            Mark::Strong => Event::Start(Tag::Strong),
            Mark::Em => Event::Start(Tag::Emphasis),
            Mark::Link(url) => Event::Start(Tag::Link {
                link_type: LinkType::Inline,
                dest_url: CowStr::from(url.clone()),
                title: CowStr::from(""),
                id: CowStr::from(""),
            }),
            Mark::Label(name) => Event::InlineHtml(CowStr::from(format!(
                "<span class=\"{}\">",
                escape_attr(name)
            ))),
        }
    }

    fn close(&self) -> Event<'static> {
        match self {
            Mark::Strong => Event::End(TagEnd::Strong),
            Mark::Em => Event::End(TagEnd::Emphasis),
            Mark::Link(_) => Event::End(TagEnd::Link),
            Mark::Label(_) => Event::InlineHtml(CowStr::from("</span>")),
        }
    }
}

/// Emit text split at every span boundary, keeping the open marks properly nested
fn push_inline(events: &mut Vec<Event<'static>>, block: &TextBlock) {
    let text = block.text.as_str();

    let spans: Vec<(usize, usize, Mark)> = block
        .spans
        .iter()
        .filter_map(|span| {
            let start = utf16_to_byte(text, span.start);
            let end = utf16_to_byte(text, span.end);
            if start >= end {
                return None;
            }
            Mark::from_span(span).map(|mark| (start, end, mark))
        })
        .collect();

    let mut bounds: Vec<usize> = vec![0, text.len()];
    for (start, end, _) in &spans {
        bounds.push(*start);
        bounds.push(*end);
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut open: Vec<usize> = Vec::new();
    for window in bounds.windows(2) {
        let (from, to) = (window[0], window[1]);

        let mut wanted: Vec<usize> = (0..spans.len())
            .filter(|&i| spans[i].0 <= from && spans[i].1 >= to)
            .collect();
        wanted.sort_by_key(|&i| (spans[i].0, std::cmp::Reverse(spans[i].1), i));

        let keep = open
            .iter()
            .zip(&wanted)
            .take_while(|(a, b)| a == b)
            .count();
        for i in open.drain(keep..).rev() {
            events.push(spans[i].2.close());
        }
        for &i in &wanted[keep..] {
            events.push(spans[i].2.open());
            open.push(i);
        }

        push_text(events, &text[from..to]);
    }

    for i in open.into_iter().rev() {
        events.push(spans[i].2.close());
    }
}

/// Text with newlines turned into line breaks
fn push_text(events: &mut Vec<Event<'static>>, text: &str) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            events.push(Event::HardBreak);
        }
        if !line.is_empty() {
            events.push(Event::Text(CowStr::from(line.to_string())));
        }
    }
}

/// Byte index of a UTF-16 offset, clamped to the text length
fn utf16_to_byte(text: &str, offset: usize) -> usize {
    let mut units = 0;
    for (idx, ch) in text.char_indices() {
        if units >= offset {
            return idx;
        }
        units += ch.len_utf16();
    }
    text.len()
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> RichText {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_paragraph_with_strong_span() {
        let text = parse(
            r#"[{ "type": "paragraph", "text": "Hello world",
                 "spans": [{ "start": 6, "end": 11, "type": "strong" }] }]"#,
        );
        assert_eq!(text.as_html(), "<p>Hello <strong>world</strong></p>\n");
        assert_eq!(text.as_text(), "Hello world");
    }

    #[test]
    fn test_overlapping_spans_nest() {
        let text = parse(
            r#"[{ "type": "paragraph", "text": "abcdef", "spans": [
                { "start": 0, "end": 4, "type": "strong" },
                { "start": 2, "end": 6, "type": "em" }
            ] }]"#,
        );
        assert!(text
            .as_html()
            .contains("<strong>ab<em>cd</em></strong><em>ef</em>"));
    }

    #[test]
    fn test_span_offsets_are_utf16() {
        let text = parse(
            r#"[{ "type": "paragraph", "text": "🚀 go",
                 "spans": [{ "start": 3, "end": 5, "type": "strong" }] }]"#,
        );
        assert!(text.as_html().contains("🚀 <strong>go</strong>"));
    }

    #[test]
    fn test_hyperlink_and_label() {
        let text = parse(
            r#"[{ "type": "paragraph", "text": "see docs here", "spans": [
                { "start": 4, "end": 8, "type": "hyperlink",
                  "data": { "link_type": "Web", "url": "https://example.com/docs" } },
                { "start": 9, "end": 13, "type": "label", "data": { "label": "codigo" } }
            ] }]"#,
        );
        let html = text.as_html();
        assert!(html.contains(r#"<a href="https://example.com/docs">docs</a>"#));
        assert!(html.contains(r#"<span class="codigo">here</span>"#));
    }

    #[test]
    fn test_list_items_are_grouped() {
        let text = parse(
            r#"[
                { "type": "list-item", "text": "one", "spans": [] },
                { "type": "list-item", "text": "two", "spans": [] },
                { "type": "o-list-item", "text": "first", "spans": [] },
                { "type": "paragraph", "text": "after", "spans": [] }
            ]"#,
        );
        let html = text.as_html();
        assert_eq!(html.matches("<ul>").count(), 1);
        assert_eq!(html.matches("<ol>").count(), 1);
        assert!(html.contains("<li>one</li>"));
        assert!(html.contains("<li>two</li>"));
        assert!(html.find("</ul>").unwrap() < html.find("<ol>").unwrap());
        assert!(html.find("</ol>").unwrap() < html.find("<p>after</p>").unwrap());
    }

    #[test]
    fn test_headings_preformatted_and_escaping() {
        let text = parse(
            r#"[
                { "type": "heading2", "text": "Title", "spans": [] },
                { "type": "preformatted", "text": "let x = a < b;", "spans": [] },
                { "type": "paragraph", "text": "line one\nline <two>", "spans": [] }
            ]"#,
        );
        let html = text.as_html();
        assert!(html.contains("<h2>Title</h2>"));
        assert!(html.contains("<pre><code>let x = a &lt; b;</code></pre>"));
        assert!(html.contains("line one<br />"));
        assert!(html.contains("line &lt;two&gt;"));
    }

    #[test]
    fn test_image_embed_and_unknown_blocks() {
        let text = parse(
            r#"[
                { "type": "image", "url": "https://images.prismic.io/a.png", "alt": "rocket" },
                { "type": "embed", "oembed": { "type": "video", "html": "<iframe src=\"x\"></iframe>" } },
                { "type": "hologram", "text": "ignored" }
            ]"#,
        );
        let html = text.as_html();
        assert!(html.contains(r#"<img src="https://images.prismic.io/a.png" alt="rocket" />"#));
        assert!(html.contains(r#"<div data-oembed-type="video"><iframe src="x"></iframe></div>"#));
        assert!(!html.contains("ignored"));
        // Images, embeds and unknown blocks have no plain text
        assert_eq!(text.as_text(), "");
    }

    #[test]
    fn test_as_text_joins_blocks_with_space() {
        let text = parse(
            r#"[
                { "type": "paragraph", "text": "first block", "spans": [] },
                { "type": "list-item", "text": "second", "spans": [] }
            ]"#,
        );
        assert_eq!(text.as_text(), "first block second");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let text = parse(
            r#"[{ "type": "paragraph", "text": "same", "spans": [{ "start": 0, "end": 4, "type": "em" }] }]"#,
        );
        assert_eq!(text.as_html(), text.as_html());
        assert_eq!(text.as_text(), text.as_text());
    }
}
