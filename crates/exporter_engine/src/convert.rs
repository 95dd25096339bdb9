use ego_tree::NodeRef;
use exporter_core::ExportFormat;
use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Turns a message's HTML into the export format.
pub trait Converter: Send + Sync {
    fn render(&self, html: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Html2MdConverter;

impl Converter for Html2MdConverter {
    fn render(&self, html: &str) -> String {
        html2md::parse_html(html).trim().to_string()
    }
}

/// Plain-text rendering: block elements become line breaks, list items get a
/// dash, everything presentational is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextConverter;

impl Converter for PlainTextConverter {
    fn render(&self, html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        let mut ctx = TextContext::default();
        for child in fragment.root_element().children() {
            visit_node(child, &mut ctx);
        }
        ctx.finish()
    }
}

/// Converter matching the user's chosen format.
pub fn converter_for(format: ExportFormat) -> Box<dyn Converter> {
    match format {
        ExportFormat::Markdown => Box::new(Html2MdConverter),
        ExportFormat::Text => Box::new(PlainTextConverter),
    }
}

fn visit_node(node: NodeRef<'_, Node>, ctx: &mut TextContext) {
    match node.value() {
        Node::Text(text) => {
            if ctx.preformatted > 0 {
                ctx.push_raw(text);
            } else {
                ctx.append_text(text);
            }
        }
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                visit_element(element, ctx);
            }
        }
        _ => {
            for child in node.children() {
                visit_node(child, ctx);
            }
        }
    }
}

fn visit_element(element: ElementRef<'_>, ctx: &mut TextContext) {
    let tag = element.value().name().to_ascii_lowercase();
    match tag.as_str() {
        "br" => ctx.newline(),
        "hr" => {
            ctx.block_break();
            ctx.append_text("---");
            ctx.block_break();
        }
        "li" => {
            ctx.newline();
            ctx.append_text("- ");
            visit_children(element, ctx);
            ctx.newline();
        }
        "pre" => {
            ctx.block_break();
            ctx.preformatted += 1;
            visit_children(element, ctx);
            ctx.preformatted -= 1;
            ctx.block_break();
        }
        "p" | "div" | "section" | "article" | "header" | "footer" | "figure" | "figcaption"
        | "table" | "blockquote" | "ul" | "ol" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            ctx.block_break();
            visit_children(element, ctx);
            ctx.block_break();
        }
        "tr" => {
            ctx.newline();
            visit_children(element, ctx);
            ctx.newline();
        }
        "td" | "th" => {
            visit_children(element, ctx);
            ctx.append_text(" ");
        }
        "script" | "style" | "noscript" | "iframe" | "template" | "button" | "svg" | "img" => {}
        _ => visit_children(element, ctx),
    }
}

fn visit_children(element: ElementRef<'_>, ctx: &mut TextContext) {
    for child in element.children() {
        visit_node(child, ctx);
    }
}

#[derive(Default)]
struct TextContext {
    builder: String,
    preformatted: usize,
}

impl TextContext {
    fn last_char(&self) -> Option<char> {
        self.builder.chars().last()
    }

    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                match self.last_char() {
                    None | Some(' ') | Some('\n') => continue,
                    _ => self.builder.push(' '),
                }
            } else {
                self.builder.push(ch);
            }
        }
    }

    fn push_raw(&mut self, text: &str) {
        self.builder.push_str(text);
    }

    fn newline(&mut self) {
        self.trim_trailing_spaces();
        if self.builder.is_empty() || self.builder.ends_with('\n') {
            return;
        }
        self.builder.push('\n');
    }

    /// Leaves exactly one blank line between blocks.
    fn block_break(&mut self) {
        self.trim_trailing_spaces();
        if self.builder.is_empty() || self.builder.ends_with("\n\n") {
            return;
        }
        if self.builder.ends_with('\n') {
            self.builder.push('\n');
        } else {
            self.builder.push_str("\n\n");
        }
    }

    fn trim_trailing_spaces(&mut self) {
        while self.builder.ends_with(' ') {
            self.builder.pop();
        }
    }

    fn finish(self) -> String {
        self.builder.trim().to_string()
    }
}
