/*!
# HTML to Markdown

Renders documentation HTML as Markdown for the offline doc entries.
Block elements are separated by blank lines, inline elements keep their
Markdown markers, `script`/`style`/`noscript` are dropped and runs of
blank lines are collapsed at the end.
*/

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{node::Node, ElementRef, Html};

static BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n\s*\n").expect("Invalid blank line regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));
static LEADING_HASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6}) ").expect("Invalid heading marker regex"));

/// Converts an HTML fragment.
pub fn html_to_markdown(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    element_to_markdown(fragment.root_element())
}

/// Converts the contents of one element (its inner HTML).
pub fn element_to_markdown(element: ElementRef) -> String {
    let rendered = MarkdownRenderer.children(element);
    finish(&rendered)
}

/// Trims trailing spaces outside code fences and collapses blank runs.
fn finish(rendered: &str) -> String {
    let mut in_fence = false;
    let mut lines = Vec::new();
    for line in rendered.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        lines.push(if in_fence { line } else { line.trim_end() });
    }
    let joined = lines.join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

struct MarkdownRenderer;

impl MarkdownRenderer {
    fn children(&self, element: ElementRef) -> String {
        let mut out = String::new();
        for child in element.children() {
            let piece = match child.value() {
                Node::Text(text) => SPACES.replace_all(text, " ").into_owned(),
                Node::Element(_) => match ElementRef::wrap(child) {
                    Some(el) => self.element(el),
                    None => continue,
                },
                _ => continue,
            };
            push_piece(&mut out, &piece);
        }
        out
    }

    fn inline(&self, element: ElementRef) -> String {
        self.children(element).trim().to_string()
    }

    fn element(&self, element: ElementRef) -> String {
        let name = element.value().name();
        match name {
            "script" | "style" | "noscript" | "head" | "template" => String::new(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                let text = self.inline(element).replace('\n', " ");
                // literal `# ` in heading text must not read as a second marker
                let text = LEADING_HASHES.replace(&text, "\\$1 ");
                if text.is_empty() {
                    String::new()
                } else {
                    format!("\n\n{} {}\n\n", "#".repeat(level), text)
                }
            }
            "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "aside" | "nav"
            | "figure" | "details" | "summary" | "dl" | "dd" | "dt" => {
                format!("\n\n{}\n\n", self.children(element).trim())
            }
            "br" => "\n".to_string(),
            "hr" => "\n\n---\n\n".to_string(),
            "strong" | "b" => wrap_inline(&self.inline(element), "**"),
            "em" | "i" => wrap_inline(&self.inline(element), "*"),
            "del" | "s" => wrap_inline(&self.inline(element), "~~"),
            "code" => {
                let code = element.text().collect::<String>();
                let code = code.trim();
                if code.is_empty() {
                    String::new()
                } else if code.contains('`') {
                    format!("`` {} ``", code)
                } else {
                    format!("`{}`", code)
                }
            }
            "pre" => self.code_block(element),
            "a" => {
                let text = self.inline(element);
                match element.value().attr("href") {
                    Some(href) if !text.is_empty() && !href.starts_with("javascript:") => {
                        format!("[{}]({})", text, href)
                    }
                    _ => text,
                }
            }
            "img" => {
                let alt = element.value().attr("alt").unwrap_or_default();
                match element.value().attr("src") {
                    Some(src) => format!("![{}]({})", alt, src),
                    None => String::new(),
                }
            }
            "ul" => self.list(element, false),
            "ol" => self.list(element, true),
            "blockquote" => {
                let inner = self.children(element);
                let quoted = inner
                    .trim()
                    .lines()
                    .map(|line| if line.is_empty() { ">".to_string() } else { format!("> {}", line) })
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("\n\n{}\n\n", quoted)
            }
            "table" => self.table(element),
            _ => self.children(element),
        }
    }

    fn code_block(&self, element: ElementRef) -> String {
        let language = code_language(element)
            .or_else(|| {
                element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .find(|child| child.value().name() == "code")
                    .and_then(code_language)
            })
            .unwrap_or_default();

        let code = element.text().collect::<String>();

        format!("\n\n```{}\n{}\n```\n\n", language, code.trim_matches('\n'))
    }

    fn list(&self, element: ElementRef, ordered: bool) -> String {
        let mut items = Vec::new();
        for item in element.children().filter_map(ElementRef::wrap) {
            if item.value().name() != "li" {
                continue;
            }
            let marker = if ordered {
                format!("{}. ", items.len() + 1)
            } else {
                "- ".to_string()
            };
            let content = BLANK_LINES_IN_ITEM.replace_all(self.children(item).trim(), "\n").into_owned();
            let indent = " ".repeat(marker.len());
            let body = content
                .lines()
                .enumerate()
                .map(|(i, line)| if i == 0 { line.to_string() } else { format!("{}{}", indent, line) })
                .collect::<Vec<_>>()
                .join("\n");
            items.push(format!("{}{}", marker, body));
        }
        format!("\n\n{}\n\n", items.join("\n"))
    }

    fn table(&self, element: ElementRef) -> String {
        let mut rows: Vec<Vec<String>> = Vec::new();
        for child in element.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "tr" => rows.push(self.table_row(child)),
                "thead" | "tbody" | "tfoot" => {
                    for row in child.children().filter_map(ElementRef::wrap) {
                        if row.value().name() == "tr" {
                            rows.push(self.table_row(row));
                        }
                    }
                }
                _ => {}
            }
        }

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return String::new();
        }

        let mut lines = Vec::with_capacity(rows.len() + 1);
        for (i, mut row) in rows.into_iter().enumerate() {
            row.resize(columns, String::new());
            lines.push(format!("| {} |", row.join(" | ")));
            if i == 0 {
                lines.push(format!("|{}", " --- |".repeat(columns)));
            }
        }
        format!("\n\n{}\n\n", lines.join("\n"))
    }

    fn table_row(&self, row: ElementRef) -> Vec<String> {
        row.children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "td" | "th"))
            .map(|cell| {
                let text = self.inline(cell);
                SPACES.replace_all(&text, " ").replace('|', "\\|")
            })
            .collect()
    }
}

static BLANK_LINES_IN_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("Invalid list item regex"));

/// Appends a rendered piece, dropping spaces at the start of a line.
fn push_piece(out: &mut String, piece: &str) {
    if out.is_empty() || out.ends_with('\n') {
        out.push_str(piece.trim_start_matches(' '));
    } else {
        out.push_str(piece);
    }
}

fn wrap_inline(text: &str, marker: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        format!("{}{}{}", marker, text, marker)
    }
}

fn code_language(element: ElementRef) -> Option<String> {
    element.value().classes().find_map(|class| {
        class
            .strip_prefix("language-")
            .or_else(|| class.strip_prefix("lang-"))
            .map(str::to_string)
    })
}
