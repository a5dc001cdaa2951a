//! Markdown to terminal text

use colored::*;
use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Render markdown as styled terminal text
///
/// Links print as `text (url)`, tables are column-aligned, and `$...$` math
/// spans are shown verbatim.
pub fn render_terminal(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_MATH;
    let mut renderer = TerminalRenderer::default();
    for event in Parser::new_ext(markdown, options) {
        renderer.event(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct Table {
    head: Vec<String>,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
}

impl Table {
    fn render(&self) -> String {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.head.len()))
            .max()
            .unwrap_or(0);

        let mut widths = vec![0; columns];
        for row in std::iter::once(&self.head).chain(&self.rows) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let line = |row: &[String]| -> String {
            let cells: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, width)| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    let pad = width - cell.chars().count();
                    format!("{}{}", cell, " ".repeat(pad))
                })
                .collect();
            cells.join("  ").trim_end().to_string()
        };

        let mut out = String::new();
        if !self.head.is_empty() {
            out.push_str(&format!("{}\n", line(self.head.as_slice()).bold()));
            let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            out.push_str(&format!("{}\n", rule.join("  ").dimmed()));
        }
        for row in &self.rows {
            out.push_str(&line(row.as_slice()));
            out.push('\n');
        }
        out
    }
}

#[derive(Default)]
struct TerminalRenderer {
    out: String,
    heading: Option<HeadingLevel>,
    strong: usize,
    emphasis: usize,
    link: Option<String>,
    table: Option<Table>,
    list_depth: usize,
    in_code_block: bool,
}

impl TerminalRenderer {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.styled(code.yellow().to_string(), &code),
            Event::InlineMath(math) => self.text(&format!("${}$", math)),
            Event::DisplayMath(math) => self.text(&format!("$${}$$", math)),
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            Event::SoftBreak | Event::HardBreak => self.text("\n"),
            Event::Rule => self.out.push_str(&format!("{}\n\n", "─".repeat(40).dimmed())),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => self.heading = Some(level),
            Tag::Strong => self.strong += 1,
            Tag::Emphasis => self.emphasis += 1,
            Tag::Link { dest_url, .. } => self.start_link(dest_url),
            Tag::Table(_) => self.table = Some(Table::default()),
            Tag::List(_) => self.list_depth += 1,
            Tag::Item => {
                let indent = "  ".repeat(self.list_depth.saturating_sub(1));
                self.out.push_str(&format!("{}• ", indent));
            }
            Tag::CodeBlock(_) => self.in_code_block = true,
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.heading = None;
                self.out.push_str("\n\n");
            }
            TagEnd::Paragraph => self.out.push_str("\n\n"),
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            TagEnd::Link => self.end_link(),
            TagEnd::TableCell => {
                if let Some(table) = &mut self.table {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell.trim().to_string());
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = &mut self.table {
                    table.head = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = &mut self.table {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.out.push_str(&table.render());
                    self.out.push('\n');
                }
            }
            TagEnd::List(_) => {
                self.list_depth = self.list_depth.saturating_sub(1);
                if self.list_depth == 0 {
                    self.out.push('\n');
                }
            }
            TagEnd::Item => {
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.out.push('\n');
            }
            _ => {}
        }
    }

    fn start_link(&mut self, dest_url: CowStr<'_>) {
        if let Some(table) = &mut self.table {
            // Cells only have room for the target
            table.cell.push_str(&dest_url);
        }
        self.link = Some(dest_url.to_string());
    }

    fn end_link(&mut self) {
        let Some(url) = self.link.take() else {
            return;
        };
        if self.table.is_none() && !url.is_empty() {
            self.out.push_str(&format!(" ({})", url.dimmed()));
        }
    }

    fn text(&mut self, text: &str) {
        let styled = if self.in_code_block {
            text.dimmed().to_string()
        } else if let Some(level) = self.heading {
            match level {
                HeadingLevel::H1 | HeadingLevel::H2 | HeadingLevel::H3 => {
                    text.bold().cyan().to_string()
                }
                _ => text.bold().to_string(),
            }
        } else if self.link.is_some() {
            text.blue().underline().to_string()
        } else if self.strong > 0 {
            text.bold().to_string()
        } else if self.emphasis > 0 {
            text.italic().to_string()
        } else {
            text.to_string()
        };
        self.styled(styled, text);
    }

    /// Push `styled` to the output, or the plain `text` into a table cell
    fn styled(&mut self, styled: String, text: &str) {
        match &mut self.table {
            Some(table) if self.link.is_none() => table.cell.push_str(text),
            Some(_) => {}
            None => self.out.push_str(&styled),
        }
    }

    fn finish(self) -> String {
        let mut out = self.out.trim_end().to_string();
        out.push('\n');
        out
    }
}
