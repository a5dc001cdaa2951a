//! Markdown rendering of chat answers and search results

use municode_core::SearchRecord;

/// Notice shown in place of a table when nothing was retrieved
pub const NO_RESULTS: &str = "No results found.";

const ELLIPSIS: char = '…';

/// Cut `text` to at most `max_chars` characters on a word boundary
///
/// Returns `None` when the text fits and should be shown whole. Otherwise the
/// returned prefix ends on the last complete word; a single word longer than
/// the limit is kept whole rather than split.
pub fn truncate_at_word(text: &str, max_chars: usize) -> Option<&str> {
    let (cut, _) = text.char_indices().nth(max_chars)?;
    let head = &text[..cut];
    // Byte offset of the first word; whitespace before it is never a boundary
    let start = text.len() - text.trim_start().len();

    let ends_on_boundary = text[cut..].starts_with(char::is_whitespace);
    let prefix = if ends_on_boundary && cut > start {
        head
    } else {
        match head.rfind(char::is_whitespace) {
            Some(pos) if pos > start => &head[..pos],
            _ => {
                let end = text[start..]
                    .find(char::is_whitespace)
                    .map_or(text.len(), |i| start + i);
                &text[..end]
            }
        }
    };

    let prefix = prefix.trim();
    (prefix.len() < text.trim().len()).then_some(prefix)
}

/// Escape `$` so the markdown layer never reads it as math
pub fn escape_math(text: &str) -> String {
    text.replace('$', "\\$")
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn link(label: &str, url: Option<&str>) -> String {
    url.map(|u| format!("[{}]({})", label, u)).unwrap_or_default()
}

/// References table mapping each record's source to its links
///
/// Absent links leave the cell empty. An empty record list yields
/// [`NO_RESULTS`] instead of a table.
pub fn references_table(records: &[SearchRecord]) -> String {
    if records.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut table = String::from(
        "###### References\n\n| PDF Title | PDF URL | Chapter URL |\n|-------|-----|------------|\n",
    );
    for record in records {
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            escape_cell(&record.relative_path),
            link("Link", record.pdf_link()),
            link("Link", record.chapter_link()),
        ));
    }
    table
}

/// Answer followed by its references, rendered as one block
///
/// `answer` is expected to be escaped already (see [`escape_math`]).
pub fn chat_response(answer: &str, records: &[SearchRecord]) -> String {
    format!("{}\n\n{}", answer, references_table(records))
}

/// One expandable search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCard {
    /// 1-based position in the result list
    pub number: usize,
    pub title: String,
    pub excerpt: String,
    pub truncated: bool,
    pub links: Option<String>,
}

impl ResultCard {
    fn new(number: usize, record: &SearchRecord, max_chars: usize) -> Self {
        let (excerpt, truncated) = match truncate_at_word(&record.chunk, max_chars) {
            Some(prefix) => (format!("{}{}", prefix, ELLIPSIS), true),
            None => (record.chunk.clone(), false),
        };

        let links: Vec<String> = [
            record.pdf_link().map(|u| format!("[📄 View PDF]({})", u)),
            record.chapter_link().map(|u| format!("[📘 Open Chapter]({})", u)),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            number,
            title: format!("Result {}: {}", number, record.relative_path),
            excerpt,
            truncated,
            links: (!links.is_empty()).then(|| links.join(" | ")),
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = format!("#### {}\n\n📝 **Excerpt:** {}\n", self.title, self.excerpt);
        if let Some(links) = &self.links {
            out.push('\n');
            out.push_str(links);
            out.push('\n');
        }
        out
    }
}

/// Rendered form of a search result list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultsView {
    pub cards: Vec<ResultCard>,
    pub references: String,
}

impl SearchResultsView {
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from("### Search Results\n\n");
        if self.is_empty() {
            out.push_str(NO_RESULTS);
            out.push('\n');
            return out;
        }
        for card in &self.cards {
            out.push_str(&card.to_markdown());
            out.push('\n');
        }
        out.push_str(&self.references);
        out
    }
}

/// Build result cards with excerpts limited to `max_chars` characters
pub fn search_results(records: &[SearchRecord], max_chars: usize) -> SearchResultsView {
    SearchResultsView {
        cards: records
            .iter()
            .enumerate()
            .map(|(i, record)| ResultCard::new(i + 1, record, max_chars))
            .collect(),
        references: references_table(records),
    }
}
