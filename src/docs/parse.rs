//! Field extraction from RFC/draft plain text and HTML pages.
//!
//! These are heuristics. They work on the common layouts and degrade to
//! placeholder values (the document name as title, empty authors) otherwise.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::docs::model::{RfcSummary, Section};

/// Declares a lazily compiled built-in pattern.
///
/// An invalid pattern is logged once and treated as never matching.
macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> Option<&'static Regex> {
            static CELL: OnceLock<Option<Regex>> = OnceLock::new();
            CELL.get_or_init(|| match Regex::new($pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::error!(pattern = $pattern, error = %e, "Invalid built-in pattern");
                    None
                }
            })
            .as_ref()
        }
    };
}

static_regex!(title_field, r"(?i)(?:Title|Internet-Draft):\s*(.*?)(?:\r?\n\r?\n|\r?\n\s*\r?\n)");
static_regex!(author_field, r"(?is)(?:Author|Authors):\s*(.*?)(?:\r?\n\r?\n|\r?\n\s*\r?\n)");
static_regex!(abstract_block, r"(?is)Abstract\s*(?:\r?\n)+\s*(.*?)(?:\r?\n\r?\n|\r?\n\s*\r?\n)");
static_regex!(section_heading, r"^(?:\d+\.)+\s+(.+)$");
static_regex!(date_line, r"^\w+\s+\d{4}$");
static_regex!(
    protocol_title,
    r"^\s*([^.]*(?:Protocol|Transfer|Transport|System|Method|Format|Standard|Specification)[^.]*)\s*$"
);
static_regex!(dashed_title, r"^\s*([A-Z][^.]*--[^.]*)\s*$");
static_regex!(capitalised_title, r"^\s*([A-Z][a-z].*[a-z])\s*$");
static_regex!(version_suffix, r"-(\d{2})$");
static_regex!(html_title, r"(?is)<title[^>]*>(.*?)</title\s*>");
static_regex!(html_h1, r"(?is)<h1[^>]*>(.*?)</h1\s*>");
static_regex!(html_heading, r"(?is)<h[2-4]\b[^>]*>(.*?)</h[2-4]\s*>");
static_regex!(html_script, r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->");
static_regex!(html_tag, r"(?s)<[^>]+>");
static_regex!(html_entity, r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);");
static_regex!(table_row, r"(?is)<tr[^>]*>.*?</tr>");
static_regex!(table_cell, r"(?is)<td[^>]*>(.*?)</td>");
static_regex!(rfc_reference, r"(?i)rfc(\d+)");

/// Fields extracted from a plain-text document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedText {
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub sections: Vec<Section>,
}

/// Fields extracted from an HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHtml {
    pub title: String,
    pub text: String,
    pub sections: Vec<Section>,
}

/// Parses an RFC in the RFC Editor's plain-text layout.
///
/// The title comes from a `Title:` field if present, then from the first
/// substantial line after the date line, then from lines that look like
/// protocol names. The fallback is `RFC {number}`.
#[must_use]
pub fn parse_rfc_text(text: &str, number: &str) -> ParsedText {
    let fallback = format!("RFC {number}");
    let title = title_from_field(text)
        .or_else(|| title_after_date(text))
        .or_else(|| title_from_patterns(text))
        .unwrap_or(fallback);

    ParsedText {
        title,
        authors: extract_authors(text),
        abstract_text: extract_abstract(text),
        sections: extract_sections(text),
    }
}

/// Parses an Internet-Draft in plain-text layout.
///
/// The title comes from a `Title:` field only; otherwise the draft name.
#[must_use]
pub fn parse_draft_text(text: &str, name: &str) -> ParsedText {
    ParsedText {
        title: title_from_field(text).unwrap_or_else(|| name.to_string()),
        authors: extract_authors(text),
        abstract_text: extract_abstract(text),
        sections: extract_sections(text),
    }
}

fn title_from_field(text: &str) -> Option<String> {
    let caps = title_field()?.captures(text)?;
    let title = caps.get(1)?.as_str().trim();
    (!title.is_empty()).then(|| title.to_string())
}

fn title_after_date(text: &str) -> Option<String> {
    let date = date_line()?;
    let mut found_date = false;

    for line in text.lines().take(50) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if date.is_match(line) {
            found_date = true;
            continue;
        }

        if !found_date {
            continue;
        }

        let lower = line.to_lowercase();
        if ["status of this memo", "copyright notice", "abstract"]
            .iter()
            .any(|skip| lower.contains(skip))
        {
            continue;
        }

        if line.chars().count() > 15
            && !is_all_upper(line)
            && line.split_whitespace().count() > 2
            && !line.starts_with("This document")
            && !line.starts_with("Copyright")
        {
            return Some(line.to_string());
        }
    }

    None
}

fn title_from_patterns(text: &str) -> Option<String> {
    let window: Vec<&str> = text.lines().skip(20).take(20).collect();

    [protocol_title(), dashed_title(), capitalised_title()]
        .into_iter()
        .flatten()
        .find_map(|pattern| {
            window.iter().find_map(|line| {
                let line = line.trim();
                (line.chars().count() > 15 && pattern.is_match(line)).then(|| line.to_string())
            })
        })
}

/// Returns `true` if the line has letters and none of them are lowercase.
fn is_all_upper(line: &str) -> bool {
    line.chars().any(char::is_alphabetic) && !line.chars().any(char::is_lowercase)
}

fn extract_authors(text: &str) -> Vec<String> {
    let Some(caps) = author_field().and_then(|re| re.captures(text)) else {
        return Vec::new();
    };

    caps.get(1)
        .map(|m| m.as_str())
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("Authors:"))
        .map(str::to_string)
        .collect()
}

fn extract_abstract(text: &str) -> String {
    abstract_block()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace("\r\n", " ").replace('\n', " ").trim().to_string())
        .unwrap_or_default()
}

/// Splits plain text at numbered headings such as `4.2.  Message Headers`.
///
/// A trailing heading with no body is dropped.
#[must_use]
pub fn extract_sections(text: &str) -> Vec<Section> {
    let Some(heading) = section_heading() else {
        return Vec::new();
    };

    let mut sections = Vec::new();
    let mut current: Option<String> = None;
    let mut content: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = heading.captures(line) {
            if let Some(title) = current.take() {
                sections.push(Section {
                    title,
                    content: content.join("\n"),
                });
            }
            current = caps.get(1).map(|m| m.as_str().trim().to_string());
            content.clear();
        } else if current.is_some() {
            content.push(line);
        }
    }

    if let Some(title) = current {
        if !content.is_empty() {
            sections.push(Section {
                title,
                content: content.join("\n"),
            });
        }
    }

    sections
}

/// Parses an HTML rendition of a document.
///
/// The title comes from `<title>`, then `<h1>`, then `fallback_title`.
/// Sections are the `h2`–`h4` headings, each with the text up to the next one.
#[must_use]
pub fn parse_html(html: &str, fallback_title: &str) -> ParsedHtml {
    let title = [html_title(), html_h1()]
        .into_iter()
        .flatten()
        .find_map(|re| {
            let inner = re.captures(html)?.get(1)?.as_str();
            let text = html_to_text(inner);
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| fallback_title.to_string());

    ParsedHtml {
        title,
        text: html_to_text(html),
        sections: extract_html_sections(html),
    }
}

fn extract_html_sections(html: &str) -> Vec<Section> {
    let Some(heading) = html_heading() else {
        return Vec::new();
    };

    let matches: Vec<_> = heading.captures_iter(html).collect();
    let mut sections = Vec::new();

    for (idx, caps) in matches.iter().enumerate() {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let title = html_to_text(inner.as_str());
        if title.is_empty() {
            continue;
        }

        let end = matches
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map_or(html.len(), |m| m.start());

        sections.push(Section {
            title,
            content: html_to_text(&html[whole.end()..end]),
        });
    }

    sections
}

/// Reduces HTML to whitespace-normalised text.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let without_scripts = html_script().map_or_else(
        || html.to_string(),
        |re| re.replace_all(html, " ").into_owned(),
    );
    let without_tags = html_tag().map_or_else(
        || without_scripts.clone(),
        |re| re.replace_all(&without_scripts, " ").into_owned(),
    );
    let decoded = decode_entities(&without_tags);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes named and numeric character references.
///
/// Unknown named references are left as they are.
#[must_use]
pub fn decode_entities(text: &str) -> String {
    let Some(re) = html_entity() else {
        return text.to_string();
    };

    re.replace_all(text, |caps: &Captures<'_>| {
        let entity = &caps[1];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                .and_then(Result::ok)
                .and_then(char::from_u32),
        };
        decoded.map_or_else(|| caps[0].to_string(), String::from)
    })
    .into_owned()
}

/// Returns the two-digit revision suffix of a draft name, if present.
#[must_use]
pub fn extract_version(name: &str) -> Option<String> {
    version_suffix()?
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parses the RFC Editor search results table.
///
/// A row counts as a hit if it mentions `rfcNNNN` and has at least three
/// cells, one of cells two to four being a non-numeric title longer than ten
/// characters.
#[must_use]
pub fn parse_rfc_search_results(html: &str, rfc_editor_url: &str) -> Vec<RfcSummary> {
    let (Some(row_re), Some(cell_re), Some(rfc_re)) = (table_row(), table_cell(), rfc_reference())
    else {
        return Vec::new();
    };

    let base = rfc_editor_url.trim_end_matches('/');

    row_re
        .find_iter(html)
        .filter_map(|row| {
            let row = row.as_str();
            let number = rfc_re.captures(row)?.get(1)?.as_str().to_string();

            let cells: Vec<String> = cell_re
                .captures_iter(row)
                .filter_map(|caps| caps.get(1))
                .map(|m| html_to_text(m.as_str()))
                .collect();
            if cells.len() < 3 {
                return None;
            }

            let title = cells.iter().skip(1).take(3).find(|cell| {
                cell.chars().count() > 10 && !cell.chars().all(|c| c.is_ascii_digit())
            })?;

            Some(RfcSummary {
                url: format!("{base}/info/rfc{number}"),
                number,
                title: title.clone(),
                authors: Vec::new(),
                date: String::new(),
                status: String::new(),
                abstract_text: String::new(),
            })
        })
        .collect()
}
