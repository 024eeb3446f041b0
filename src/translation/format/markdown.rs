/*!
 * Markdown and MDX classification.
 *
 * Block constructs (front matter, fenced code, raw HTML blocks, link
 * reference definitions, MDX import/export statements) are found line by
 * line. The prose between them is scanned for inline constructs: code spans,
 * link targets, URLs, inline HTML and, for MDX, `{expression}` islands.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use super::{
    fill_gaps, indent_width, is_blank, line_body, lines_with_offsets, ProtectedKind, Span,
    SpanBuilder,
};

/// Tags that open a raw HTML block ending at the next blank line
static HTML_BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption",
    "center", "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2",
    "h3", "h4", "h5", "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link",
    "main", "menu", "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param",
    "section", "source", "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title",
    "tr", "track", "ul",
];

/// Tags whose content is never markdown
static RAW_TAGS: &[&str] = &["script", "style", "pre", "textarea"];

static HTML_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^</?([A-Za-z][A-Za-z0-9-]*)(?:[\s/>]|$)").unwrap());

static LINK_DEFINITION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}\[[^\]\^][^\]]*\]:[ \t]*\S+").unwrap());

static MDX_ESM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:import|export)\s").unwrap());

const INLINE_PATTERN: &str = concat!(
    r#"(?P<comment>(?s:<!--.*?-->))"#,
    r#"|(?P<autolink><(?:https?|ftp|mailto):[^<>\s]+>)"#,
    r#"|(?P<open>!?\[)(?P<label>[^\[\]\n]*)(?P<close>\]\((?:[^()\s]|\([^()\s]*\))*(?:\s+(?:"[^"\n]*"|'[^'\n]*'))?\))"#,
    r#"|(?P<refopen>!?\[)(?P<reflabel>[^\[\]\n]+)(?P<refclose>\]\[[^\[\]\n]*\])"#,
    r#"|(?P<target>\]\((?:[^()\s]|\([^()\s]*\))*\))"#,
    r#"|(?P<footnote>\[\^[^\]\s]+\])"#,
    r#"|(?P<tag></?[A-Za-z][A-Za-z0-9:.-]*(?:\s+[^<>]*?)?\s*/?>)"#,
    r#"|(?P<url>(?:https?|ftp)://[^\s<>()\[\]`]+)"#,
    r#"|(?P<entity>&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);)"#,
);

/// Container and leaf markers opening a line: blockquotes, thematic breaks,
/// setext underlines, ATX headings, bullets, ordered items and task boxes
static LINE_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?m)^[ \t]*(?:>[ \t]?)*",
        r"(?:(?:[-*_][ \t]*){3,}$",
        r"|=+[ \t]*$",
        r"|#{1,6}(?:[ \t]+|$)",
        r"|(?:[-*+]|[0-9]{1,9}[.)])(?:[ \t]+|$)(?:\[[ xX]\](?:[ \t]+|$))?)?",
    ))
    .unwrap()
});

static INLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(INLINE_PATTERN).unwrap());

static MDX_INLINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{}|(?P<expr>\{{[^{{}}\n]*\}})", INLINE_PATTERN)).unwrap()
});

pub(super) fn classify(content: &str, mdx: bool) -> Vec<Span> {
    let blocks = block_ranges(content, mdx);
    let mut builder = SpanBuilder::new();
    fill_gaps(content, &blocks, &mut builder, |text, base, builder| {
        scan_inline(text, base, builder, mdx)
    });
    builder.finish(content.len())
}

fn block_ranges(content: &str, mdx: bool) -> Vec<(Range<usize>, ProtectedKind)> {
    let lines = lines_with_offsets(content);
    let line_end = |index: usize| lines[index].0 + lines[index].1.len();
    let mut blocks = Vec::new();
    let mut i = 0;

    if let Some(last) = front_matter_end(&lines) {
        blocks.push((0..line_end(last), ProtectedKind::FrontMatter));
        i = last + 1;
    }

    while i < lines.len() {
        let (start, line) = lines[i];
        let body = line_body(line);

        if let Some((marker, len)) = fence_open(body) {
            let mut j = i + 1;
            while j < lines.len() && !fence_close(line_body(lines[j].1), marker, len) {
                j += 1;
            }
            // An unclosed fence runs to the end of the document
            let last = j.min(lines.len() - 1);
            blocks.push((start..line_end(last), ProtectedKind::CodeFence));
            i = last + 1;
            continue;
        }

        if let Some(last) = html_block_end(&lines, i, mdx) {
            blocks.push((start..line_end(last), ProtectedKind::HtmlBlock));
            i = last + 1;
            continue;
        }

        if mdx && MDX_ESM_RE.is_match(body) {
            let last = paragraph_end(&lines, i);
            blocks.push((start..line_end(last), ProtectedKind::MdxEsm));
            i = last + 1;
            continue;
        }

        if LINK_DEFINITION_RE.is_match(body) {
            blocks.push((start..line_end(i), ProtectedKind::LinkDefinition));
        }
        i += 1;
    }

    blocks
}

fn front_matter_end(lines: &[(usize, &str)]) -> Option<usize> {
    let first = line_body(lines.first()?.1);
    if first != "---" && first != "+++" {
        return None;
    }
    lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, (_, line))| {
            let body = line_body(line);
            body == first || (first == "---" && body == "...")
        })
        .map(|(index, _)| index)
}

fn fence_open(body: &str) -> Option<(char, usize)> {
    let trimmed = body.trim_start();
    let marker = trimmed.chars().next()?;
    if marker != '`' && marker != '~' {
        return None;
    }
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    // Backtick fences cannot carry backticks in their info string
    if marker == '`' && trimmed[len..].contains('`') {
        return None;
    }
    Some((marker, len))
}

fn fence_close(body: &str, marker: char, len: usize) -> bool {
    let trimmed = body.trim();
    trimmed.len() >= len && trimmed.chars().all(|c| c == marker)
}

fn paragraph_end(lines: &[(usize, &str)], start: usize) -> usize {
    let mut last = start;
    while last + 1 < lines.len() && !is_blank(lines[last + 1].1) {
        last += 1;
    }
    last
}

fn html_block_end(lines: &[(usize, &str)], start: usize, mdx: bool) -> Option<usize> {
    let body = line_body(lines[start].1);
    if indent_width(body) > 3 {
        return None;
    }
    let trimmed = body.trim_start();

    if trimmed.starts_with("<!--") {
        let first_tail = &trimmed[4..];
        if first_tail.contains("-->") {
            return Some(start);
        }
        let last = (start + 1..lines.len())
            .find(|j| lines[*j].1.contains("-->"))
            .unwrap_or(lines.len() - 1);
        return Some(last);
    }

    if trimmed.starts_with("<!") || trimmed.starts_with("<?") {
        return Some(paragraph_end(lines, start));
    }

    let name = HTML_OPEN_RE.captures(trimmed)?.get(1)?.as_str();
    let lower = name.to_lowercase();

    if !trimmed.starts_with("</") && RAW_TAGS.contains(&lower.as_str()) {
        let closing = format!("</{}>", lower);
        let last = (start..lines.len())
            .find(|j| lines[*j].1.to_lowercase().contains(&closing))
            .unwrap_or(lines.len() - 1);
        return Some(last);
    }

    let is_component = mdx && name.starts_with(|c: char| c.is_ascii_uppercase());
    if HTML_BLOCK_TAGS.contains(&lower.as_str()) || is_component {
        return Some(paragraph_end(lines, start));
    }

    None
}

fn scan_inline(text: &str, base: usize, builder: &mut SpanBuilder, mdx: bool) {
    let code = code_spans(text);
    let mut found = line_markers(text, &code);
    let mut pos = 0;
    for range in &code {
        scan_markup(&text[pos..range.start], pos, &mut found, mdx);
        found.push((range.clone(), ProtectedKind::InlineCode));
        pos = range.end;
    }
    scan_markup(&text[pos..], pos, &mut found, mdx);

    // Overlaps are clamped by the builder, the earliest start wins
    found.sort_by_key(|(range, _)| range.start);
    for (range, kind) in found {
        builder.protect(base + range.start..base + range.end, kind);
    }
}

/// Line-start markers outside code spans. `text` starts at a line start.
fn line_markers(text: &str, code: &[Range<usize>]) -> Vec<(Range<usize>, ProtectedKind)> {
    LINE_MARKER_RE
        .find_iter(text)
        .filter(|m| !m.as_str().trim().is_empty())
        .filter(|m| {
            let index = code.partition_point(|span| span.end <= m.start());
            !code.get(index).is_some_and(|span| span.start < m.start())
        })
        .map(|m| (m.range(), ProtectedKind::LineMarker))
        .collect()
}

/// Backtick code spans: a run of n backticks closed by the next run of exactly n
fn code_spans(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let run_length = |from: usize| bytes[from..].iter().take_while(|b| **b == b'`').count();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let run = run_length(i);
        let mut j = i + run;
        let mut closed = None;
        while j < bytes.len() {
            if bytes[j] == b'`' {
                let close = run_length(j);
                if close == run {
                    closed = Some(j + close);
                    break;
                }
                j += close;
            } else {
                j += 1;
            }
        }
        match closed {
            Some(end) => {
                spans.push(i..end);
                i = end;
            }
            None => i += run,
        }
    }

    spans
}

fn scan_markup(text: &str, base: usize, found: &mut Vec<(Range<usize>, ProtectedKind)>, mdx: bool) {
    let regex: &Regex = if mdx { &MDX_INLINE_RE } else { &INLINE_RE };
    let at = |range: Range<usize>| base + range.start..base + range.end;
    let mut protect = |range: Range<usize>, kind: ProtectedKind| found.push((at(range), kind));

    for caps in regex.captures_iter(text) {
        if let (Some(open), Some(close)) = (caps.name("open"), caps.name("close")) {
            protect(open.range(), ProtectedKind::LinkDelimiter);
            protect(close.range(), ProtectedKind::LinkTarget);
        } else if let (Some(open), Some(close)) = (caps.name("refopen"), caps.name("refclose")) {
            protect(open.range(), ProtectedKind::LinkDelimiter);
            protect(close.range(), ProtectedKind::LinkTarget);
        } else if let Some(target) = caps.name("target") {
            protect(target.range(), ProtectedKind::LinkTarget);
        } else if let Some(url) = caps.name("url") {
            let trimmed = url
                .as_str()
                .trim_end_matches(['.', ',', ';', ':', '!', '?', '\'', '"']);
            protect(url.start()..url.start() + trimmed.len(), ProtectedKind::Url);
        } else if let Some(autolink) = caps.name("autolink") {
            protect(autolink.range(), ProtectedKind::Url);
        } else if let Some(html) = caps.name("comment").or_else(|| caps.name("tag")) {
            protect(html.range(), ProtectedKind::InlineHtml);
        } else if let Some(footnote) = caps.name("footnote") {
            protect(footnote.range(), ProtectedKind::Reference);
        } else if let Some(entity) = caps.name("entity") {
            protect(entity.range(), ProtectedKind::Entity);
        } else if let Some(expr) = caps.name("expr") {
            protect(expr.range(), ProtectedKind::Expression);
        }
    }
}
