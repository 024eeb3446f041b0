/*!
 * reStructuredText classification.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use super::{
    fill_gaps, indent_width, is_blank, line_body, lines_with_offsets, ProtectedKind, Span,
    SpanBuilder,
};

/// Directives whose body is code or paths rather than prose
static PROTECTED_BODY_DIRECTIVES: &[&str] = &[
    "code", "code-block", "sourcecode", "literalinclude", "include", "math", "raw",
    "highlight", "testcode", "testoutput", "testsetup", "doctest", "toctree", "graphviz",
    "autosummary", "csv-table",
];

/// Directives whose arguments and body are prose
static PROSE_DIRECTIVES: &[&str] = &[
    "note", "warning", "tip", "important", "caution", "danger", "error", "hint", "attention",
    "admonition", "seealso", "topic", "sidebar", "rubric", "deprecated", "versionadded",
    "versionchanged", "epigraph", "pull-quote", "highlights",
];

/// Roles whose content is displayed text
static PROSE_ROLES: &[&str] = &[
    "abbr", "guilabel", "menuselection", "emphasis", "strong", "sub", "sup",
    "title-reference", "dfn",
];

/// Roles whose content is `title <target>` when it carries angle brackets
static LINKING_ROLES: &[&str] = &["ref", "doc", "numref", "term", "download", "any"];

const ADORNMENT_CHARS: &str = "=-`:'\"~^_*+#<>";

static DIRECTIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*\.\.[ \t]+([A-Za-z0-9][\w:+.-]*)::(?:[ \t]+|$)").unwrap());

static OPTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]+:[\w-]+:").unwrap());

static FOOTNOTE_DEF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*\.\.[ \t]+\[(?:#[\w-]*|\*|\d+|[A-Za-z][\w.-]*)\][ \t]*").unwrap());

static EXPLICIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*\.\.(?:[ \t]|$)").unwrap());

static TABLE_BORDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*(?:\+[-=+]+\+|=+(?:[ \t]+=+)+)[ \t]*$").unwrap());

static INLINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<literal>``[^`\n]+?``)",
        r"|(?P<role>:(?P<rolename>[\w.+-]+(?::[\w.+-]+)?):`(?P<rolebody>[^`\n]+)`)",
        r"|(?P<field>(?m:^[ \t]*:[A-Za-z][\w .-]*:(?:[ \t]+|$)))",
        r"|(?P<linkopen>`)(?P<linktext>[^`<\n]+?)(?P<linkclose>[ \t]*<[^>\n]+>`__?)",
        r"|(?P<named>`[^`\n]+`__?)",
        r"|(?P<interpreted>`[^`\n]+`)",
        r"|(?P<footnote>\[(?:#[\w-]*|\*|\d+|[A-Za-z][\w.-]*)\]_)",
        r"|(?P<subst>\|[^|\s][^|\n]*\|(?:__?)?)",
        r"|(?P<url>(?:https?|ftp)://[^\s<>`]+)",
    ))
    .unwrap()
});

pub(super) fn classify(content: &str) -> Vec<Span> {
    let blocks = block_ranges(content);
    let mut builder = SpanBuilder::new();
    fill_gaps(content, &blocks, &mut builder, scan_inline);
    builder.finish(content.len())
}

fn is_adornment(body: &str) -> bool {
    let trimmed = body.trim_end();
    let Some(first) = trimmed.chars().next() else {
        return false;
    };
    trimmed.len() >= 3
        && ADORNMENT_CHARS.contains(first)
        && trimmed.chars().all(|c| c == first)
}

/// First and last line of the block indented deeper than `base`, starting at `from`
fn indented_block(lines: &[(usize, &str)], from: usize, base: usize) -> Option<(usize, usize)> {
    let first = (from..lines.len()).find(|j| !is_blank(lines[*j].1))?;
    if indent_width(lines[first].1) <= base {
        return None;
    }
    let mut last = first;
    let mut j = first + 1;
    while j < lines.len() {
        let line = lines[j].1;
        if is_blank(line) {
            j += 1;
            continue;
        }
        if indent_width(line) <= base {
            break;
        }
        last = j;
        j += 1;
    }
    Some((first, last))
}

fn block_ranges(content: &str) -> Vec<(Range<usize>, ProtectedKind)> {
    let lines = lines_with_offsets(content);
    let line_end = |index: usize| lines[index].0 + lines[index].1.len();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let (start, line) = lines[i];
        let body = line_body(line);
        let indent = indent_width(body);

        if is_adornment(body) || TABLE_BORDER_RE.is_match(body) {
            blocks.push((start..line_end(i), ProtectedKind::SectionAdornment));
            i += 1;
            continue;
        }

        if let Some(caps) = DIRECTIVE_RE.captures(body) {
            let name = caps[1].to_lowercase();
            let header = caps.get(0).map_or(body.len(), |m| m.end());

            let mut last = i;
            while last + 1 < lines.len() && OPTION_RE.is_match(line_body(lines[last + 1].1)) {
                last += 1;
            }

            if PROSE_DIRECTIVES.contains(&name.as_str()) {
                blocks.push((start..start + header, ProtectedKind::Directive));
                if last > i {
                    blocks.push((lines[i + 1].0..line_end(last), ProtectedKind::Directive));
                }
                i = last + 1;
                continue;
            }

            blocks.push((start..line_end(last), ProtectedKind::Directive));
            i = last + 1;
            if PROTECTED_BODY_DIRECTIVES.contains(&name.as_str()) {
                if let Some((first, body_last)) = indented_block(&lines, i, indent) {
                    blocks.push((lines[first].0..line_end(body_last), ProtectedKind::DirectiveBody));
                    i = body_last + 1;
                }
            }
            continue;
        }

        if let Some(marker) = FOOTNOTE_DEF_RE.find(body) {
            blocks.push((start..start + marker.end(), ProtectedKind::ExplicitMarkup));
            i += 1;
            continue;
        }

        if EXPLICIT_RE.is_match(body) {
            // Comments, hyperlink targets and substitution definitions
            let last = indented_block(&lines, i + 1, indent).map_or(i, |(_, last)| last);
            blocks.push((start..line_end(last), ProtectedKind::ExplicitMarkup));
            i = last + 1;
            continue;
        }

        if body.trim_start().starts_with(">>>") {
            let mut last = i;
            while last + 1 < lines.len() && !is_blank(lines[last + 1].1) {
                last += 1;
            }
            blocks.push((start..line_end(last), ProtectedKind::LiteralBlock));
            i = last + 1;
            continue;
        }

        if body.trim_end().ends_with("::") {
            if let Some((first, last)) = indented_block(&lines, i + 1, indent) {
                blocks.push((lines[first].0..line_end(last), ProtectedKind::LiteralBlock));
                i = last + 1;
                continue;
            }
        }

        i += 1;
    }

    blocks
}

fn scan_inline(text: &str, base: usize, builder: &mut SpanBuilder) {
    let at = |range: Range<usize>| base + range.start..base + range.end;

    for caps in INLINE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };

        if let (Some(name), Some(body)) = (caps.name("rolename"), caps.name("rolebody")) {
            let name = name.as_str().rsplit(':').next().unwrap_or_default().to_lowercase();
            let content = body.as_str();
            if PROSE_ROLES.contains(&name.as_str()) {
                builder.protect(at(whole.start()..body.start()), ProtectedKind::Role);
                builder.protect(at(body.end()..whole.end()), ProtectedKind::Role);
            } else if LINKING_ROLES.contains(&name.as_str()) && content.ends_with('>') {
                match content.rfind('<') {
                    Some(lt) if !content[..lt].trim().is_empty() => {
                        let title_end = body.start() + content[..lt].trim_end().len();
                        builder.protect(at(whole.start()..body.start()), ProtectedKind::Role);
                        builder.protect(at(title_end..whole.end()), ProtectedKind::Reference);
                    }
                    _ => builder.protect(at(whole.range()), ProtectedKind::Role),
                }
            } else {
                builder.protect(at(whole.range()), ProtectedKind::Role);
            }
        } else if let (Some(open), Some(close)) = (caps.name("linkopen"), caps.name("linkclose")) {
            builder.protect(at(open.range()), ProtectedKind::LinkDelimiter);
            builder.protect(at(close.range()), ProtectedKind::LinkTarget);
        } else if let Some(literal) = caps.name("literal").or_else(|| caps.name("interpreted")) {
            builder.protect(at(literal.range()), ProtectedKind::InlineCode);
        } else if let Some(field) = caps.name("field") {
            builder.protect(at(field.range()), ProtectedKind::FieldMarker);
        } else if let Some(url) = caps.name("url") {
            let trimmed = url
                .as_str()
                .trim_end_matches(['.', ',', ';', ':', '!', '?', '\'', '"', ')']);
            builder.protect(at(url.start()..url.start() + trimmed.len()), ProtectedKind::Url);
        } else {
            // Named references, footnote references and substitutions
            builder.protect(at(whole.range()), ProtectedKind::Reference);
        }
    }
}
