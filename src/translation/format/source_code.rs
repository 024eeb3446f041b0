/*!
 * Source-code classification.
 *
 * A single forward scan finds comments and string literals. Everything else
 * is code and stays protected. Comment markers, string delimiters, escapes
 * and interpolations are protected inline so that a comment or a string
 * becomes a chunk of its own, and runs of consecutive comment lines
 * separated only by whitespace end up in the same chunk.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use super::{CodeSyntax, ProtectedKind, Span, SpanBuilder};
use crate::app_config::CodeMode;

/// Comments that drive tools rather than document code
static PYTHON_PRAGMA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#\s*(?:noqa|type:|pylint:|pragma|fmt:|isort:|mypy:|-\*-|vim:)").unwrap()
});

static CLIKE_PRAGMA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/[/*][/*!]?\s*(?:eslint|@ts-|prettier-ignore|NOLINT|go:|tslint|istanbul|jshint|global\s|noinspection|swiftlint|clang-format|webpack)").unwrap()
});

static COMMENT_INLINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?P<url>(?:https?|ftp)://[^\s<>()"'`]+)"#,
        r"|(?P<code>`[^`\n]+`)",
        r"|(?P<tag>@(?:param|arg|argument|throws|exception|typedef|template|property|prop)\s+(?:\{[^}\n]*\}\s*)?[\w.$\[\]]+|@\w+)",
    ))
    .unwrap()
});

/// Line breaks inside block comments with their indentation and leading `*`
static DECORATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*(?:\*[ \t]*)?").unwrap());

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\{[\w.:!?#\[\]<>^+\- ]*\}|%(?:\([A-Za-z_]\w*\))?[-+ #0]*(?:\d+|\*)?(?:\.\d+)?[sdifxXeEgGcro])").unwrap()
});

static CHAR_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^'(?:\\(?:u\{[0-9a-fA-F]+\}|x[0-9a-fA-F]{2}|.)|[^'\\\n])'").unwrap()
});

static BRACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$?\{[^{}]*\}").unwrap());

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}{2,}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyStyle {
    Plain,
    Raw,
    FString,
    Template,
}

pub(super) fn classify(content: &str, syntax: CodeSyntax, mode: CodeMode) -> Vec<Span> {
    Scanner {
        content,
        bytes: content.as_bytes(),
        syntax,
        mode,
        builder: SpanBuilder::new(),
        code_start: 0,
    }
    .run()
}

/// A string literal worth handing to the backend looks like a sentence
fn is_prose(text: &str) -> bool {
    let stripped = BRACES_RE.replace_all(text, " ");
    text.chars().any(char::is_whitespace) && WORD_RE.is_match(&stripped)
}

fn has_letters(text: &str) -> bool {
    text.chars().any(char::is_alphabetic)
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

struct Scanner<'a> {
    content: &'a str,
    bytes: &'a [u8],
    syntax: CodeSyntax,
    mode: CodeMode,
    builder: SpanBuilder,
    /// Start of the code run not yet protected
    code_start: usize,
}

impl Scanner<'_> {
    fn run(mut self) -> Vec<Span> {
        let len = self.bytes.len();
        let mut i = 0;

        while i < len {
            let byte = self.bytes[i];
            let next = self.bytes.get(i + 1).copied();
            i = match self.syntax {
                CodeSyntax::Python => match byte {
                    b'#' => self.python_comment(i),
                    b'"' | b'\'' => self.python_string(i),
                    _ => i + 1,
                },
                CodeSyntax::CLike | CodeSyntax::JavaScript => match (byte, next) {
                    (b'/', Some(b'/')) => self.line_comment(i),
                    (b'/', Some(b'*')) => self.block_comment(i),
                    (b'"', _) => self.quoted_string(i),
                    (b'\'', _) if self.syntax == CodeSyntax::JavaScript => self.quoted_string(i),
                    (b'\'', _) => self.char_literal(i),
                    (b'`', _) => self.backtick_string(i),
                    _ => i + 1,
                },
            };
        }

        self.flush_code(len);
        self.builder.finish(len)
    }

    /// Protect the pending code run up to `end`
    fn flush_code(&mut self, end: usize) {
        if end > self.code_start {
            let kind = if self.content[self.code_start..end].trim().is_empty() {
                ProtectedKind::Whitespace
            } else {
                ProtectedKind::CodeSyntax
            };
            self.builder.protect(self.code_start..end, kind);
        }
        self.code_start = end;
    }

    fn line_end(&self, from: usize) -> usize {
        self.content[from..]
            .find('\n')
            .map_or(self.bytes.len(), |pos| from + pos)
    }

    fn line_start(&self, at: usize) -> usize {
        self.content[..at].rfind('\n').map_or(0, |pos| pos + 1)
    }

    /// End of a literal starting at `from`, as (closing delimiter start, literal end)
    fn find_close(&self, from: usize, closing: &[u8], escapes: bool, single_line: bool) -> (usize, usize) {
        let len = self.bytes.len();
        let mut j = from;
        while j < len {
            let byte = self.bytes[j];
            if escapes && byte == b'\\' {
                j += 2;
                continue;
            }
            if single_line && byte == b'\n' {
                return (j, j);
            }
            if self.bytes[j..].starts_with(closing) {
                return (j, j + closing.len());
            }
            j += 1;
        }
        (len, len)
    }

    fn python_comment(&mut self, start: usize) -> usize {
        let end = self.line_end(start);
        let text = &self.content[start..end];
        let tooling = (start == 0 && text.starts_with("#!")) || PYTHON_PRAGMA_RE.is_match(text);
        if tooling || self.mode == CodeMode::DocCommentsOnly {
            return end;
        }
        let body = text.trim_start_matches('#').trim_start_matches([' ', '\t']);
        self.emit_line_comment(start, end - body.len(), end);
        end
    }

    fn line_comment(&mut self, start: usize) -> usize {
        let end = self.line_end(start);
        let text = &self.content[start..end];
        let doc = (text.starts_with("///") && !text.starts_with("////")) || text.starts_with("//!");
        let allowed = doc || self.mode == CodeMode::CommentsAndStrings;
        if !allowed || CLIKE_PRAGMA_RE.is_match(text) {
            return end;
        }
        let body = text
            .trim_start_matches('/')
            .trim_start_matches('!')
            .trim_start_matches([' ', '\t']);
        self.emit_line_comment(start, end - body.len(), end);
        end
    }

    fn emit_line_comment(&mut self, start: usize, marker_end: usize, end: usize) {
        // Rulers such as `# -----` stay with the code
        if !has_letters(&self.content[marker_end..end]) {
            return;
        }
        self.flush_code(start);
        self.builder.protect(start..marker_end, ProtectedKind::CommentMarker);
        self.protect_comment_body(marker_end, end, false);
        self.code_start = end;
    }

    fn block_comment(&mut self, start: usize) -> usize {
        let len = self.bytes.len();
        let (close_start, end) = match self.content[start + 2..].find("*/") {
            Some(pos) => (start + 2 + pos, start + 4 + pos),
            None => (len, len),
        };
        let text = &self.content[start..end];
        let doc = (text.starts_with("/**") && !text.starts_with("/**/")) || text.starts_with("/*!");
        let allowed = doc || self.mode == CodeMode::CommentsAndStrings;
        if !allowed || CLIKE_PRAGMA_RE.is_match(text) {
            return end;
        }

        let mut open_end = start + 2;
        while open_end < close_start && matches!(self.bytes[open_end], b'*' | b'!') {
            open_end += 1;
        }
        if !has_letters(&self.content[open_end..close_start]) {
            return end;
        }

        self.flush_code(start);
        self.builder.protect(start..open_end, ProtectedKind::CommentMarker);
        self.protect_comment_body(open_end, close_start, true);
        if end > close_start {
            self.builder.protect(close_start..end, ProtectedKind::CommentMarker);
        }
        self.code_start = end;
        end
    }

    fn protect_comment_body(&mut self, start: usize, end: usize, block: bool) {
        let text = &self.content[start..end];
        let mut ranges: Vec<(Range<usize>, ProtectedKind)> = COMMENT_INLINE_RE
            .captures_iter(text)
            .filter_map(|caps| {
                if let Some(url) = caps.name("url") {
                    Some((url.range(), ProtectedKind::Url))
                } else if let Some(code) = caps.name("code") {
                    Some((code.range(), ProtectedKind::InlineCode))
                } else {
                    caps.name("tag").map(|tag| (tag.range(), ProtectedKind::CommentMarker))
                }
            })
            .collect();
        if block {
            ranges.extend(
                DECORATION_RE
                    .find_iter(text)
                    .map(|m| (m.range(), ProtectedKind::CommentMarker)),
            );
        }
        ranges.sort_by_key(|(range, _)| range.start);
        for (range, kind) in ranges {
            self.builder.protect(start + range.start..start + range.end, kind);
        }
    }

    fn python_string(&mut self, quote_pos: usize) -> usize {
        let quote = self.bytes[quote_pos];
        let mut start = quote_pos;
        while start > 0 && quote_pos - start < 2 && b"rRbBuUfF".contains(&self.bytes[start - 1]) {
            start -= 1;
        }
        if start > 0 && is_ident_byte(self.bytes[start - 1]) {
            start = quote_pos;
        }
        let prefix = self.content[start..quote_pos].to_ascii_lowercase();

        let triple = self.bytes[quote_pos..].starts_with(&[quote, quote, quote]);
        let open_end = quote_pos + if triple { 3 } else { 1 };
        let closing = vec![quote; open_end - quote_pos];
        let (close_start, end) = self.find_close(open_end, &closing, true, !triple);

        let body = &self.content[open_end..close_start.max(open_end)];
        let docstring = triple && self.content[self.line_start(start)..start].trim().is_empty();
        let translatable = !prefix.contains('b')
            && if docstring {
                has_letters(body)
            } else {
                self.mode == CodeMode::CommentsAndStrings && is_prose(body)
            };

        let style = if prefix.contains('f') {
            BodyStyle::FString
        } else if prefix.contains('r') {
            BodyStyle::Raw
        } else {
            BodyStyle::Plain
        };
        self.emit_string(start, open_end, close_start, end, style, translatable);
        end
    }

    fn quoted_string(&mut self, quote_pos: usize) -> usize {
        let quote = self.bytes[quote_pos];
        let mut start = quote_pos;
        let mut hashes = 0;
        let mut raw = false;
        let mut byte_string = false;

        if self.syntax == CodeSyntax::CLike && quote == b'"' {
            let mut p = quote_pos;
            while p > 0 && self.bytes[p - 1] == b'#' {
                p -= 1;
            }
            if p > 0 && self.bytes[p - 1] == b'r' {
                p -= 1;
                raw = true;
                hashes = quote_pos - p - 1;
            }
            if p > 0 && self.bytes[p - 1] == b'b' {
                p -= 1;
                byte_string = true;
            }
            let standalone = p == 0 || !is_ident_byte(self.bytes[p - 1]);
            if (raw || byte_string) && standalone {
                start = p;
            } else {
                raw = false;
                byte_string = false;
                hashes = 0;
            }
        }

        let mut closing = vec![quote];
        closing.extend(std::iter::repeat_n(b'#', hashes));
        let single_line = self.syntax == CodeSyntax::JavaScript;
        let open_end = quote_pos + 1;
        let (close_start, end) = self.find_close(open_end, &closing, !raw, single_line);

        let body = &self.content[open_end..close_start.max(open_end)];
        let translatable =
            !byte_string && self.mode == CodeMode::CommentsAndStrings && is_prose(body);
        let style = if raw { BodyStyle::Raw } else { BodyStyle::Plain };
        self.emit_string(start, open_end, close_start, end, style, translatable);
        end
    }

    fn backtick_string(&mut self, quote_pos: usize) -> usize {
        let open_end = quote_pos + 1;
        let (close_start, end, style) = if self.syntax == CodeSyntax::JavaScript {
            let (close_start, end) = self.find_template_close(open_end);
            (close_start, end, BodyStyle::Template)
        } else {
            let (close_start, end) = self.find_close(open_end, b"`", false, false);
            (close_start, end, BodyStyle::Raw)
        };
        let body = &self.content[open_end..close_start.max(open_end)];
        let translatable = self.mode == CodeMode::CommentsAndStrings && is_prose(body);
        self.emit_string(quote_pos, open_end, close_start, end, style, translatable);
        end
    }

    fn find_template_close(&self, from: usize) -> (usize, usize) {
        let len = self.bytes.len();
        let mut j = from;
        while j < len {
            match self.bytes[j] {
                b'\\' => j += 2,
                b'$' if self.bytes.get(j + 1) == Some(&b'{') => j = self.matching_brace(j + 1, len),
                b'`' => return (j, j + 1),
                _ => j += 1,
            }
        }
        (len, len)
    }

    /// Character literals are skipped so that `'"'` does not open a string
    fn char_literal(&mut self, at: usize) -> usize {
        CHAR_LITERAL_RE
            .find(&self.content[at..])
            .map_or(at + 1, |m| at + m.end())
    }

    fn emit_string(
        &mut self,
        start: usize,
        open_end: usize,
        close_start: usize,
        end: usize,
        style: BodyStyle,
        translatable: bool,
    ) {
        if !translatable || close_start <= open_end {
            return;
        }
        self.flush_code(start);
        self.builder.protect(start..open_end, ProtectedKind::StringDelimiter);
        self.protect_string_body(open_end, close_start, style);
        if end > close_start {
            self.builder.protect(close_start..end, ProtectedKind::StringDelimiter);
        }
        self.code_start = end;
    }

    fn protect_string_body(&mut self, start: usize, end: usize, style: BodyStyle) {
        let mut j = start;
        while j < end {
            let byte = self.bytes[j];
            let next = if j + 1 < end { Some(self.bytes[j + 1]) } else { None };
            match byte {
                b'\\' if style != BodyStyle::Raw => {
                    let len = self.escape_len(j, end);
                    self.builder.protect(j..j + len, ProtectedKind::Escape);
                    j += len;
                }
                b'{' | b'}' if style != BodyStyle::Template && next == Some(byte) => {
                    self.builder.protect(j..j + 2, ProtectedKind::Escape);
                    j += 2;
                }
                b'{' if style == BodyStyle::FString => {
                    let close = self.matching_brace(j, end);
                    self.builder.protect(j..close, ProtectedKind::Expression);
                    j = close;
                }
                b'$' if style == BodyStyle::Template && next == Some(b'{') => {
                    let close = self.matching_brace(j + 1, end);
                    self.builder.protect(j..close, ProtectedKind::Expression);
                    j = close;
                }
                b'{' | b'%' if matches!(style, BodyStyle::Plain | BodyStyle::Raw) => {
                    match PLACEHOLDER_RE.find(&self.content[j..end]) {
                        Some(m) => {
                            self.builder.protect(j..j + m.end(), ProtectedKind::Expression);
                            j += m.end();
                        }
                        None => j += 1,
                    }
                }
                _ => j += 1,
            }
        }
    }

    /// Position after the brace closing the one at `open`, or `limit`
    fn matching_brace(&self, open: usize, limit: usize) -> usize {
        let mut depth = 0usize;
        let mut j = open;
        while j < limit {
            match self.bytes[j] {
                b'{' => depth += 1,
                b'}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return j + 1;
                    }
                }
                _ => {}
            }
            j += 1;
        }
        limit
    }

    fn escape_len(&self, at: usize, end: usize) -> usize {
        let rest = &self.content[at + 1..end];
        let Some(next) = rest.chars().next() else {
            return 1;
        };
        let tail = &rest[next.len_utf8()..];
        let hex_run = |max: usize| {
            tail.bytes()
                .take(max)
                .take_while(|b| b.is_ascii_hexdigit())
                .count()
        };
        let extra = match next {
            'u' | 'N' if tail.starts_with('{') => tail.find('}').map_or(0, |pos| pos + 1),
            'u' => hex_run(4),
            'U' => hex_run(8),
            'x' => hex_run(2),
            _ => 0,
        };
        1 + next.len_utf8() + extra
    }
}
