/*!
 * Format classification of documents into protected and translatable spans.
 *
 * Every supported file type maps to one `FormatProfile` variant through a
 * static extension table. A profile knows which byte ranges of a document
 * must survive translation untouched (code, link targets, markup) and which
 * ranges are prose. The spans returned by [`classify`] always partition the
 * document: concatenating them in order yields the original bytes.
 */

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;

use crate::app_config::{CodeMode, FormatsConfig, UnknownFormatPolicy};
use crate::errors::FormatError;

mod html;
mod markdown;
mod rst;
mod source_code;

/// Kind of a protected span.
///
/// Block kinds separate chunks from each other. Inline kinds may sit inside a
/// chunk, where they are replaced by placeholders before the backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtectedKind {
    /// YAML or TOML front matter at the top of a Markdown file
    FrontMatter,
    /// Fenced code block including its fences
    CodeFence,
    /// Raw HTML block in Markdown
    HtmlBlock,
    /// Markdown link reference definition
    LinkDefinition,
    /// MDX `import`/`export` statements
    MdxEsm,
    /// reStructuredText literal block or doctest block
    LiteralBlock,
    /// reStructuredText directive line with its options
    Directive,
    /// Body of a code-like directive
    DirectiveBody,
    /// reStructuredText comment, target or substitution definition
    ExplicitMarkup,
    /// Section title over/underline
    SectionAdornment,
    /// Executable source code
    CodeSyntax,
    /// `script`, `style`, `pre` or `textarea` element
    RawTextElement,
    /// Block-level HTML tag
    BlockTag,
    /// Whole file passed through untouched
    Opaque,
    /// Inline code span or literal
    InlineCode,
    /// Markdown heading hashes, list bullets and blockquote markers at a line start
    LineMarker,
    /// Opening bracket of a link or image
    LinkDelimiter,
    /// Link destination including its delimiters
    LinkTarget,
    /// Bare URL or autolink
    Url,
    /// Inline HTML tag or comment
    InlineHtml,
    /// Interpolated expression (MDX, f-strings, template literals)
    Expression,
    /// reStructuredText field list marker such as `:param x:`
    FieldMarker,
    /// reStructuredText interpreted text role
    Role,
    /// reStructuredText reference, substitution or footnote reference
    Reference,
    /// Comment marker such as `#`, `//` or a leading `*`
    CommentMarker,
    /// String prefix and quotes
    StringDelimiter,
    /// Escape sequence inside a string literal
    Escape,
    /// Whitespace between code and comments
    Whitespace,
    /// HTML character reference
    Entity,
}

impl ProtectedKind {
    /// Whether the span may be embedded in a chunk as a placeholder
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Self::InlineCode
                | Self::LineMarker
                | Self::LinkDelimiter
                | Self::LinkTarget
                | Self::Url
                | Self::InlineHtml
                | Self::Expression
                | Self::FieldMarker
                | Self::Role
                | Self::Reference
                | Self::CommentMarker
                | Self::StringDelimiter
                | Self::Escape
                | Self::Whitespace
                | Self::Entity
        )
    }
}

/// Whether a span is handed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Translatable,
    Protected(ProtectedKind),
}

/// Contiguous byte range of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub range: Range<usize>,
    pub kind: SpanKind,
}

impl Span {
    /// Text of the span within its document
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.clone()]
    }

    pub fn is_translatable(&self) -> bool {
        matches!(self.kind, SpanKind::Translatable)
    }

    /// Protected span that separates chunks
    pub fn is_block_protected(&self) -> bool {
        matches!(self.kind, SpanKind::Protected(kind) if !kind.is_inline())
    }

    /// Protected span that may be masked inside a chunk
    pub fn is_inline_protected(&self) -> bool {
        matches!(self.kind, SpanKind::Protected(kind) if kind.is_inline())
    }
}

/// Formats listed in the extension lookup table
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    Markdown,
    Mdx,
    #[serde(rename = "rst")]
    ReStructuredText,
    Html,
    Python,
    #[serde(rename = "c_like")]
    CLike,
    #[serde(rename = "javascript")]
    JavaScript,
    PlainText,
}

impl FormatKind {
    /// Profile of this format for the given code mode
    pub fn profile(self, code_mode: CodeMode) -> FormatProfile {
        match self {
            Self::Markdown => FormatProfile::Markdown { mdx: false },
            Self::Mdx => FormatProfile::Markdown { mdx: true },
            Self::ReStructuredText => FormatProfile::ReStructuredText,
            Self::Html => FormatProfile::Html,
            Self::Python => FormatProfile::SourceCode {
                syntax: CodeSyntax::Python,
                mode: code_mode,
            },
            Self::CLike => FormatProfile::SourceCode {
                syntax: CodeSyntax::CLike,
                mode: code_mode,
            },
            Self::JavaScript => FormatProfile::SourceCode {
                syntax: CodeSyntax::JavaScript,
                mode: code_mode,
            },
            Self::PlainText => FormatProfile::PlainText,
        }
    }
}

/// Lexical family of a source-code file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSyntax {
    /// `#` comments, quoted and triple-quoted strings
    Python,
    /// `//` and `/* */` comments, double-quoted strings, char literals
    CLike,
    /// C-like comments, single/double-quoted strings and template literals
    JavaScript,
}

/// Structural profile of a document, chosen once and never mutated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatProfile {
    Markdown { mdx: bool },
    ReStructuredText,
    Html,
    SourceCode { syntax: CodeSyntax, mode: CodeMode },
    PlainText,
    /// Whole file protected
    Opaque,
}

impl FormatProfile {
    /// Short name used in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::Markdown { mdx: false } => "markdown",
            Self::Markdown { mdx: true } => "mdx",
            Self::ReStructuredText => "rst",
            Self::Html => "html",
            Self::SourceCode { syntax: CodeSyntax::Python, .. } => "python",
            Self::SourceCode { syntax: CodeSyntax::CLike, .. } => "c-like",
            Self::SourceCode { syntax: CodeSyntax::JavaScript, .. } => "javascript",
            Self::PlainText => "text",
            Self::Opaque => "opaque",
        }
    }
}

/// Extension lookup table. Adding a format means adding a row and a variant.
static EXTENSION_TABLE: &[(&str, FormatKind)] = &[
    ("md", FormatKind::Markdown),
    ("markdown", FormatKind::Markdown),
    ("mdx", FormatKind::Mdx),
    ("rst", FormatKind::ReStructuredText),
    ("rstx", FormatKind::ReStructuredText),
    ("html", FormatKind::Html),
    ("htm", FormatKind::Html),
    ("xhtml", FormatKind::Html),
    ("py", FormatKind::Python),
    ("pyi", FormatKind::Python),
    ("rs", FormatKind::CLike),
    ("go", FormatKind::CLike),
    ("java", FormatKind::CLike),
    ("c", FormatKind::CLike),
    ("h", FormatKind::CLike),
    ("cc", FormatKind::CLike),
    ("cpp", FormatKind::CLike),
    ("hpp", FormatKind::CLike),
    ("cs", FormatKind::CLike),
    ("swift", FormatKind::CLike),
    ("kt", FormatKind::CLike),
    ("scala", FormatKind::CLike),
    ("js", FormatKind::JavaScript),
    ("mjs", FormatKind::JavaScript),
    ("cjs", FormatKind::JavaScript),
    ("jsx", FormatKind::JavaScript),
    ("ts", FormatKind::JavaScript),
    ("tsx", FormatKind::JavaScript),
    ("txt", FormatKind::PlainText),
];

/// Resolves the profile of a file from its extension and the configured overrides
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    config: FormatsConfig,
}

impl FormatRegistry {
    pub fn new(config: FormatsConfig) -> Self {
        Self { config }
    }

    /// Lowercased extension of a path, empty when it has none
    pub fn extension_of(path: &Path) -> String {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// Built-in format for an extension
    pub fn lookup(extension: &str) -> Option<FormatKind> {
        let extension = extension.trim_start_matches('.').to_lowercase();
        EXTENSION_TABLE
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, kind)| *kind)
    }

    /// Profile for a file, failing with `UnsupportedFormat` for unknown extensions
    pub fn resolve(&self, path: &Path, content: &str) -> Result<FormatProfile, FormatError> {
        let extension = Self::extension_of(path);
        let overrides = self.config.overrides.get(&extension);

        if overrides.is_some_and(|o| o.whole_file_protected) {
            return Ok(FormatProfile::Opaque);
        }

        let code_mode = overrides
            .and_then(|o| o.code_mode)
            .unwrap_or(self.config.code_mode);

        let kind = overrides
            .and_then(|o| o.format)
            .or_else(|| Self::lookup(&extension))
            .or_else(|| Self::sniff(&extension, content));

        match kind {
            Some(kind) => Ok(kind.profile(code_mode)),
            None => Err(FormatError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }

    /// Profile for a file with the configured fallback for unknown formats applied
    pub fn profile_for(&self, path: &Path, content: &str) -> Result<FormatProfile, FormatError> {
        match self.resolve(path, content) {
            Err(error) if self.config.unknown_format == UnknownFormatPolicy::Protect => {
                log::debug!("{}; passing the file through untouched", error);
                Ok(FormatProfile::Opaque)
            }
            other => other,
        }
    }

    /// Whether a path has a translatable profile without looking at its content
    pub fn is_supported(&self, path: &Path) -> bool {
        let extension = Self::extension_of(path);
        self.config.overrides.contains_key(&extension) || Self::lookup(&extension).is_some()
    }

    // Extensionless scripts are recognised by their shebang
    fn sniff(extension: &str, content: &str) -> Option<FormatKind> {
        if !extension.is_empty() {
            return None;
        }
        let first_line = content.lines().next()?;
        if first_line.starts_with("#!") && first_line.contains("python") {
            Some(FormatKind::Python)
        } else {
            None
        }
    }
}

/// Split a document into an ordered partition of spans
pub fn classify(content: &str, profile: &FormatProfile) -> Vec<Span> {
    if content.is_empty() {
        return Vec::new();
    }
    match profile {
        FormatProfile::Markdown { mdx } => markdown::classify(content, *mdx),
        FormatProfile::ReStructuredText => rst::classify(content),
        FormatProfile::Html => html::classify(content),
        FormatProfile::SourceCode { syntax, mode } => source_code::classify(content, *syntax, *mode),
        FormatProfile::PlainText => vec![Span {
            range: 0..content.len(),
            kind: SpanKind::Translatable,
        }],
        FormatProfile::Opaque => vec![Span {
            range: 0..content.len(),
            kind: SpanKind::Protected(ProtectedKind::Opaque),
        }],
    }
}

/// Accumulates protected ranges in document order and fills the gaps with
/// translatable spans, so the result is a partition by construction.
#[derive(Debug, Default)]
pub(crate) struct SpanBuilder {
    spans: Vec<Span>,
    cursor: usize,
}

impl SpanBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current end of the covered prefix
    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    /// Mark a range as protected. Ranges behind the cursor are clamped.
    pub(crate) fn protect(&mut self, range: Range<usize>, kind: ProtectedKind) {
        if range.end <= self.cursor {
            return;
        }
        let start = range.start.max(self.cursor);
        if start > self.cursor {
            self.push_translatable(self.cursor..start);
        }
        self.spans.push(Span {
            range: start..range.end,
            kind: SpanKind::Protected(kind),
        });
        self.cursor = range.end;
    }

    /// Close the partition at `len`
    pub(crate) fn finish(mut self, len: usize) -> Vec<Span> {
        if self.cursor < len {
            self.push_translatable(self.cursor..len);
        }
        self.spans
    }

    fn push_translatable(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        if let Some(last) = self.spans.last_mut() {
            if last.is_translatable() && last.range.end == range.start {
                last.range.end = range.end;
                self.cursor = range.end;
                return;
            }
        }
        self.cursor = range.end;
        self.spans.push(Span {
            range,
            kind: SpanKind::Translatable,
        });
    }
}

/// Protect `blocks` and run `inline` over every gap between them.
///
/// `blocks` must be sorted and non-overlapping. The inline scanner receives the
/// gap text and its absolute offset.
pub(crate) fn fill_gaps<F>(
    content: &str,
    blocks: &[(Range<usize>, ProtectedKind)],
    builder: &mut SpanBuilder,
    mut inline: F,
) where
    F: FnMut(&str, usize, &mut SpanBuilder),
{
    for (range, kind) in blocks {
        let gap_start = builder.cursor();
        if range.start > gap_start {
            inline(&content[gap_start..range.start], gap_start, builder);
        }
        builder.protect(range.clone(), *kind);
    }
    let gap_start = builder.cursor();
    if gap_start < content.len() {
        inline(&content[gap_start..], gap_start, builder);
    }
}

/// Lines of `text` with their byte offsets, terminators included
pub(crate) fn lines_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n')
        .map(|line| {
            let start = offset;
            offset += line.len();
            (start, line)
        })
        .collect()
}

/// Line without its terminator
pub(crate) fn line_body(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Number of leading space and tab bytes
pub(crate) fn indent_width(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b' ' || *b == b'\t').count()
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}
