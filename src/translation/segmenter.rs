/*!
 * Segmentation of classified documents into token-bounded chunks.
 *
 * Runs of translatable spans (with the inline protected spans between them)
 * are cut into sentence units and greedily packed into chunks that fit the
 * token budget. Block protected spans pass through untouched.
 */

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Debug;
use std::ops::Range;
use std::sync::Arc;

use crate::app_config::{EngineConfig, HardSplitPolicy};
use crate::errors::BackendError;
use crate::translation::format::Span;

/// Sentence ends (followed by whitespace) and line breaks
static UNIT_BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[.!?。！？؟]+["'”’)\]]*[ \t]+|[.!?]+["'”’)\]]*$|[。！？]|\n"#).unwrap()
});

static PLACEHOLDER_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"⟦(\d+)⟧").unwrap());

/// Estimates how many backend tokens a piece of text costs
pub trait TokenEstimator: Send + Sync + Debug {
    fn estimate(&self, text: &str) -> usize;
}

/// Counts one token per `chars_per_token` characters, rounding up
#[derive(Debug, Clone)]
pub struct CharRatioEstimator {
    chars_per_token: usize,
}

impl CharRatioEstimator {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

/// Piece of a chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkPart {
    /// Translatable text
    Text(Range<usize>),
    /// Inline protected span replaced by a placeholder
    Masked { span_index: usize, range: Range<usize> },
}

/// Ordered group of translatable text handed to the backend in one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position among the chunks of the document
    pub seq: usize,
    /// Byte range covered in the document
    pub range: Range<usize>,
    pub parts: Vec<ChunkPart>,
    /// Set when no boundary could keep the chunk within budget
    pub overflow: bool,
}

/// Chunk text with inline protected spans replaced by `⟦n⟧` tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedChunk {
    /// Text sent to the backend, without surrounding whitespace
    pub text: String,
    pub leading: String,
    pub trailing: String,
    /// Original bytes behind each placeholder, indexed by token number
    pub placeholders: Vec<String>,
}

impl MaskedChunk {
    /// Token standing for placeholder `index`
    pub fn token(index: usize) -> String {
        format!("⟦{}⟧", index)
    }

    /// Put the protected bytes back into a translated text.
    ///
    /// Every placeholder must appear exactly once; anything else means the
    /// backend mangled the markup and the answer is rejected.
    pub fn restore(&self, translated: &str) -> Result<String, BackendError> {
        let translated = translated.trim();
        let mut seen = vec![0usize; self.placeholders.len()];

        for caps in PLACEHOLDER_TOKEN_RE.captures_iter(translated) {
            let index: usize = caps[1]
                .parse()
                .map_err(|_| BackendError::InvalidResponse(format!("Bad placeholder {}", &caps[0])))?;
            match seen.get_mut(index) {
                Some(count) => *count += 1,
                None => {
                    return Err(BackendError::InvalidResponse(format!(
                        "Unknown placeholder {}",
                        &caps[0]
                    )));
                }
            }
        }
        if let Some((index, count)) = seen.iter().enumerate().find(|(_, count)| **count != 1) {
            return Err(BackendError::InvalidResponse(format!(
                "Placeholder {} appears {} times",
                Self::token(index),
                count
            )));
        }

        let restored = PLACEHOLDER_TOKEN_RE.replace_all(translated, |caps: &regex::Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| self.placeholders.get(index))
                .cloned()
                .unwrap_or_default()
        });

        Ok(format!("{}{}{}", self.leading, restored, self.trailing))
    }
}

impl Chunk {
    /// Original bytes of the chunk
    pub fn original<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.clone()]
    }

    /// Concatenation of the translatable parts
    pub fn translatable_text(&self, source: &str) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ChunkPart::Text(range) => Some(&source[range.clone()]),
                ChunkPart::Masked { .. } => None,
            })
            .collect()
    }

    /// Whether any translatable part contains a letter
    pub fn has_translatable_content(&self, source: &str) -> bool {
        self.parts.iter().any(|part| match part {
            ChunkPart::Text(range) => source[range.clone()].chars().any(char::is_alphabetic),
            ChunkPart::Masked { .. } => false,
        })
    }

    /// Replace inline protected spans by placeholders. Adjacent masked parts share one token.
    pub fn mask(&self, source: &str) -> MaskedChunk {
        let mut body = String::new();
        let mut placeholders: Vec<String> = Vec::new();
        let mut previous_masked = false;

        for part in &self.parts {
            match part {
                ChunkPart::Text(range) => {
                    body.push_str(&source[range.clone()]);
                    previous_masked = false;
                }
                ChunkPart::Masked { range, .. } => {
                    let original = &source[range.clone()];
                    match placeholders.last_mut() {
                        Some(last) if previous_masked => last.push_str(original),
                        _ => {
                            body.push_str(&MaskedChunk::token(placeholders.len()));
                            placeholders.push(original.to_string());
                        }
                    }
                    previous_masked = true;
                }
            }
        }

        let trimmed_start = body.trim_start();
        let leading = body[..body.len() - trimmed_start.len()].to_string();
        let text = trimmed_start.trim_end();
        let trailing = trimmed_start[text.len()..].to_string();

        MaskedChunk {
            text: text.to_string(),
            leading,
            trailing,
            placeholders,
        }
    }
}

/// Unit of the segmentation output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Protected bytes copied verbatim
    PassThrough { range: Range<usize> },
    Chunk(Chunk),
}

impl Segment {
    pub fn range(&self) -> &Range<usize> {
        match self {
            Self::PassThrough { range } => range,
            Self::Chunk(chunk) => &chunk.range,
        }
    }
}

/// Chunks of a segment list, in sequence order
pub fn chunks(segments: &[Segment]) -> impl Iterator<Item = &Chunk> {
    segments.iter().filter_map(|segment| match segment {
        Segment::Chunk(chunk) => Some(chunk),
        Segment::PassThrough { .. } => None,
    })
}

/// Splits classified documents into chunks
#[derive(Debug, Clone)]
pub struct Segmenter {
    max_tokens: usize,
    estimator: Arc<dyn TokenEstimator>,
    hard_split: HardSplitPolicy,
}

impl Segmenter {
    pub fn new(max_tokens: usize, estimator: Arc<dyn TokenEstimator>, hard_split: HardSplitPolicy) -> Self {
        Self {
            max_tokens: max_tokens.max(1),
            estimator,
            hard_split,
        }
    }

    /// Segmenter with the character ratio estimator of the engine settings
    pub fn from_config(engine: &EngineConfig) -> Self {
        Self::new(
            engine.max_chunk_tokens,
            Arc::new(CharRatioEstimator::new(engine.chars_per_token)),
            engine.hard_split,
        )
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Segment a document given its span partition
    pub fn segment(&self, source: &str, spans: &[Span]) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut seq = 0;
        let mut i = 0;

        while i < spans.len() {
            if spans[i].is_block_protected() {
                segments.push(Segment::PassThrough {
                    range: spans[i].range.clone(),
                });
                i += 1;
                continue;
            }

            let run_start = i;
            while i < spans.len() && !spans[i].is_block_protected() {
                i += 1;
            }
            self.segment_run(source, spans, run_start..i, &mut seq, &mut segments);
        }

        segments
    }

    fn segment_run(
        &self,
        source: &str,
        spans: &[Span],
        run: Range<usize>,
        seq: &mut usize,
        segments: &mut Vec<Segment>,
    ) {
        // Inline spans at the edges of a run have nothing to attach to
        let first = (run.start..run.end).find(|&k| spans[k].is_translatable());
        let last = (run.start..run.end).rev().find(|&k| spans[k].is_translatable());
        let (Some(first), Some(last)) = (first, last) else {
            segments.extend(run.map(|k| Segment::PassThrough {
                range: spans[k].range.clone(),
            }));
            return;
        };

        segments.extend((run.start..first).map(|k| Segment::PassThrough {
            range: spans[k].range.clone(),
        }));

        let core = first..last + 1;
        let units = self.units(source, &spans[core.clone()]);
        let mut current: Option<Range<usize>> = None;
        let mut current_tokens = 0;

        for unit in units {
            let tokens = self.estimator.estimate(&source[unit.clone()]);
            if tokens > self.max_tokens {
                if let Some(range) = current.take() {
                    segments.push(self.chunk(spans, core.clone(), range, seq, false));
                }
                for (piece, overflow) in self.hard_split(source, &spans[core.clone()], unit) {
                    segments.push(self.chunk(spans, core.clone(), piece, seq, overflow));
                }
                current_tokens = 0;
                continue;
            }

            match current.as_mut() {
                Some(range) if current_tokens + tokens <= self.max_tokens => {
                    range.end = unit.end;
                    current_tokens += tokens;
                }
                _ => {
                    if let Some(range) = current.take() {
                        segments.push(self.chunk(spans, core.clone(), range, seq, false));
                    }
                    current = Some(unit);
                    current_tokens = tokens;
                }
            }
        }
        if let Some(range) = current {
            segments.push(self.chunk(spans, core.clone(), range, seq, false));
        }

        segments.extend((last + 1..run.end).map(|k| Segment::PassThrough {
            range: spans[k].range.clone(),
        }));
    }

    /// Cut a run into units at sentence and line boundaries inside translatable spans
    fn units(&self, source: &str, run: &[Span]) -> Vec<Range<usize>> {
        let start = run[0].range.start;
        let end = run[run.len() - 1].range.end;
        let mut cuts = Vec::new();

        for span in run.iter().filter(|span| span.is_translatable()) {
            let text = span.text(source);
            for m in UNIT_BOUNDARY_RE.find_iter(text) {
                let cut = span.range.start + m.end();
                if cut > start && cut < end {
                    cuts.push(cut);
                }
            }
        }
        cuts.sort_unstable();
        cuts.dedup();

        let mut units = Vec::with_capacity(cuts.len() + 1);
        let mut from = start;
        for cut in cuts {
            units.push(from..cut);
            from = cut;
        }
        units.push(from..end);
        units
    }

    /// Split an oversized unit into pieces within budget where possible
    fn hard_split(&self, source: &str, run: &[Span], unit: Range<usize>) -> Vec<(Range<usize>, bool)> {
        let whitespace_cuts = self.cut_candidates(source, run, &unit, true);
        let char_cuts = self.cut_candidates(source, run, &unit, false);
        let mut pieces = Vec::new();
        let mut from = unit.start;

        while from < unit.end {
            if self.estimator.estimate(&source[from..unit.end]) <= self.max_tokens {
                pieces.push((from..unit.end, false));
                break;
            }

            let fits = |candidates: &[usize]| -> Option<usize> {
                let after: Vec<usize> = candidates.iter().copied().filter(|c| *c > from).collect();
                let count = after.partition_point(|c| self.estimator.estimate(&source[from..*c]) <= self.max_tokens);
                if count > 0 { Some(after[count - 1]) } else { None }
            };

            let cut = match self.hard_split {
                HardSplitPolicy::Whitespace => fits(whitespace_cuts.as_slice())
                    .or_else(|| fits(char_cuts.as_slice())),
                HardSplitPolicy::CharBoundary => fits(char_cuts.as_slice()),
            };

            match cut {
                Some(cut) => {
                    pieces.push((from..cut, false));
                    from = cut;
                }
                None => {
                    // Nothing fits: take the smallest step forward and flag it
                    let cut = char_cuts
                        .iter()
                        .copied()
                        .find(|c| *c > from)
                        .unwrap_or(unit.end);
                    warn!(
                        "ChunkOverflow: {} bytes at offset {} exceed the budget of {} tokens",
                        cut - from,
                        from,
                        self.max_tokens
                    );
                    pieces.push((from..cut, true));
                    from = cut;
                }
            }
        }

        if pieces.len() > 1 {
            warn!(
                "ChunkOverflow: sentence of {} bytes at offset {} hard-split into {} pieces",
                unit.len(),
                unit.start,
                pieces.len()
            );
        }
        pieces
    }

    /// Offsets inside `unit` where a hard split may fall, in ascending order.
    /// Cuts never land inside an inline protected span.
    fn cut_candidates(&self, source: &str, run: &[Span], unit: &Range<usize>, whitespace_only: bool) -> Vec<usize> {
        let mut cuts = Vec::new();
        for span in run {
            let range = span.range.start.max(unit.start)..span.range.end.min(unit.end);
            if range.is_empty() {
                continue;
            }
            if !span.is_translatable() {
                if !whitespace_only {
                    cuts.extend(
                        [range.start, range.end]
                            .into_iter()
                            .filter(|at| *at > unit.start && *at < unit.end),
                    );
                }
                continue;
            }
            let text = &source[range.clone()];
            let mut previous_whitespace = false;
            for (offset, c) in text.char_indices() {
                let at = range.start + offset;
                let allowed = if whitespace_only { previous_whitespace } else { true };
                if allowed && at > unit.start {
                    cuts.push(at);
                }
                previous_whitespace = c.is_whitespace();
            }
        }
        cuts.sort_unstable();
        cuts.dedup();
        cuts
    }

    fn chunk(&self, spans: &[Span], core: Range<usize>, range: Range<usize>, seq: &mut usize, overflow: bool) -> Segment {
        let mut parts = Vec::new();
        for index in core {
            let span = &spans[index];
            let start = span.range.start.max(range.start);
            let end = span.range.end.min(range.end);
            if start >= end {
                continue;
            }
            if span.is_translatable() {
                match parts.last_mut() {
                    Some(ChunkPart::Text(last)) if last.end == start => last.end = end,
                    _ => parts.push(ChunkPart::Text(start..end)),
                }
            } else {
                parts.push(ChunkPart::Masked {
                    span_index: index,
                    range: start..end,
                });
            }
        }

        let chunk = Chunk {
            seq: *seq,
            range,
            parts,
            overflow,
        };
        *seq += 1;
        Segment::Chunk(chunk)
    }
}
