/*!
 * Reassembly of translated chunks into a document.
 *
 * Pass-through segments emit their original bytes; chunks emit their
 * translation when it succeeded and their original text otherwise. Any
 * disagreement between spans, segments and results aborts the file.
 */

use log::error;
use std::ops::Range;

use crate::errors::ReassemblyError;
use crate::translation::format::Span;
use crate::translation::orchestrator::TranslationResult;
use crate::translation::segmenter::{Segment, chunks};

/// Rebuilt document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassembled {
    pub text: String,
    /// Some chunk fell back to its original text
    pub partial: bool,
    /// Chunks emitted untranslated because they failed
    pub fallback_chunks: usize,
    /// Chunks emitted with a fresh or cached translation
    pub translated_chunks: usize,
}

/// Rebuild a document from its segments and the per-chunk results
///
/// `results` must hold exactly one entry per chunk, in sequence order.
pub fn reassemble(
    source: &str,
    spans: &[Span],
    segments: &[Segment],
    results: &[TranslationResult],
) -> Result<Reassembled, ReassemblyError> {
    check_coverage(source, spans, segments).inspect_err(|e| error!("{}", e))?;
    check_results(source, segments, results).inspect_err(|e| error!("{}", e))?;

    let mut text = String::with_capacity(source.len());
    let mut results = results.iter();
    let mut fallback_chunks = 0;
    let mut translated_chunks = 0;

    for segment in segments {
        match segment {
            Segment::PassThrough { range } => text.push_str(&source[range.clone()]),
            Segment::Chunk(_) => {
                // Counts were checked above
                let Some(result) = results.next() else { break };
                if result.success {
                    text.push_str(&result.translated);
                    if !result.skipped {
                        translated_chunks += 1;
                    }
                } else {
                    text.push_str(&result.original);
                    fallback_chunks += 1;
                }
            }
        }
    }

    Ok(Reassembled {
        text,
        partial: fallback_chunks > 0,
        fallback_chunks,
        translated_chunks,
    })
}

/// Segments must tile the document and agree with the span partition
fn check_coverage(source: &str, spans: &[Span], segments: &[Segment]) -> Result<(), ReassemblyError> {
    let mut offset = 0;
    for segment in segments {
        let range = segment.range();
        if range.start != offset || range.end < range.start || range.end > source.len() {
            return Err(ReassemblyError::Coverage {
                offset,
                detail: format!("segment {:?} does not continue the document", range),
            });
        }
        offset = range.end;
    }
    if offset != source.len() {
        return Err(ReassemblyError::Coverage {
            offset,
            detail: format!("segments stop before the end of the document ({} bytes)", source.len()),
        });
    }

    // Spans and segments are both sorted by offset
    for segment in segments {
        let range = segment.range();
        for boundary in [range.start, range.end] {
            if let Some(span) = protected_span_around(spans, boundary) {
                return Err(ReassemblyError::Coverage {
                    offset: boundary,
                    detail: format!("segment boundary splits protected span {:?}", span),
                });
            }
        }
        if let Segment::PassThrough { range } = segment {
            let index = spans.partition_point(|span| span.range.start < range.start);
            if spans.get(index).is_none_or(|span| span.range != *range) {
                return Err(ReassemblyError::Coverage {
                    offset: range.start,
                    detail: format!("pass-through {:?} is not a span", range),
                });
            }
        }
    }

    let mut passed_through = segments
        .iter()
        .filter_map(|segment| match segment {
            Segment::PassThrough { range } => Some(range),
            Segment::Chunk(_) => None,
        })
        .peekable();
    for span in spans.iter().filter(|span| span.is_block_protected()) {
        while passed_through.next_if(|range| range.start < span.range.start).is_some() {}
        if !passed_through.peek().is_some_and(|range| **range == span.range) {
            return Err(ReassemblyError::Coverage {
                offset: span.range.start,
                detail: format!("block protected span {:?} was chunked", span.range),
            });
        }
    }

    Ok(())
}

/// Results must match chunks one to one by sequence index
fn check_results(source: &str, segments: &[Segment], results: &[TranslationResult]) -> Result<(), ReassemblyError> {
    let expected = chunks(segments).count();
    if expected != results.len() {
        return Err(ReassemblyError::ResultCount {
            expected,
            found: results.len(),
        });
    }

    for (chunk, result) in chunks(segments).zip(results) {
        if chunk.seq != result.seq {
            return Err(ReassemblyError::ResultOrder {
                expected: chunk.seq,
                found: result.seq,
            });
        }
        if chunk.original(source) != result.original {
            return Err(ReassemblyError::Coverage {
                offset: chunk.range.start,
                detail: format!("result {} carries text of another chunk", result.seq),
            });
        }
    }
    Ok(())
}

fn protected_span_around(spans: &[Span], offset: usize) -> Option<Range<usize>> {
    let index = spans.partition_point(|span| span.range.end <= offset);
    spans
        .get(index)
        .filter(|span| !span.is_translatable() && span.range.start < offset && offset < span.range.end)
        .map(|span| span.range.clone())
}
