//! Entity text stitching.
//!
//! Post bodies arrive as raw (HTML-escaped) text plus a list of spans that
//! point into it by Unicode code-point offset. [`stitch`] walks the spans in
//! order and produces a flat list of literal text and replacement nodes that
//! covers the whole text.

pub mod spans;

use std::borrow::Cow;

/// A range of the raw text to be swapped for a payload.
///
/// `payload: None` deletes the range without putting anything in its place
/// (used for media markers, which are rendered as attachments instead).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<T> {
    pub start: usize,
    pub end: usize,
    pub payload: Option<T>,
}

impl<T> Span<T> {
    pub fn new(start: usize, end: usize, payload: T) -> Self {
        Self {
            start,
            end,
            payload: Some(payload),
        }
    }

    pub fn removed(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            payload: None,
        }
    }
}

/// One piece of stitched output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<T> {
    Text(String),
    Node(T),
}

impl<T> Segment<T> {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text(s) => Some(s),
            Segment::Node(_) => None,
        }
    }
}

/// Merge `text` with `spans` into an ordered list of segments.
///
/// Spans are sorted by start offset (stable, so equal starts keep their input
/// order). A span that starts inside an already consumed range is dropped
/// whole. Literal slices are HTML-entity decoded. Empty literals never appear
/// in the output.
pub fn stitch<T>(text: &str, mut spans: Vec<Span<T>>) -> Vec<Segment<T>> {
    spans.sort_by_key(|s| s.start);

    let points = CodePoints::new(text);
    let mut out = Vec::with_capacity(spans.len() * 2 + 1);
    let mut last = 0;

    for span in spans {
        if span.start < last {
            continue;
        }
        push_text(&mut out, points.slice(last, span.start));
        if let Some(payload) = span.payload {
            out.push(Segment::Node(payload));
        }
        last = span.end.max(span.start);
    }
    push_text(&mut out, points.slice(last, points.len()));

    out
}

/// Concatenate the literal parts of a stitched sequence, rendering nodes with
/// `node`. Handy for plain-text output paths (CLI, tests).
pub fn flatten<T>(segments: &[Segment<T>], mut node: impl FnMut(&T) -> Cow<'_, str>) -> String {
    let mut out = String::new();
    for seg in segments {
        match seg {
            Segment::Text(s) => out.push_str(s),
            Segment::Node(n) => out.push_str(&node(n)),
        }
    }
    out
}

fn push_text<T>(out: &mut Vec<Segment<T>>, raw: &str) {
    if raw.is_empty() {
        return;
    }
    let decoded = html_escape::decode_html_entities(raw);
    if !decoded.is_empty() {
        out.push(Segment::Text(decoded.into_owned()));
    }
}

/// Byte offsets of every code point boundary in a string.
struct CodePoints<'a> {
    text: &'a str,
    bounds: Vec<usize>,
}

impl<'a> CodePoints<'a> {
    fn new(text: &'a str) -> Self {
        let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        bounds.push(text.len());
        Self { text, bounds }
    }

    /// Number of code points.
    fn len(&self) -> usize {
        self.bounds.len() - 1
    }

    /// Slice `[from, to)` in code points, clamped to the text.
    fn slice(&self, from: usize, to: usize) -> &'a str {
        let n = self.len();
        let to = to.min(n);
        let from = from.min(to);
        &self.text[self.bounds[from]..self.bounds[to]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<T>(segments: &[Segment<T>]) -> Vec<&str> {
        segments.iter().filter_map(Segment::as_text).collect()
    }

    #[test]
    fn empty_span_list_yields_whole_decoded_text() {
        let out = stitch::<()>("fish &amp; chips", vec![]);
        assert_eq!(out, vec![Segment::Text("fish & chips".into())]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(stitch::<()>("", vec![]).is_empty());
    }

    #[test]
    fn non_overlapping_spans_partition_the_text() {
        let text = "hi #rust and @ferris ok";
        let spans = vec![
            Span::new(13, 20, "M"),
            Span::new(3, 8, "H"),
        ];
        let out = stitch(text, spans);
        assert_eq!(
            out,
            vec![
                Segment::Text("hi ".into()),
                Segment::Node("H"),
                Segment::Text(" and ".into()),
                Segment::Node("M"),
                Segment::Text(" ok".into()),
            ]
        );

        // Literal text plus the original span text rebuilds the input.
        let rebuilt = flatten(&out, |n| match *n {
            "H" => "#rust".into(),
            _ => "@ferris".into(),
        });
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn overlapping_span_is_dropped_whole() {
        let out = stitch("abcdefghij", vec![Span::new(0, 5, 1), Span::new(3, 8, 2)]);
        assert_eq!(
            out,
            vec![Segment::Node(1), Segment::Text("fghij".into())]
        );
        assert!(!out.contains(&Segment::Node(2)));
    }

    #[test]
    fn equal_starts_keep_input_order() {
        let out = stitch("abcdef", vec![Span::new(2, 4, "first"), Span::new(2, 3, "second")]);
        assert_eq!(
            out,
            vec![
                Segment::Text("ab".into()),
                Segment::Node("first"),
                Segment::Text("ef".into()),
            ]
        );
    }

    #[test]
    fn offsets_count_code_points_not_utf16_units() {
        let out = stitch("😀ab", vec![Span::new(1, 3, "X")]);
        assert_eq!(out, vec![Segment::Text("😀".into()), Segment::Node("X")]);
    }

    #[test]
    fn removed_span_leaves_no_segment() {
        let out = stitch::<&str>(
            "look https://t.co/pic",
            vec![Span::removed(5, 21)],
        );
        assert_eq!(texts(&out), vec!["look "]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn offsets_past_the_end_are_clamped() {
        let out = stitch("short", vec![Span::new(3, 40, "N")]);
        assert_eq!(out, vec![Segment::Text("sho".into()), Segment::Node("N")]);
    }

    #[test]
    fn escapes_are_decoded_per_slice() {
        let out = stitch("&lt;a&gt; x", vec![Span::new(10, 11, "X")]);
        assert_eq!(out, vec![Segment::Text("<a> ".into()), Segment::Node("X")]);
    }
}
