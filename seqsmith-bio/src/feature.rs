//! Feature annotations and the coordinate transforms applied to them when
//! sequences are shifted, reverse-complemented, or mapped between DNA and
//! protein space.

use serde::{Deserialize, Serialize};

/// A contiguous span, 0-based half-open. Strand is +1 / -1 / 0 (unstranded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub strand: i8,
}

impl Span {
    pub fn new(start: usize, end: usize, strand: i8) -> Self {
        Self { start, end, strand }
    }
}

/// A feature location: one span, or several disjoint spans (e.g. exons)
/// combined by an operator ("join" or "order").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    Simple(Span),
    Compound { parts: Vec<Span>, operator: String },
}

impl Location {
    pub fn simple(start: usize, end: usize, strand: i8) -> Self {
        Location::Simple(Span::new(start, end, strand))
    }

    pub fn join(parts: Vec<Span>) -> Self {
        Location::Compound {
            parts,
            operator: "join".to_string(),
        }
    }

    /// Leftmost coordinate across all parts
    pub fn start(&self) -> usize {
        match self {
            Location::Simple(span) => span.start,
            Location::Compound { parts, .. } => {
                parts.iter().map(|p| p.start).min().unwrap_or(0)
            }
        }
    }

    /// Rightmost coordinate across all parts
    pub fn end(&self) -> usize {
        match self {
            Location::Simple(span) => span.end,
            Location::Compound { parts, .. } => parts.iter().map(|p| p.end).max().unwrap_or(0),
        }
    }

    pub fn strand(&self) -> i8 {
        match self {
            Location::Simple(span) => span.strand,
            Location::Compound { parts, .. } => parts.first().map(|p| p.strand).unwrap_or(0),
        }
    }

    /// Apply `f` to every span, preserving the compound structure
    fn map_spans(&self, f: impl Fn(&Span) -> Span) -> Location {
        match self {
            Location::Simple(span) => Location::Simple(f(span)),
            Location::Compound { parts, operator } => Location::Compound {
                parts: parts.iter().map(f).collect(),
                operator: operator.clone(),
            },
        }
    }
}

/// A typed annotation attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub kind: String,
    pub location: Location,
    #[serde(default)]
    pub qualifiers: Vec<(String, String)>,
}

impl Feature {
    pub fn new(kind: impl Into<String>, location: Location) -> Self {
        Self {
            kind: kind.into(),
            location,
            qualifiers: Vec::new(),
        }
    }

    /// Identity used for duplicate suppression when merging feature sets
    pub fn dedup_key(&self) -> String {
        format!("{}-{}-{}", self.location.start(), self.location.end(), self.kind)
    }
}

fn clamp(value: isize, seq_len: usize) -> usize {
    value.clamp(0, seq_len as isize) as usize
}

/// Shift a location by `shift` residues, clamping each endpoint into
/// `[0, seq_len]`. Compound locations shift part by part.
pub fn shift_location(location: &Location, shift: isize, seq_len: usize) -> Location {
    location.map_spans(|span| {
        Span::new(
            clamp(span.start as isize + shift, seq_len),
            clamp(span.end as isize + shift, seq_len),
            span.strand,
        )
    })
}

/// Remap a location through reverse complementation of a sequence of length
/// `seq_len`: each span is reflected about the sequence end and its strand
/// flipped. Applying this twice returns the original location.
pub fn reverse_complement_location(location: &Location, seq_len: usize) -> Location {
    location.map_spans(|span| {
        let new_start = clamp(seq_len as isize - span.end as isize, seq_len);
        let new_end = clamp(seq_len as isize - span.start as isize, seq_len);
        Span::new(new_start, new_end, -span.strand)
    })
}

/// Map nucleotide coordinates onto the translated protein (divide by 3,
/// flooring). A 3n-length region maps to n residues.
pub fn nucleotide_to_protein(location: &Location) -> Location {
    location.map_spans(|span| Span::new(span.start / 3, span.end / 3, span.strand))
}

/// Map protein coordinates back onto the encoding nucleotides (multiply
/// by 3).
pub fn protein_to_nucleotide(location: &Location) -> Location {
    location.map_spans(|span| Span::new(span.start * 3, span.end * 3, span.strand))
}

/// Clip a location into the window `[start, end)`, re-basing coordinates to
/// the window start. Returns None when the location lies entirely outside.
pub fn clip_location(location: &Location, start: usize, end: usize) -> Option<Location> {
    if location.end() < start || location.start() > end {
        return None;
    }
    let width = end - start;
    Some(location.map_spans(|span| {
        let s = span.start.saturating_sub(start).min(width);
        let e = span.end.saturating_sub(start).min(width);
        Span::new(s, e, span.strand)
    }))
}
