//! GenBank flat-file reader and writer.
//!
//! Covers the subset this toolkit needs: LOCUS/DEFINITION/ACCESSION/VERSION
//! headers, the FEATURES table with join()/order()/complement() locations
//! and quoted qualifiers, and the ORIGIN sequence block.

use crate::alphabet::Alphabet;
use crate::feature::{Feature, Location, Span};
use crate::record::SeqRecord;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::io::Write;

pub fn parse(data: &[u8]) -> SeqsmithResult<Vec<SeqRecord>> {
    let text = std::str::from_utf8(data)
        .map_err(|_| SeqsmithError::Parse("GenBank input is not valid UTF-8".to_string()))?;

    let mut records = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim_end() == "//" {
            if !block.is_empty() {
                records.push(parse_record(&block)?);
                block.clear();
            }
        } else {
            block.push(line);
        }
    }
    // A trailing block without the // terminator still parses
    if block.iter().any(|l| l.starts_with("LOCUS")) {
        records.push(parse_record(&block)?);
    }

    if records.is_empty() {
        return Err(SeqsmithError::Parse(
            "no GenBank records found".to_string(),
        ));
    }
    Ok(records)
}

fn parse_record(lines: &[&str]) -> SeqsmithResult<SeqRecord> {
    let mut name = String::new();
    let mut accession = None;
    let mut version = None;
    let mut definition = String::new();
    let mut features = Vec::new();
    let mut seq = Vec::new();

    let mut i = 0;
    let mut saw_locus = false;
    while i < lines.len() {
        let line = lines[i];

        if let Some(rest) = line.strip_prefix("LOCUS") {
            saw_locus = true;
            name = rest
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
        } else if let Some(rest) = line.strip_prefix("DEFINITION") {
            definition = rest.trim().to_string();
            // Wrapped continuation lines are indented
            while i + 1 < lines.len() && lines[i + 1].starts_with("            ") {
                i += 1;
                definition.push(' ');
                definition.push_str(lines[i].trim());
            }
        } else if let Some(rest) = line.strip_prefix("ACCESSION") {
            accession = rest.split_whitespace().next().map(str::to_string);
        } else if let Some(rest) = line.strip_prefix("VERSION") {
            version = rest.split_whitespace().next().map(str::to_string);
        } else if line.starts_with("FEATURES") {
            let (parsed, consumed) = parse_features(&lines[i + 1..])?;
            features = parsed;
            i += consumed;
        } else if line.starts_with("ORIGIN") {
            for seq_line in &lines[i + 1..] {
                seq.extend(
                    seq_line
                        .bytes()
                        .filter(|b| b.is_ascii_alphabetic() || *b == b'-' || *b == b'*'),
                );
            }
            break;
        }
        i += 1;
    }

    if !saw_locus {
        return Err(SeqsmithError::Parse(
            "GenBank record has no LOCUS line".to_string(),
        ));
    }

    let id = version
        .or(accession)
        .unwrap_or_else(|| name.clone());
    let mut rec = SeqRecord::new(id, seq);
    rec.name = name;
    if !definition.is_empty() && definition != "." {
        rec.description = Some(definition.trim_end_matches('.').to_string());
    }
    rec.features = features;
    Ok(rec)
}

/// Parse the FEATURES table. Returns the features and the number of lines
/// consumed (up to but not including ORIGIN or the next header keyword).
/// Shared with the EMBL reader, whose FT body uses the same layout.
pub(crate) fn parse_features(lines: &[&str]) -> SeqsmithResult<(Vec<Feature>, usize)> {
    let mut features: Vec<Feature> = Vec::new();
    let mut consumed = 0;

    let mut current_key: Option<String> = None;
    let mut location_text = String::new();
    let mut qualifier_lines: Vec<String> = Vec::new();

    for line in lines {
        // The table ends at the first line that is not indented feature data
        if !line.starts_with("     ") {
            break;
        }
        consumed += 1;
        let body = &line[5..];
        if body.trim().is_empty() {
            continue;
        }

        if !body.starts_with(' ') {
            // New feature key
            if let Some(key) = current_key.take() {
                features.push(build_feature(&key, &location_text, &qualifier_lines)?);
            }
            let mut parts = body.splitn(2, char::is_whitespace);
            current_key = Some(parts.next().unwrap_or_default().to_string());
            location_text = parts.next().unwrap_or_default().trim().to_string();
            qualifier_lines.clear();
        } else {
            let content = body.trim();
            if content.starts_with('/') {
                qualifier_lines.push(content.to_string());
            } else if qualifier_lines.is_empty() {
                // Location continued across lines
                location_text.push_str(content);
            } else if let Some(last) = qualifier_lines.last_mut() {
                // Wrapped qualifier value
                if !last.ends_with('=') && !content.starts_with('"') {
                    last.push(' ');
                }
                last.push_str(content);
            }
        }
    }

    if let Some(key) = current_key {
        features.push(build_feature(&key, &location_text, &qualifier_lines)?);
    }
    Ok((features, consumed))
}

fn build_feature(
    key: &str,
    location_text: &str,
    qualifier_lines: &[String],
) -> SeqsmithResult<Feature> {
    let location = parse_location(location_text)?;
    let mut feature = Feature::new(key, location);
    for line in qualifier_lines {
        let body = line.trim_start_matches('/');
        match body.split_once('=') {
            Some((k, v)) => feature
                .qualifiers
                .push((k.to_string(), v.trim_matches('"').to_string())),
            None => feature.qualifiers.push((body.to_string(), String::new())),
        }
    }
    Ok(feature)
}

/// Parse a GenBank location string into a Location. Coordinates in the file
/// are 1-based inclusive; in memory they are 0-based half-open.
pub fn parse_location(text: &str) -> SeqsmithResult<Location> {
    let text = text.trim();

    if let Some(inner) = strip_call(text, "complement") {
        let loc = parse_location(inner)?;
        return Ok(flip_strand(loc));
    }
    for op in ["join", "order"] {
        if let Some(inner) = strip_call(text, op) {
            let mut parts = Vec::new();
            for piece in split_top_level(inner) {
                match parse_location(piece)? {
                    Location::Simple(span) => parts.push(span),
                    Location::Compound { parts: nested, .. } => parts.extend(nested),
                }
            }
            return Ok(Location::Compound {
                parts,
                operator: op.to_string(),
            });
        }
    }

    // Plain span: "123..456", "<123..>456", "123^124", or "123"
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '<' | '>'))
        .collect();
    let (start, end) = if let Some((s, e)) = cleaned.split_once("..") {
        (parse_coord(s)?, parse_coord(e)?)
    } else if let Some((s, _)) = cleaned.split_once('^') {
        let s = parse_coord(s)?;
        (s, s)
    } else {
        let pos = parse_coord(&cleaned)?;
        (pos, pos)
    };

    Ok(Location::simple(start.saturating_sub(1), end, 1))
}

fn parse_coord(s: &str) -> SeqsmithResult<usize> {
    s.trim()
        .parse()
        .map_err(|_| SeqsmithError::Parse(format!("bad location coordinate: '{}'", s)))
}

fn strip_call<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(name)?.trim_start();
    let inner = rest.strip_prefix('(')?;
    inner.strip_suffix(')')
}

fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

fn flip_strand(location: Location) -> Location {
    match location {
        Location::Simple(span) => Location::Simple(Span::new(span.start, span.end, -span.strand)),
        Location::Compound { parts, operator } => Location::Compound {
            parts: parts
                .into_iter()
                .map(|p| Span::new(p.start, p.end, -p.strand))
                .collect(),
            operator,
        },
    }
}

/// Render a Location back into GenBank notation.
pub fn format_location(location: &Location) -> String {
    match location {
        Location::Simple(span) => format_span(span),
        Location::Compound { parts, operator } => {
            let all_reverse = !parts.is_empty() && parts.iter().all(|p| p.strand == -1);
            let body: Vec<String> = parts
                .iter()
                .map(|p| {
                    if all_reverse {
                        format_span(&Span::new(p.start, p.end, 1))
                    } else {
                        format_span(p)
                    }
                })
                .collect();
            let joined = format!("{}({})", operator, body.join(","));
            if all_reverse {
                format!("complement({})", joined)
            } else {
                joined
            }
        }
    }
}

fn format_span(span: &Span) -> String {
    let body = if span.end <= span.start + 1 {
        format!("{}", span.end.max(1))
    } else {
        format!("{}..{}", span.start + 1, span.end)
    };
    if span.strand == -1 {
        format!("complement({})", body)
    } else {
        body
    }
}

pub fn write<W: Write>(
    writer: &mut W,
    records: &[SeqRecord],
    alphabet: Option<Alphabet>,
) -> SeqsmithResult<()> {
    let (unit, molecule) = match alphabet {
        Some(Alphabet::Rna) => ("bp", "RNA"),
        Some(Alphabet::Protein) => ("aa", "PROTEIN"),
        _ => ("bp", "DNA"),
    };

    for rec in records {
        let name = if rec.name.is_empty() { &rec.id } else { &rec.name };
        writeln!(
            writer,
            "LOCUS       {:<16} {} {}    {}    linear   UNK",
            name,
            rec.len(),
            unit,
            molecule
        )?;
        writeln!(
            writer,
            "DEFINITION  {}.",
            rec.description.as_deref().unwrap_or("")
        )?;
        writeln!(writer, "ACCESSION   {}", rec.id)?;

        writeln!(writer, "FEATURES             Location/Qualifiers")?;
        for feature in &rec.features {
            writeln!(
                writer,
                "     {:<16}{}",
                feature.kind,
                format_location(&feature.location)
            )?;
            for (key, value) in &feature.qualifiers {
                if value.is_empty() {
                    writeln!(writer, "                     /{}", key)?;
                } else {
                    for line in wrap_qualifier(key, value) {
                        writeln!(writer, "                     {}", line)?;
                    }
                }
            }
        }

        writeln!(writer, "ORIGIN")?;
        for (i, chunk) in rec.seq.chunks(60).enumerate() {
            let words: Vec<String> = chunk
                .chunks(10)
                .map(|w| String::from_utf8_lossy(w).to_string())
                .collect();
            writeln!(writer, "{:>9} {}", i * 60 + 1, words.join(" "))?;
        }
        writeln!(writer, "//")?;
    }
    Ok(())
}

/// Wrap a qualifier as `/key="value"` lines no wider than 58 columns of
/// value text (the canonical 79-column layout minus the indent).
fn wrap_qualifier(key: &str, value: &str) -> Vec<String> {
    const WIDTH: usize = 58;
    let text = format!("/{}=\"{}\"", key, value);
    let mut lines = Vec::new();
    let mut rest = text.as_str();
    while rest.len() > WIDTH {
        // Prefer breaking at a space inside the window
        let cut = rest[..WIDTH]
            .rfind(' ')
            .filter(|&p| p > 0)
            .unwrap_or(WIDTH);
        lines.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start();
    }
    lines.push(rest.to_string());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
LOCUS       TEST_SEQ                39 bp DNA    linear   UNK
DEFINITION  A test record.
ACCESSION   AB123456
VERSION     AB123456.1
FEATURES             Location/Qualifiers
     source          1..39
                     /organism=\"Escherichia coli\"
     CDS             join(1..9,16..24)
                     /gene=\"thing\"
                     /note=\"a note that wraps across lines in the
                     feature table\"
     misc_feature    complement(10..15)
ORIGIN
        1 atgaaattta aaaagggccc tttaaagggc ccaaatttg
//
";

    #[test]
    fn test_parse_basic_record() {
        let records = parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.id, "AB123456.1");
        assert_eq!(rec.name, "TEST_SEQ");
        assert_eq!(rec.description.as_deref(), Some("A test record"));
        assert_eq!(rec.len(), 39);
        assert!(rec.seq.starts_with(b"atgaaa"));
    }

    #[test]
    fn test_parse_features() {
        let records = parse(SAMPLE.as_bytes()).unwrap();
        let features = &records[0].features;
        assert_eq!(features.len(), 3);

        assert_eq!(features[0].kind, "source");
        assert_eq!(features[0].location, Location::simple(0, 39, 1));
        assert_eq!(
            features[0].qualifiers[0],
            ("organism".to_string(), "Escherichia coli".to_string())
        );

        assert_eq!(features[1].kind, "CDS");
        match &features[1].location {
            Location::Compound { parts, operator } => {
                assert_eq!(operator, "join");
                assert_eq!(parts[0], Span::new(0, 9, 1));
                assert_eq!(parts[1], Span::new(15, 24, 1));
            }
            _ => panic!("expected compound location"),
        }
        let note = &features[1].qualifiers[1];
        assert_eq!(note.0, "note");
        assert!(note.1.contains("wraps across lines"));

        assert_eq!(features[2].location, Location::simple(9, 15, -1));
    }

    #[test]
    fn test_location_complement_join() {
        let loc = parse_location("complement(join(1..9,16..24))").unwrap();
        match &loc {
            Location::Compound { parts, .. } => {
                assert!(parts.iter().all(|p| p.strand == -1));
            }
            _ => panic!("expected compound"),
        }
        assert_eq!(format_location(&loc), "complement(join(1..9,16..24))");
    }

    #[test]
    fn test_location_single_position() {
        assert_eq!(parse_location("42").unwrap(), Location::simple(41, 42, 1));
    }

    #[test]
    fn test_location_fuzzy_markers_stripped() {
        assert_eq!(
            parse_location("<5..>20").unwrap(),
            Location::simple(4, 20, 1)
        );
    }

    #[test]
    fn test_format_location_roundtrip() {
        for text in ["1..9", "complement(10..15)", "join(1..9,16..24)"] {
            let loc = parse_location(text).unwrap();
            assert_eq!(format_location(&loc), text);
        }
    }

    #[test]
    fn test_roundtrip_ids_and_residues() {
        let records = parse(SAMPLE.as_bytes()).unwrap();
        let mut out = Vec::new();
        write(&mut out, &records, Some(Alphabet::Dna)).unwrap();
        let reparsed = parse(&out).unwrap();
        assert_eq!(reparsed.len(), 1);
        assert_eq!(reparsed[0].id, records[0].id);
        assert_eq!(reparsed[0].seq, records[0].seq);
        assert_eq!(reparsed[0].features.len(), records[0].features.len());
        assert_eq!(reparsed[0].features[1].location, records[0].features[1].location);
    }

    #[test]
    fn test_rejects_non_genbank() {
        assert!(parse(b">fasta\nACGT\n").is_err());
        assert!(parse(b"").is_err());
    }

    #[test]
    fn test_multiple_records() {
        let doubled = format!("{}{}", SAMPLE, SAMPLE.replace("AB123456", "XY999999"));
        let records = parse(doubled.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, "XY999999.1");
    }
}
