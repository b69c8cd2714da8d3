//! Hand-rolled Phylip reader and writer, relaxed and strict variants.
//!
//! Relaxed names are whitespace-delimited tokens of any length; strict names
//! occupy exactly the first ten columns. Sequential and interleaved layouts
//! both parse: lines beyond the taxon count are folded back round-robin.

use crate::record::SeqRecord;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::io::Write;

pub fn parse(data: &[u8], strict: bool) -> SeqsmithResult<Vec<SeqRecord>> {
    let text = std::str::from_utf8(data)
        .map_err(|_| SeqsmithError::Parse("Phylip input is not valid UTF-8".to_string()))?;

    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| SeqsmithError::Parse("empty Phylip input".to_string()))?;

    let mut header_parts = header.split_whitespace();
    let ntax: usize = header_parts
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| SeqsmithError::Parse("bad Phylip header".to_string()))?;
    let nchar: usize = header_parts
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| SeqsmithError::Parse("bad Phylip header".to_string()))?;
    if ntax == 0 || header_parts.next().is_some() {
        return Err(SeqsmithError::Parse("bad Phylip header".to_string()));
    }

    let mut records: Vec<SeqRecord> = Vec::with_capacity(ntax);
    for (i, line) in lines.enumerate() {
        if i < ntax {
            let (name, residues) = if strict {
                let cut = line.len().min(10);
                (line[..cut].trim().to_string(), &line[cut..])
            } else {
                let mut parts = line.splitn(2, char::is_whitespace);
                let name = parts.next().unwrap_or_default().to_string();
                (name, parts.next().unwrap_or_default())
            };
            if name.is_empty() {
                return Err(SeqsmithError::Parse(format!(
                    "Phylip line {} has no taxon name",
                    i + 2
                )));
            }
            let seq: Vec<u8> = residues
                .bytes()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            records.push(SeqRecord::new(name, seq));
        } else {
            // Interleaved continuation block
            let idx = (i - ntax) % ntax;
            records[idx]
                .seq
                .extend(line.bytes().filter(|b| !b.is_ascii_whitespace()));
        }
    }

    if records.len() != ntax {
        return Err(SeqsmithError::Parse(format!(
            "Phylip header claims {} taxa but {} were found",
            ntax,
            records.len()
        )));
    }
    for rec in &records {
        if rec.len() != nchar {
            return Err(SeqsmithError::Parse(format!(
                "Phylip sequence {} has {} characters, expected {}",
                rec.id,
                rec.len(),
                nchar
            )));
        }
    }
    Ok(records)
}

pub fn write<W: Write>(writer: &mut W, records: &[SeqRecord], strict: bool) -> SeqsmithResult<()> {
    let max_seq = records.iter().map(SeqRecord::len).max().unwrap_or(0);
    writeln!(writer, " {} {}", records.len(), max_seq)?;

    let name_width = if strict {
        10
    } else {
        records.iter().map(|r| r.id.len()).max().unwrap_or(0)
    };
    for rec in records {
        let name = if strict {
            let cut = rec.id.len().min(10);
            &rec.id[..cut]
        } else {
            &rec.id
        };
        writeln!(
            writer,
            "{:<width$}  {}",
            name,
            rec.seq_str(),
            width = name_width
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relaxed() {
        let text = " 2 8\nalpha_long  ACGTACGT\nbeta  TTTTAAAA\n";
        let records = parse(text.as_bytes(), false).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "alpha_long");
        assert_eq!(records[0].seq, b"ACGTACGT");
    }

    #[test]
    fn test_parse_strict_fixed_columns() {
        let text = " 1 8\nabcdefghijACGTACGT\n";
        let records = parse(text.as_bytes(), true).unwrap();
        assert_eq!(records[0].id, "abcdefghij");
        assert_eq!(records[0].seq, b"ACGTACGT");
    }

    #[test]
    fn test_parse_interleaved() {
        let text = " 2 8\na  ACGT\nb  TTTT\nACGT\nAAAA\n";
        let records = parse(text.as_bytes(), false).unwrap();
        assert_eq!(records[0].seq, b"ACGTACGT");
        assert_eq!(records[1].seq, b"TTTTAAAA");
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let text = " 2 8\na  ACGT\nb  TTTTAAAA\n";
        assert!(parse(text.as_bytes(), false).is_err());
    }

    #[test]
    fn test_rejects_fasta() {
        assert!(parse(b">x\nACGT\n", false).is_err());
    }

    #[test]
    fn test_write_relaxed_pads_to_longest_name() {
        let records = vec![
            SeqRecord::new("longname", b"ACGT".to_vec()),
            SeqRecord::new("x", b"TTTT".to_vec()),
        ];
        let mut out = Vec::new();
        write(&mut out, &records, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(" 2 4\n"));
        assert!(text.contains("longname  ACGT"));
        assert!(text.contains("x         TTTT"));
    }

    #[test]
    fn test_write_strict_truncates() {
        let records = vec![SeqRecord::new("averylongname", b"ACGT".to_vec())];
        let mut out = Vec::new();
        write(&mut out, &records, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("averylongn  ACGT"));
    }

    #[test]
    fn test_roundtrip_relaxed() {
        let records = vec![
            SeqRecord::new("alpha", b"ACGTACGT".to_vec()),
            SeqRecord::new("beta", b"TTTTAAAA".to_vec()),
        ];
        let mut out = Vec::new();
        write(&mut out, &records, false).unwrap();
        let reparsed = parse(&out, false).unwrap();
        assert_eq!(records, reparsed);
    }
}
