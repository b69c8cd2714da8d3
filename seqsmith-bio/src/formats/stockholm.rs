//! Stockholm alignment reader and writer. GF/GS/GR/GC annotation lines are
//! skipped on read; only the sequence lines survive.

use crate::record::SeqRecord;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::io::Write;

pub fn parse(data: &[u8]) -> SeqsmithResult<Vec<SeqRecord>> {
    let text = std::str::from_utf8(data)
        .map_err(|_| SeqsmithError::Parse("Stockholm input is not valid UTF-8".to_string()))?;

    let mut lines = text.lines();
    let header = lines.next().unwrap_or_default();
    if !header.starts_with("# STOCKHOLM") {
        return Err(SeqsmithError::Parse(
            "Stockholm input must start with '# STOCKHOLM'".to_string(),
        ));
    }

    let mut order: Vec<String> = Vec::new();
    let mut seqs: Vec<Vec<u8>> = Vec::new();

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if trimmed == "//" {
            break;
        }
        let mut parts = trimmed.split_whitespace();
        let name = match parts.next() {
            Some(n) => n.to_string(),
            None => continue,
        };
        let residues: Vec<u8> = parts.flat_map(|p| p.bytes()).collect();
        if residues.is_empty() {
            continue;
        }
        match order.iter().position(|n| *n == name) {
            Some(idx) => seqs[idx].extend(residues),
            None => {
                order.push(name);
                seqs.push(residues);
            }
        }
    }

    if order.is_empty() {
        return Err(SeqsmithError::Parse(
            "Stockholm input has no sequence lines".to_string(),
        ));
    }

    Ok(order
        .into_iter()
        .zip(seqs)
        .map(|(name, seq)| SeqRecord::new(name, seq))
        .collect())
}

pub fn write<W: Write>(writer: &mut W, records: &[SeqRecord]) -> SeqsmithResult<()> {
    let name_width = records.iter().map(|r| r.id.len()).max().unwrap_or(0);
    writeln!(writer, "# STOCKHOLM 1.0")?;
    for rec in records {
        writeln!(
            writer,
            "{:<width$}  {}",
            rec.id,
            rec.seq_str(),
            width = name_width
        )?;
    }
    writeln!(writer, "//")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# STOCKHOLM 1.0
#=GF ID test
alpha  ACGT-CGT
beta   TTTTAAAA
//
";

    #[test]
    fn test_parse() {
        let records = parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "alpha");
        assert_eq!(records[0].seq, b"ACGT-CGT");
    }

    #[test]
    fn test_interleaved_blocks_concatenate() {
        let text = "# STOCKHOLM 1.0\na ACGT\nb GGGG\n\na TTTT\nb CCCC\n//\n";
        let records = parse(text.as_bytes()).unwrap();
        assert_eq!(records[0].seq, b"ACGTTTTT");
        assert_eq!(records[1].seq, b"GGGGCCCC");
    }

    #[test]
    fn test_rejects_without_header() {
        assert!(parse(b"alpha ACGT\n//\n").is_err());
    }

    #[test]
    fn test_roundtrip() {
        let records = parse(SAMPLE.as_bytes()).unwrap();
        let mut out = Vec::new();
        write(&mut out, &records).unwrap();
        assert_eq!(parse(&out).unwrap(), records);
    }
}
