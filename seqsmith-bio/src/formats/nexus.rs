//! NEXUS data-block reader and writer (sequence matrices only; tree blocks
//! live in seqsmith-phylo).

use crate::alphabet::Alphabet;
use crate::record::SeqRecord;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::io::Write;

pub fn parse(data: &[u8]) -> SeqsmithResult<Vec<SeqRecord>> {
    let text = std::str::from_utf8(data)
        .map_err(|_| SeqsmithError::Parse("NEXUS input is not valid UTF-8".to_string()))?;

    let mut lines = text.lines();
    let header = lines.next().unwrap_or_default().trim();
    if !header.eq_ignore_ascii_case("#nexus") {
        return Err(SeqsmithError::Parse(
            "NEXUS input must start with #NEXUS".to_string(),
        ));
    }

    // Order of first appearance matters; sequences may be interleaved
    let mut order: Vec<String> = Vec::new();
    let mut seqs: Vec<Vec<u8>> = Vec::new();
    let mut in_matrix = false;

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('[') {
            continue;
        }
        let lowered = trimmed.to_ascii_lowercase();
        if !in_matrix {
            if lowered == "matrix" || lowered.starts_with("matrix") {
                in_matrix = true;
            }
            continue;
        }
        if trimmed == ";" || lowered.starts_with("end;") {
            break;
        }

        let body = trimmed.trim_end_matches(';');
        let mut parts = body.split_whitespace();
        let name = match parts.next() {
            Some(n) => n.trim_matches('\'').to_string(),
            None => continue,
        };
        let residues: Vec<u8> = parts.flat_map(|p| p.bytes()).collect();

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
            "NEXUS data block has no matrix entries".to_string(),
        ));
    }

    Ok(order
        .into_iter()
        .zip(seqs)
        .map(|(name, seq)| SeqRecord::new(name, seq))
        .collect())
}

pub fn write<W: Write>(
    writer: &mut W,
    records: &[SeqRecord],
    alphabet: Option<Alphabet>,
) -> SeqsmithResult<()> {
    let datatype = match alphabet {
        Some(Alphabet::Rna) => "rna",
        Some(Alphabet::Protein) => "protein",
        _ => "dna",
    };
    let nchar = records.iter().map(SeqRecord::len).max().unwrap_or(0);
    let name_width = records.iter().map(|r| r.id.len()).max().unwrap_or(0);

    writeln!(writer, "#NEXUS")?;
    writeln!(writer, "begin data;")?;
    writeln!(
        writer,
        "    dimensions ntax={} nchar={};",
        records.len(),
        nchar
    )?;
    writeln!(
        writer,
        "    format datatype={} missing=? gap=-;",
        datatype
    )?;
    writeln!(writer, "    matrix")?;
    for rec in records {
        writeln!(
            writer,
            "    {:<width$}  {}",
            rec.id,
            rec.seq_str(),
            width = name_width
        )?;
    }
    writeln!(writer, "    ;")?;
    writeln!(writer, "end;")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
#NEXUS
begin data;
    dimensions ntax=2 nchar=8;
    format datatype=dna missing=? gap=-;
    matrix
    alpha  ACGTACGT
    beta   TTTTAAAA
    ;
end;
";

    #[test]
    fn test_parse_matrix() {
        let records = parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "alpha");
        assert_eq!(records[0].seq, b"ACGTACGT");
        assert_eq!(records[1].id, "beta");
    }

    #[test]
    fn test_parse_interleaved() {
        let text = "#NEXUS\nbegin data;\nmatrix\na ACGT\nb TTTT\na ACGT\nb AAAA\n;\nend;\n";
        let records = parse(text.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].seq, b"ACGTACGT");
        assert_eq!(records[1].seq, b"TTTTAAAA");
    }

    #[test]
    fn test_rejects_without_header() {
        assert!(parse(b"begin data;\nmatrix\na ACGT\n;\nend;\n").is_err());
        assert!(parse(b">x\nACGT\n").is_err());
    }

    #[test]
    fn test_roundtrip() {
        let records = parse(SAMPLE.as_bytes()).unwrap();
        let mut out = Vec::new();
        write(&mut out, &records, Some(Alphabet::Dna)).unwrap();
        let reparsed = parse(&out).unwrap();
        assert_eq!(records, reparsed);
    }
}
