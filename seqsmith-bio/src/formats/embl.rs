//! EMBL flat-file reader and writer. The feature table shares its layout
//! with GenBank, so location and qualifier handling is delegated there.

use super::genbank;
use crate::alphabet::Alphabet;
use crate::record::SeqRecord;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::io::Write;

pub fn parse(data: &[u8]) -> SeqsmithResult<Vec<SeqRecord>> {
    let text = std::str::from_utf8(data)
        .map_err(|_| SeqsmithError::Parse("EMBL input is not valid UTF-8".to_string()))?;

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
    if block.iter().any(|l| l.starts_with("ID ")) {
        records.push(parse_record(&block)?);
    }

    if records.is_empty() {
        return Err(SeqsmithError::Parse("no EMBL records found".to_string()));
    }
    Ok(records)
}

fn parse_record(lines: &[&str]) -> SeqsmithResult<SeqRecord> {
    let mut id = String::new();
    let mut accession = None;
    let mut description = String::new();
    let mut feature_lines: Vec<String> = Vec::new();
    let mut seq = Vec::new();
    let mut in_sequence = false;

    for line in lines {
        if in_sequence {
            seq.extend(line.bytes().filter(|b| b.is_ascii_alphabetic()));
            continue;
        }
        let (code, body) = line.split_at(line.len().min(2));
        let body = body.trim_start();
        match code {
            "ID" => {
                id = body
                    .split([';', ' '])
                    .next()
                    .unwrap_or_default()
                    .to_string();
            }
            "AC" => {
                if accession.is_none() {
                    accession = body
                        .split(';')
                        .next()
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty());
                }
            }
            "DE" => {
                if !description.is_empty() {
                    description.push(' ');
                }
                description.push_str(body);
            }
            "FT" => {
                // Re-shape into the GenBank feature-table layout: the FT body
                // starts at column 5, exactly where GenBank indents to
                feature_lines.push(format!("     {}", &line[5.min(line.len())..]));
            }
            "SQ" => in_sequence = true,
            _ => {}
        }
    }

    if id.is_empty() {
        return Err(SeqsmithError::Parse(
            "EMBL record has no ID line".to_string(),
        ));
    }

    let refs: Vec<&str> = feature_lines.iter().map(String::as_str).collect();
    let (features, _) = genbank::parse_features(&refs)?;

    let mut rec = SeqRecord::new(accession.unwrap_or_else(|| id.clone()), seq);
    rec.name = id;
    if !description.is_empty() {
        rec.description = Some(description.trim_end_matches('.').to_string());
    }
    rec.features = features;
    Ok(rec)
}

pub fn write<W: Write>(
    writer: &mut W,
    records: &[SeqRecord],
    alphabet: Option<Alphabet>,
) -> SeqsmithResult<()> {
    let molecule = match alphabet {
        Some(Alphabet::Rna) => "RNA",
        Some(Alphabet::Protein) => "PRT",
        _ => "DNA",
    };
    let unit = if alphabet == Some(Alphabet::Protein) {
        "AA"
    } else {
        "BP"
    };

    for rec in records {
        let name = if rec.name.is_empty() { &rec.id } else { &rec.name };
        writeln!(
            writer,
            "ID   {}; SV 1; linear; {}; STD; UNC; {} {}.",
            name,
            molecule,
            rec.len(),
            unit
        )?;
        writeln!(writer, "XX")?;
        writeln!(writer, "AC   {};", rec.id)?;
        writeln!(writer, "XX")?;
        writeln!(
            writer,
            "DE   {}.",
            rec.description.as_deref().unwrap_or("")
        )?;
        writeln!(writer, "XX")?;
        writeln!(writer, "FH   Key             Location/Qualifiers")?;
        writeln!(writer, "FH")?;
        for feature in &rec.features {
            writeln!(
                writer,
                "FT   {:<16}{}",
                feature.kind,
                genbank::format_location(&feature.location)
            )?;
            for (key, value) in &feature.qualifiers {
                if value.is_empty() {
                    writeln!(writer, "FT                   /{}", key)?;
                } else {
                    writeln!(writer, "FT                   /{}=\"{}\"", key, value)?;
                }
            }
        }
        writeln!(writer, "XX")?;
        writeln!(writer, "SQ   Sequence {} {};", rec.len(), unit)?;
        for (i, chunk) in rec.seq.chunks(60).enumerate() {
            let words: Vec<String> = chunk
                .chunks(10)
                .map(|w| String::from_utf8_lossy(w).to_string())
                .collect();
            let written = i * 60 + chunk.len();
            writeln!(writer, "     {:<66}{:>9}", words.join(" "), written)?;
        }
        writeln!(writer, "//")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Location;

    const SAMPLE: &str = "\
ID   TEST_SEQ; SV 1; linear; DNA; STD; UNC; 24 BP.
XX
AC   AB123456;
XX
DE   A test record.
XX
FH   Key             Location/Qualifiers
FH
FT   CDS             join(1..9,16..24)
FT                   /gene=\"thing\"
FT   misc_feature    complement(10..15)
XX
SQ   Sequence 24 BP;
     atgaaattta aaaagggccc ttta                                            24
//
";

    #[test]
    fn test_parse_record() {
        let records = parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.id, "AB123456");
        assert_eq!(rec.name, "TEST_SEQ");
        assert_eq!(rec.description.as_deref(), Some("A test record"));
        assert_eq!(rec.len(), 24);
        assert_eq!(rec.features.len(), 2);
        assert_eq!(rec.features[1].location, Location::simple(9, 15, -1));
    }

    #[test]
    fn test_roundtrip_ids_and_residues() {
        let records = parse(SAMPLE.as_bytes()).unwrap();
        let mut out = Vec::new();
        write(&mut out, &records, Some(Alphabet::Dna)).unwrap();
        let reparsed = parse(&out).unwrap();
        assert_eq!(reparsed[0].id, records[0].id);
        assert_eq!(reparsed[0].seq, records[0].seq);
        assert_eq!(reparsed[0].features.len(), 2);
    }

    #[test]
    fn test_rejects_fasta() {
        assert!(parse(b">x\nACGT\n").is_err());
    }
}
