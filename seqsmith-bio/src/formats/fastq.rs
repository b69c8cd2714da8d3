use crate::record::SeqRecord;
use needletail::parse_fastx_reader;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::io::{Cursor, Write};

/// Parse FASTQ records from a byte buffer.
pub fn parse(data: &[u8]) -> SeqsmithResult<Vec<SeqRecord>> {
    // needletail happily reads FASTA too; this parser is FASTQ-only so the
    // format detector can tell the two apart
    let first = data.iter().find(|c| !c.is_ascii_whitespace());
    if first != Some(&b'@') {
        return Err(SeqsmithError::Parse(
            "FASTQ input must start with '@'".to_string(),
        ));
    }

    let mut reader = parse_fastx_reader(Cursor::new(data.to_vec()))
        .map_err(|e| SeqsmithError::Parse(format!("Failed to parse FASTQ: {}", e)))?;

    let mut records = Vec::new();
    while let Some(entry) = reader.next() {
        let entry =
            entry.map_err(|e| SeqsmithError::Parse(format!("Failed to parse FASTQ: {}", e)))?;

        let header = String::from_utf8_lossy(entry.id()).to_string();
        let (id, description) = match header.split_once(' ') {
            Some((id, desc)) => (id.to_string(), Some(desc.to_string())),
            None => (header, None),
        };

        let mut rec = SeqRecord::new(id, entry.seq().to_vec());
        rec.description = description;
        rec.quality = entry.qual().map(|q| q.to_vec());
        records.push(rec);
    }

    Ok(records)
}

/// Write records as FASTQ. Every record must carry quality scores.
pub fn write<W: Write>(writer: &mut W, records: &[SeqRecord]) -> SeqsmithResult<()> {
    for rec in records {
        let quality = rec.quality.as_ref().ok_or_else(|| {
            SeqsmithError::InvalidInput(format!(
                "record {} has no quality scores; cannot write FASTQ",
                rec.id
            ))
        })?;
        writer.write_all(b"@")?;
        writer.write_all(rec.header().as_bytes())?;
        writer.write_all(b"\n")?;
        writer.write_all(&rec.seq)?;
        writer.write_all(b"\n+\n")?;
        writer.write_all(quality)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}
