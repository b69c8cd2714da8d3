use crate::record::SeqRecord;
use flate2::read::GzDecoder;
use memmap2::Mmap;
use nom::{
    bytes::complete::{tag, take_till},
    character::complete::{line_ending, not_line_ending},
    combinator::{map, opt},
    sequence::preceded,
    IResult,
};
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Parse a FASTA header line
fn parse_header(input: &[u8]) -> IResult<&[u8], (&str, Option<&str>)> {
    let (input, _) = tag(b">")(input)?;
    let (input, id) = map(
        take_till(|c: u8| c == b' ' || c == b'\t' || c == b'\n' || c == b'\r'),
        |s| std::str::from_utf8(s).unwrap_or(""),
    )(input)?;
    let (input, description) = opt(preceded(
        tag(b" "),
        map(not_line_ending, |s| std::str::from_utf8(s).unwrap_or("")),
    ))(input)?;
    let (input, _) = opt(line_ending)(input)?;
    Ok((input, (id, description)))
}

/// Collect sequence lines until the next header or EOF. Residue case is
/// preserved; whitespace is dropped.
fn parse_sequence(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let mut sequence = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() && remaining[0] != b'>' {
        let (rest, line) =
            take_till::<_, _, nom::error::Error<_>>(|c: u8| c == b'\n' || c == b'\r')(remaining)?;
        let (rest, _) = opt(line_ending)(rest)?;

        for &c in line {
            if !c.is_ascii_whitespace() {
                sequence.push(c);
            }
        }
        remaining = rest;
    }

    Ok((remaining, sequence))
}

fn parse_record(input: &[u8]) -> IResult<&[u8], SeqRecord> {
    let (input, (id, description)) = parse_header(input)?;
    let (input, sequence) = parse_sequence(input)?;

    let mut rec = SeqRecord::new(id.to_string(), sequence);
    if let Some(desc) = description {
        let desc = desc.trim_end();
        if !desc.is_empty() {
            rec = rec.with_description(desc.to_string());
        }
    }
    Ok((input, rec))
}

/// Parse FASTA records from a byte buffer
pub fn parse(data: &[u8]) -> SeqsmithResult<Vec<SeqRecord>> {
    let mut input = data;
    let mut records = Vec::new();

    while !input.is_empty() {
        while !input.is_empty() && input[0].is_ascii_whitespace() {
            input = &input[1..];
        }
        if input.is_empty() {
            break;
        }
        if input[0] != b'>' {
            return Err(SeqsmithError::Parse(
                "FASTA record does not start with '>'".to_string(),
            ));
        }

        match parse_record(input) {
            Ok((remaining, rec)) => {
                records.push(rec);
                input = remaining;
            }
            Err(e) => {
                return Err(SeqsmithError::Parse(format!(
                    "Failed to parse FASTA: {:?}",
                    e
                )));
            }
        }
    }

    Ok(records)
}

/// Parse a FASTA file (supports .gz compression via extension sniffing)
pub fn parse_file<P: AsRef<Path>>(path: P) -> SeqsmithResult<Vec<SeqRecord>> {
    let path = path.as_ref();

    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let file = File::open(path)?;
        let mut decoder = GzDecoder::new(BufReader::new(file));
        let mut buffer = Vec::new();
        decoder.read_to_end(&mut buffer)?;
        parse(&buffer)
    } else {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        parse(&mmap[..])
    }
}

/// Write records to any writer, wrapping residues at `wrap` columns.
pub fn write<W: Write>(writer: &mut W, records: &[SeqRecord], wrap: usize) -> SeqsmithResult<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let wrap = wrap.max(1);
    let show_progress = records.len() > 1000 && std::env::var("SEQSMITH_SILENT").is_err();
    let pb = if show_progress {
        let pb = ProgressBar::new(records.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} records")
                .unwrap()
                .progress_chars("##-"),
        );
        Some(pb)
    } else {
        None
    };

    for (i, rec) in records.iter().enumerate() {
        writer.write_all(b">")?;
        writer.write_all(rec.header().as_bytes())?;
        writer.write_all(b"\n")?;
        for chunk in rec.seq.chunks(wrap) {
            writer.write_all(chunk)?;
            writer.write_all(b"\n")?;
        }
        if let Some(ref pb) = pb {
            if i % 100 == 0 {
                pb.set_position(i as u64);
            }
        }
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    Ok(())
}

/// Write records to a FASTA file (gz-compressing when the extension asks)
pub fn write_file<P: AsRef<Path>>(
    path: P,
    records: &[SeqRecord],
    wrap: usize,
) -> SeqsmithResult<()> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let path = path.as_ref();
    let file = File::create(path)?;

    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let encoder = GzEncoder::new(file, Compression::default());
        let mut writer = BufWriter::new(encoder);
        write(&mut writer, records, wrap)?;
        writer.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        write(&mut writer, records, wrap)?;
        writer.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_with_description() {
        let input = b">sp|P12345|PROT_HUMAN Some description\nACGT";
        let (remaining, (id, desc)) = parse_header(input).unwrap();
        assert_eq!(id, "sp|P12345|PROT_HUMAN");
        assert_eq!(desc, Some("Some description"));
        assert_eq!(remaining, b"ACGT");
    }

    #[test]
    fn test_parse_multiple_records() {
        let input = b">seq1 first\nACGT\n>seq2\nTG\nCA\n>seq3\naaaa\n";
        let records = parse(input).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, "seq1");
        assert_eq!(records[0].description.as_deref(), Some("first"));
        assert_eq!(records[0].seq, b"ACGT");
        assert_eq!(records[1].seq, b"TGCA");
        // Case is preserved
        assert_eq!(records[2].seq, b"aaaa");
    }

    #[test]
    fn test_parse_leading_blank_lines() {
        let records = parse(b"\n\n>seq1\nACGT\n").unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse(b"not fasta at all\n").is_err());
    }

    #[test]
    fn test_header_only_record() {
        let records = parse(b">empty\n>seq2\nAC\n").unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_empty());
        assert_eq!(records[1].seq, b"AC");
    }

    #[test]
    fn test_write_wraps_lines() {
        let records = vec![SeqRecord::new("seq1", b"ACGTACGTACGT".to_vec())];
        let mut out = Vec::new();
        write(&mut out, &records, 5).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            ">seq1\nACGTA\nCGTAC\nGT\n"
        );
    }

    #[test]
    fn test_roundtrip_preserves_ids_and_residues() {
        let input = b">a one\nACGT\n>b\nttttggg\n";
        let records = parse(input).unwrap();
        let mut out = Vec::new();
        write(&mut out, &records, 80).unwrap();
        let reparsed = parse(&out).unwrap();
        assert_eq!(records, reparsed);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.fa");
        let records = vec![
            SeqRecord::new("x", b"ACGT".to_vec()).with_description("desc"),
            SeqRecord::new("y", b"GGGG".to_vec()),
        ];
        write_file(&path, &records, 80).unwrap();
        let reparsed = parse_file(&path).unwrap();
        assert_eq!(records, reparsed);
    }

    #[test]
    fn test_gzip_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.fa.gz");
        let records = vec![SeqRecord::new("x", b"ACGTACGT".to_vec())];
        write_file(&path, &records, 80).unwrap();
        let reparsed = parse_file(&path).unwrap();
        assert_eq!(records, reparsed);
    }
}
