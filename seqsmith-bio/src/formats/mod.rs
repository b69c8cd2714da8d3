//! Sequence file formats: parsers, writers, and trial-parse detection.

pub mod embl;
pub mod fasta;
pub mod fastq;
pub mod genbank;
pub mod nexus;
pub mod phylip;
pub mod stockholm;

use crate::alphabet::Alphabet;
use crate::record::SeqRecord;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::io::Write;
use std::str::FromStr;

/// The formats the toolkit reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SeqFormat {
    Fasta,
    Fastq,
    Genbank,
    Embl,
    Nexus,
    Phylip,
    PhylipStrict,
    Stockholm,
    Raw,
}

/// Detection candidates, tried in this order; the first parser that yields
/// at least one record wins. Raw is never auto-detected.
pub const DETECTION_ORDER: [SeqFormat; 7] = [
    SeqFormat::Phylip,
    SeqFormat::Stockholm,
    SeqFormat::Fasta,
    SeqFormat::Genbank,
    SeqFormat::Fastq,
    SeqFormat::Nexus,
    SeqFormat::Embl,
];

impl SeqFormat {
    pub fn name(&self) -> &'static str {
        match self {
            SeqFormat::Fasta => "fasta",
            SeqFormat::Fastq => "fastq",
            SeqFormat::Genbank => "genbank",
            SeqFormat::Embl => "embl",
            SeqFormat::Nexus => "nexus",
            SeqFormat::Phylip => "phylip",
            SeqFormat::PhylipStrict => "phylip-strict",
            SeqFormat::Stockholm => "stockholm",
            SeqFormat::Raw => "raw",
        }
    }

    /// Canonical file extension, used when `-sf` rewrites a file in place
    pub fn extension(&self) -> &'static str {
        match self {
            SeqFormat::Fasta => "fa",
            SeqFormat::Fastq => "fq",
            SeqFormat::Genbank => "gb",
            SeqFormat::Embl => "embl",
            SeqFormat::Nexus => "nex",
            SeqFormat::Phylip | SeqFormat::PhylipStrict => "phy",
            SeqFormat::Stockholm => "sto",
            SeqFormat::Raw => "txt",
        }
    }
}

impl std::fmt::Display for SeqFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SeqFormat {
    type Err = SeqsmithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fasta" | "fa" | "fna" | "faa" => Ok(SeqFormat::Fasta),
            "fastq" | "fq" => Ok(SeqFormat::Fastq),
            "genbank" | "gb" | "gbk" => Ok(SeqFormat::Genbank),
            "embl" => Ok(SeqFormat::Embl),
            "nexus" | "nex" | "nxs" => Ok(SeqFormat::Nexus),
            "phylip" | "phylip-relaxed" | "phy" | "phylipi" => Ok(SeqFormat::Phylip),
            "phylip-strict" | "phylipis" => Ok(SeqFormat::PhylipStrict),
            "stockholm" | "sto" | "stk" => Ok(SeqFormat::Stockholm),
            "raw" => Ok(SeqFormat::Raw),
            other => Err(SeqsmithError::Format(other.to_string())),
        }
    }
}

/// Parse a byte buffer in the given format.
pub fn parse(data: &[u8], format: SeqFormat) -> SeqsmithResult<Vec<SeqRecord>> {
    match format {
        SeqFormat::Fasta => fasta::parse(data),
        SeqFormat::Fastq => fastq::parse(data),
        SeqFormat::Genbank => genbank::parse(data),
        SeqFormat::Embl => embl::parse(data),
        SeqFormat::Nexus => nexus::parse(data),
        SeqFormat::Phylip => phylip::parse(data, false),
        SeqFormat::PhylipStrict => phylip::parse(data, true),
        SeqFormat::Stockholm => stockholm::parse(data),
        SeqFormat::Raw => parse_raw(data),
    }
}

/// Write records in the given format. The alphabet steers the molecule
/// fields of the annotated formats.
pub fn write<W: Write>(
    writer: &mut W,
    records: &[SeqRecord],
    format: SeqFormat,
    alphabet: Option<Alphabet>,
    wrap: usize,
) -> SeqsmithResult<()> {
    match format {
        SeqFormat::Fasta => fasta::write(writer, records, wrap),
        SeqFormat::Fastq => fastq::write(writer, records),
        SeqFormat::Genbank => genbank::write(writer, records, alphabet),
        SeqFormat::Embl => embl::write(writer, records, alphabet),
        SeqFormat::Nexus => nexus::write(writer, records, alphabet),
        SeqFormat::Phylip => phylip::write(writer, records, false),
        SeqFormat::PhylipStrict => phylip::write(writer, records, true),
        SeqFormat::Stockholm => stockholm::write(writer, records),
        SeqFormat::Raw => write_raw(writer, records),
    }
}

/// Guess the format by trial-parsing in DETECTION_ORDER.
pub fn detect(data: &[u8]) -> Option<SeqFormat> {
    if data.iter().all(|b| b.is_ascii_whitespace()) {
        return None;
    }
    DETECTION_ORDER
        .iter()
        .copied()
        .find(|format| matches!(parse(data, *format), Ok(records) if !records.is_empty()))
}

/// Raw input: the entire buffer, whitespace removed, as one record.
fn parse_raw(data: &[u8]) -> SeqsmithResult<Vec<SeqRecord>> {
    let seq: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if seq.is_empty() {
        return Err(SeqsmithError::Parse("raw input is empty".to_string()));
    }
    Ok(vec![SeqRecord::new("raw_input", seq)])
}

fn write_raw<W: Write>(writer: &mut W, records: &[SeqRecord]) -> SeqsmithResult<()> {
    for rec in records {
        writer.write_all(&rec.seq)?;
        writer.write_all(b"\n\n")?;
    }
    Ok(())
}
