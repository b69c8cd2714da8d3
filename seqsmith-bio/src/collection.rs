//! The sequence collection wrapper and the record-level operations the CLI
//! exposes: ordering, filtering, deduplication, renaming, and the two-file
//! feature-mapping operations.

use crate::alphabet::{self, Alphabet};
use crate::feature::{self, Feature};
use crate::formats::{self, SeqFormat};
use crate::record::SeqRecord;
use flate2::read::GzDecoder;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::path::Path;

/// An ordered set of sequence records with its formats and inferred
/// alphabet. Constructed at call time, mutated in place, discarded at exit.
#[derive(Debug, Clone)]
pub struct SeqCollection {
    pub records: Vec<SeqRecord>,
    pub in_format: SeqFormat,
    pub out_format: SeqFormat,
    pub alphabet: Option<Alphabet>,
}

impl SeqCollection {
    /// Wrap an existing record list. Annotated GenBank is the default
    /// format for records that never came from a file.
    pub fn from_records(records: Vec<SeqRecord>) -> Self {
        let alphabet = alphabet::guess_alphabet(&records);
        Self {
            records,
            in_format: SeqFormat::Genbank,
            out_format: SeqFormat::Genbank,
            alphabet,
        }
    }

    /// Parse a byte buffer, detecting the format when none is given.
    pub fn from_bytes(data: &[u8], in_format: Option<SeqFormat>) -> SeqsmithResult<Self> {
        if data.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(SeqsmithError::InvalidInput("input is empty".to_string()));
        }
        let format = match in_format {
            Some(f) => f,
            None => {
                let detected = formats::detect(data).ok_or_else(|| {
                    SeqsmithError::Format(
                        "could not determine sequence format; set it explicitly with -f"
                            .to_string(),
                    )
                })?;
                tracing::debug!(format = %detected, "detected sequence format");
                detected
            }
        };
        let records = formats::parse(data, format)?;
        let alphabet = alphabet::guess_alphabet(&records);
        Ok(Self {
            records,
            in_format: format,
            out_format: format,
            alphabet,
        })
    }

    /// Load from a file path (gzip-compressed files are transparent).
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        in_format: Option<SeqFormat>,
    ) -> SeqsmithResult<Self> {
        let path = path.as_ref();
        let mut data = std::fs::read(path)?;
        if path.extension().and_then(|e| e.to_str()) == Some("gz") {
            let mut decoder = GzDecoder::new(&data[..]);
            let mut decompressed = Vec::new();
            decoder.read_to_end(&mut decompressed)?;
            data = decompressed;
        }
        Self::from_bytes(&data, in_format)
    }

    /// CLI entry point: a path when one exists, otherwise the argument is
    /// taken as raw residues.
    pub fn from_input(input: &str, in_format: Option<SeqFormat>) -> SeqsmithResult<Self> {
        if Path::new(input).is_file() {
            Self::from_path(input, in_format)
        } else {
            let mut collection = Self::from_bytes(input.as_bytes(), Some(SeqFormat::Raw))?;
            collection.in_format = in_format.unwrap_or(SeqFormat::Raw);
            collection.out_format = collection.in_format;
            Ok(collection)
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    /// Re-guess the alphabet after a transformation changed the residues
    pub fn refresh_alphabet(&mut self) {
        self.alphabet = alphabet::guess_alphabet(&self.records);
    }

    /// Render the collection in its output format
    pub fn write_string(&self) -> SeqsmithResult<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|_| SeqsmithError::Other("non-UTF8 output".to_string()))
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> SeqsmithResult<()> {
        let wrap = seqsmith_core::Config::global().output.wrap_width;
        formats::write(writer, &self.records, self.out_format, self.alphabet, wrap)
    }

    /// Average residue count across records
    pub fn average_length(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let total: usize = self.records.iter().map(SeqRecord::len).sum();
        total as f64 / self.records.len() as f64
    }

    /// Sort records by id (alphanumeric)
    pub fn order_ids(&mut self, reverse: bool) {
        self.records.sort_by(|a, b| a.id.cmp(&b.id));
        if reverse {
            self.records.reverse();
        }
    }

    /// Randomly reorder the records
    pub fn shuffle(&mut self) {
        self.shuffle_with_rng(&mut rand::thread_rng());
    }

    pub fn shuffle_with_rng<R: Rng>(&mut self, rng: &mut R) {
        self.records.shuffle(rng);
    }

    /// Regex-substitute over every record id
    pub fn rename_ids(&mut self, pattern: &str, replacement: &str) -> SeqsmithResult<()> {
        let re = Regex::new(pattern)?;
        for rec in &mut self.records {
            let new_id = re.replace_all(&rec.id, replacement).to_string();
            rec.rename(new_id);
        }
        Ok(())
    }

    /// Replace every id with a unique 10-character alphanumeric hash.
    /// Returns (hash, original id) pairs for the stderr table.
    pub fn hash_ids(&mut self) -> Vec<(String, String)> {
        self.hash_ids_with_rng(&mut rand::thread_rng())
    }

    pub fn hash_ids_with_rng<R: Rng>(&mut self, rng: &mut R) -> Vec<(String, String)> {
        let mut seen = HashSet::new();
        let mut table = Vec::with_capacity(self.records.len());
        for rec in &mut self.records {
            let hash = loop {
                let candidate: String = (&mut *rng)
                    .sample_iter(&Alphanumeric)
                    .take(10)
                    .map(char::from)
                    .collect();
                if seen.insert(candidate.clone()) {
                    break candidate;
                }
            };
            table.push((hash.clone(), rec.id.clone()));
            rec.rename(hash);
        }
        table
    }

    /// Keep only records whose id, name, or description matches the pattern
    pub fn pull_records(&mut self, pattern: &str) -> SeqsmithResult<()> {
        let re = Regex::new(pattern)?;
        self.records.retain(|rec| {
            re.is_match(&rec.id)
                || re.is_match(&rec.name)
                || rec.description.as_deref().is_some_and(|d| re.is_match(d))
        });
        Ok(())
    }

    /// Remove matching records; the removed ids are returned for reporting
    pub fn delete_records(&mut self, pattern: &str) -> SeqsmithResult<Vec<String>> {
        let re = Regex::new(pattern)?;
        let mut deleted = Vec::new();
        self.records.retain(|rec| {
            let hit = re.is_match(&rec.id)
                || re.is_match(&rec.name)
                || rec.description.as_deref().is_some_and(|d| re.is_match(d));
            if hit {
                deleted.push(rec.id.clone());
            }
            !hit
        });
        Ok(deleted)
    }

    /// Drop records longer than `max_len`
    pub fn delete_large(&mut self, max_len: usize) {
        self.records.retain(|rec| rec.len() <= max_len);
    }

    /// Drop records shorter than `min_len`
    pub fn delete_small(&mut self, min_len: usize) {
        self.records.retain(|rec| rec.len() >= min_len);
    }

    /// Remove features whose kind matches the pattern
    pub fn delete_features(&mut self, pattern: &str) -> SeqsmithResult<()> {
        let re = Regex::new(pattern)?;
        for rec in &mut self.records {
            rec.features.retain(|f| !re.is_match(&f.kind));
        }
        Ok(())
    }

    /// Keep id only: clear names, descriptions, features, and qualities
    pub fn delete_metadata(&mut self) {
        for rec in &mut self.records {
            rec.name = rec.id.clone();
            rec.description = None;
            rec.features.clear();
            rec.quality = None;
        }
    }

    pub fn order_features_by_position(&mut self) {
        for rec in &mut self.records {
            rec.features.sort_by_key(|f| f.location.start());
        }
    }

    pub fn order_features_alphabetically(&mut self) {
        for rec in &mut self.records {
            rec.features.sort_by(|a, b| a.kind.cmp(&b.kind));
        }
    }
}

/// Which duplicates `delete_repeats` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatScope {
    All,
    Ids,
    Seqs,
}

/// Duplicate ids and duplicate residue strings found in a collection.
#[derive(Debug, Clone, Default)]
pub struct RepeatReport {
    /// ids that appear on more than one record
    pub repeat_ids: Vec<String>,
    /// groups of ids (each group > 1) sharing identical residues
    pub repeat_seqs: Vec<Vec<String>>,
}

impl RepeatReport {
    pub fn is_empty(&self) -> bool {
        self.repeat_ids.is_empty() && self.repeat_seqs.is_empty()
    }
}

/// Report duplicate record ids and duplicate sequences.
pub fn find_repeats(collection: &SeqCollection) -> RepeatReport {
    let mut id_counts: HashMap<&str, usize> = HashMap::new();
    for rec in &collection.records {
        *id_counts.entry(rec.id.as_str()).or_default() += 1;
    }
    let mut repeat_ids: Vec<String> = Vec::new();
    for rec in &collection.records {
        if id_counts[rec.id.as_str()] > 1 && !repeat_ids.iter().any(|i| i == &rec.id) {
            repeat_ids.push(rec.id.clone());
        }
    }

    let mut by_seq: Vec<(Vec<u8>, Vec<String>)> = Vec::new();
    for rec in &collection.records {
        match by_seq.iter_mut().find(|(seq, _)| *seq == rec.seq) {
            Some((_, ids)) => ids.push(rec.id.clone()),
            None => by_seq.push((rec.seq.clone(), vec![rec.id.clone()])),
        }
    }
    let repeat_seqs = by_seq
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(_, ids)| ids)
        .collect();

    RepeatReport {
        repeat_ids,
        repeat_seqs,
    }
}

/// Strip duplicate records, keeping the first instance. Returns the ids of
/// the removed records.
pub fn delete_repeats(collection: &mut SeqCollection, scope: RepeatScope) -> Vec<String> {
    let mut removed = Vec::new();

    if matches!(scope, RepeatScope::All | RepeatScope::Ids) {
        let mut seen = HashSet::new();
        collection.records.retain(|rec| {
            if seen.insert(rec.id.clone()) {
                true
            } else {
                removed.push(rec.id.clone());
                false
            }
        });
    }

    if matches!(scope, RepeatScope::All | RepeatScope::Seqs) {
        let mut seen: Vec<Vec<u8>> = Vec::new();
        collection.records.retain(|rec| {
            if seen.iter().any(|s| *s == rec.seq) {
                removed.push(rec.id.clone());
                false
            } else {
                seen.push(rec.seq.clone());
                true
            }
        });
    }

    removed
}

/// Pool the records of several collections into one. Formats follow the
/// first collection.
pub fn merge(collections: Vec<SeqCollection>) -> SeqsmithResult<SeqCollection> {
    let mut iter = collections.into_iter();
    let mut merged = iter
        .next()
        .ok_or_else(|| SeqsmithError::InvalidInput("nothing to merge".to_string()))?;
    for collection in iter {
        merged.records.extend(collection.records);
    }
    merged.refresh_alphabet();
    Ok(merged)
}

fn first_occurrence_map(collection: &SeqCollection) -> HashMap<&str, usize> {
    let mut map = HashMap::new();
    for (i, rec) in collection.records.iter().enumerate() {
        map.entry(rec.id.as_str()).or_insert(i);
    }
    map
}

/// Copy feature annotations from nucleotide records onto the protein
/// records with the same ids, dividing coordinates by three (flooring).
/// Records present in only one collection warn to stderr.
pub fn map_features_nucleotide_to_protein(
    nucleotide: &SeqCollection,
    protein: &SeqCollection,
) -> SeqsmithResult<SeqCollection> {
    map_features(nucleotide, protein, feature::nucleotide_to_protein)
}

/// Copy feature annotations from protein records onto the nucleotide
/// records with the same ids, multiplying coordinates by three.
pub fn map_features_protein_to_nucleotide(
    protein: &SeqCollection,
    nucleotide: &SeqCollection,
) -> SeqsmithResult<SeqCollection> {
    map_features(protein, nucleotide, feature::protein_to_nucleotide)
}

fn map_features(
    source: &SeqCollection,
    target: &SeqCollection,
    transform: impl Fn(&crate::feature::Location) -> crate::feature::Location,
) -> SeqsmithResult<SeqCollection> {
    let target_map = first_occurrence_map(target);
    let mut output = Vec::new();

    for src in &source.records {
        let Some(&idx) = target_map.get(src.id.as_str()) else {
            eprintln!(
                "Warning: {} is in one input but not the other; skipped",
                src.id
            );
            continue;
        };
        let mut rec = target.records[idx].clone();
        for feat in &src.features {
            rec.features.push(Feature {
                kind: feat.kind.clone(),
                location: transform(&feat.location),
                qualifiers: feat.qualifiers.clone(),
            });
        }
        output.push(rec);
    }

    let source_ids: HashSet<&str> = source.records.iter().map(|r| r.id.as_str()).collect();
    for rec in &target.records {
        if !source_ids.contains(rec.id.as_str()) {
            eprintln!(
                "Warning: {} is in one input but not the other; skipped",
                rec.id
            );
        }
    }

    let mut collection = SeqCollection::from_records(output);
    collection.out_format = SeqFormat::Genbank;
    Ok(collection)
}

/// Union the features of two collections per record id. Duplicate
/// (start, end, kind) triples are suppressed; repeat ids in either input
/// are an error; ids in only one input warn and pass through.
pub fn combine_features(
    first: &SeqCollection,
    second: &SeqCollection,
) -> SeqsmithResult<SeqCollection> {
    for (label, collection) in [("first", first), ("second", second)] {
        let repeats = find_repeats(collection);
        if !repeats.repeat_ids.is_empty() {
            return Err(SeqsmithError::InvalidInput(format!(
                "there are repeat IDs in the {} file: {}",
                label,
                repeats.repeat_ids.join(", ")
            )));
        }
    }

    if first.alphabet != second.alphabet {
        return Err(SeqsmithError::Alphabet(format!(
            "mixed alphabets between inputs ({:?} vs {:?})",
            first.alphabet, second.alphabet
        )));
    }

    let second_map = first_occurrence_map(second);
    let mut output = Vec::new();

    for rec in &first.records {
        let mut merged = rec.clone();
        match second_map.get(rec.id.as_str()) {
            Some(&idx) => {
                let existing: HashSet<String> =
                    merged.features.iter().map(Feature::dedup_key).collect();
                for feat in &second.records[idx].features {
                    if !existing.contains(&feat.dedup_key()) {
                        merged.features.push(feat.clone());
                    }
                }
            }
            None => {
                eprintln!(
                    "Warning: {} is only in the first set of sequences",
                    rec.id
                );
            }
        }
        output.push(merged);
    }

    let first_ids: HashSet<&str> = first.records.iter().map(|r| r.id.as_str()).collect();
    for rec in &second.records {
        if !first_ids.contains(rec.id.as_str()) {
            eprintln!(
                "Warning: {} is only in the second set of sequences",
                rec.id
            );
            output.push(rec.clone());
        }
    }

    let mut collection = SeqCollection::from_records(output);
    collection.out_format = first.in_format;
    Ok(collection)
}
