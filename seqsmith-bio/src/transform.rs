//! Residue-level transformations: case folding, cleaning, transcription,
//! complementation, frame selection, concatenation, and region extraction.

use crate::alphabet::Alphabet;
use crate::collection::SeqCollection;
use crate::feature::{self, Feature, Location};
use crate::formats::SeqFormat;
use crate::record::SeqRecord;
use rayon::prelude::*;
use seqsmith_core::{SeqsmithError, SeqsmithResult};

fn require_nucleic(collection: &SeqCollection, what: &str) -> SeqsmithResult<()> {
    if collection.alphabet == Some(Alphabet::Protein) {
        return Err(SeqsmithError::Alphabet(format!(
            "{} requires nucleic acid sequences, not protein",
            what
        )));
    }
    Ok(())
}

/// Strip everything that is not a residue (stops, gaps, ambiguity beyond
/// N/X), uppercasing first.
pub fn clean_seq(collection: &mut SeqCollection) {
    let protein = collection.alphabet == Some(Alphabet::Protein);
    collection.records.par_iter_mut().for_each(|rec| {
        let cleaned: Vec<u8> = rec
            .seq
            .iter()
            .map(|b| b.to_ascii_uppercase())
            .filter(|b| {
                if protein {
                    matches!(b, b'A'..=b'Z') && !matches!(b, b'B' | b'J' | b'O' | b'U' | b'Z')
                } else {
                    matches!(b, b'A' | b'T' | b'G' | b'C' | b'X' | b'N' | b'U')
                }
            })
            .collect();
        rec.set_seq(cleaned);
    });
}

pub fn uppercase(collection: &mut SeqCollection) {
    collection
        .records
        .par_iter_mut()
        .for_each(|rec| rec.seq.make_ascii_uppercase());
}

pub fn lowercase(collection: &mut SeqCollection) {
    collection
        .records
        .par_iter_mut()
        .for_each(|rec| rec.seq.make_ascii_lowercase());
}

/// DNA -> RNA (T becomes U, case preserved)
pub fn transcribe(collection: &mut SeqCollection) -> SeqsmithResult<()> {
    if collection.alphabet != Some(Alphabet::Dna) {
        return Err(SeqsmithError::Alphabet(
            "transcription requires DNA sequences".to_string(),
        ));
    }
    for rec in &mut collection.records {
        for base in &mut rec.seq {
            *base = match *base {
                b'T' => b'U',
                b't' => b'u',
                other => other,
            };
        }
    }
    collection.alphabet = Some(Alphabet::Rna);
    Ok(())
}

/// RNA -> DNA (U becomes T, case preserved)
pub fn back_transcribe(collection: &mut SeqCollection) -> SeqsmithResult<()> {
    if collection.alphabet != Some(Alphabet::Rna) {
        return Err(SeqsmithError::Alphabet(
            "back-transcription requires RNA sequences".to_string(),
        ));
    }
    for rec in &mut collection.records {
        for base in &mut rec.seq {
            *base = match *base {
                b'U' => b'T',
                b'u' => b't',
                other => other,
            };
        }
    }
    collection.alphabet = Some(Alphabet::Dna);
    Ok(())
}

/// Complement in place (no reversal); feature coordinates are untouched.
pub fn complement(collection: &mut SeqCollection) -> SeqsmithResult<()> {
    require_nucleic(collection, "complement")?;
    let rna = collection.alphabet == Some(Alphabet::Rna);
    for rec in &mut collection.records {
        let complemented: Vec<u8> = rec
            .seq
            .iter()
            .map(|&b| {
                if rna {
                    bio::alphabets::rna::complement(b)
                } else {
                    bio::alphabets::dna::complement(b)
                }
            })
            .collect();
        rec.set_seq(complemented);
    }
    Ok(())
}

/// Reverse complement; feature locations are reflected through the sequence
/// end and strands flipped, so applying this twice restores the original.
pub fn reverse_complement(collection: &mut SeqCollection) -> SeqsmithResult<()> {
    require_nucleic(collection, "reverse complement")?;
    let rna = collection.alphabet == Some(Alphabet::Rna);
    for rec in &mut collection.records {
        let rc = if rna {
            bio::alphabets::rna::revcomp(&rec.seq)
        } else {
            bio::alphabets::dna::revcomp(&rec.seq)
        };
        rec.set_seq(rc);
        let seq_len = rec.len();
        for feat in &mut rec.features {
            feat.location = feature::reverse_complement_location(&feat.location, seq_len);
        }
    }
    Ok(())
}

/// Select a reading frame (1, 2, or 3) by dropping leading residues.
/// Features shift left with clamping at zero.
pub fn select_frame(collection: &mut SeqCollection, frame: usize) -> SeqsmithResult<()> {
    require_nucleic(collection, "select frame")?;
    if !(1..=3).contains(&frame) {
        return Err(SeqsmithError::InvalidInput(format!(
            "reading frame must be 1, 2, or 3 (got {})",
            frame
        )));
    }
    let offset = frame - 1;
    for rec in &mut collection.records {
        let seq_len = rec.len();
        for feat in &mut rec.features {
            feat.location = feature::shift_location(&feat.location, -(offset as isize), seq_len);
        }
        let trimmed = rec.seq[offset.min(rec.seq.len())..].to_vec();
        rec.set_seq(trimmed);
    }
    Ok(())
}

/// Concatenate every record into a single one. Each source record leaves a
/// span feature named after it (kind truncated to 15 characters), and its
/// own features are shifted into place.
pub fn concat_seqs(collection: &SeqCollection, clean: bool) -> SeqsmithResult<SeqCollection> {
    let mut source = collection.clone();
    if clean {
        clean_seq(&mut source);
    }

    let mut new_seq: Vec<u8> = Vec::new();
    let mut features: Vec<Feature> = Vec::new();
    for rec in &source.records {
        let offset = new_seq.len();
        let full_len = offset + rec.len();

        let kind: String = rec.id.chars().take(15).collect();
        let mut span = Feature::new(kind, Location::simple(offset, full_len, 1));
        span.qualifiers.push(("label".to_string(), rec.id.clone()));
        features.push(span);

        for feat in &rec.features {
            features.push(Feature {
                kind: feat.kind.clone(),
                location: feature::shift_location(&feat.location, offset as isize, full_len),
                qualifiers: feat.qualifiers.clone(),
            });
        }
        new_seq.extend_from_slice(&rec.seq);
    }

    let mut record = SeqRecord::new("concatenation", new_seq);
    record.features = features;
    let mut output = SeqCollection::from_records(vec![record]);
    output.out_format = SeqFormat::Genbank;
    Ok(output)
}

/// Extract a 1-based inclusive range from every record. Features are
/// clipped into the window; those falling outside are dropped.
pub fn extract_region(
    collection: &mut SeqCollection,
    start: isize,
    end: isize,
) -> SeqsmithResult<()> {
    let start = start.max(1) as usize;
    if end < start as isize {
        return Err(SeqsmithError::InvalidInput(
            "the end of the range is smaller than the start".to_string(),
        ));
    }
    let end = end as usize;
    let start0 = start - 1;

    for rec in &mut collection.records {
        let window_end = end.min(rec.len());
        let sub = if start0 >= rec.len() {
            Vec::new()
        } else {
            rec.seq[start0..window_end].to_vec()
        };
        rec.set_seq(sub);

        let annotation = format!("Sub-sequence extraction, from residue {} to {}", start, end);
        rec.description = Some(match &rec.description {
            Some(desc) => format!("{} {}", desc, annotation),
            None => annotation,
        });

        rec.features = rec
            .features
            .iter()
            .filter_map(|feat| {
                feature::clip_location(&feat.location, start0, end).map(|location| Feature {
                    kind: feat.kind.clone(),
                    location,
                    qualifiers: feat.qualifiers.clone(),
                })
            })
            .collect();
    }
    Ok(())
}

/// Which end `pull_ends` keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    Front,
    Rear,
}

impl std::str::FromStr for End {
    type Err = SeqsmithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" => Ok(End::Front),
            "rear" => Ok(End::Rear),
            other => Err(SeqsmithError::InvalidInput(format!(
                "pick 'front' or 'rear', not '{}'",
                other
            ))),
        }
    }
}

/// Keep only `amount` residues from the chosen end of every record.
pub fn pull_ends(collection: &mut SeqCollection, amount: usize, end: End) {
    for rec in &mut collection.records {
        let keep = amount.min(rec.len());
        let sub = match end {
            End::Front => rec.seq[..keep].to_vec(),
            End::Rear => rec.seq[rec.len() - keep..].to_vec(),
        };
        rec.set_seq(sub);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(seqs: &[(&str, &str)]) -> SeqCollection {
        SeqCollection::from_records(
            seqs.iter()
                .map(|(id, s)| SeqRecord::new(*id, s.as_bytes().to_vec()))
                .collect(),
        )
    }

    #[test]
    fn test_clean_nucleic() {
        let mut coll = collection(&[("a", "ac-gt*nn?RR")]);
        clean_seq(&mut coll);
        assert_eq!(coll.records[0].seq, b"ACGTNN");
    }

    #[test]
    fn test_clean_protein() {
        let mut coll = collection(&[("a", "MKL-VR*EWW.DPFE")]);
        coll.alphabet = Some(Alphabet::Protein);
        clean_seq(&mut coll);
        assert_eq!(coll.records[0].seq, b"MKLVREWWDPFE");
    }

    #[test]
    fn test_case_folding() {
        let mut coll = collection(&[("a", "AcGt")]);
        uppercase(&mut coll);
        assert_eq!(coll.records[0].seq, b"ACGT");
        lowercase(&mut coll);
        assert_eq!(coll.records[0].seq, b"acgt");
    }

    #[test]
    fn test_transcribe_roundtrip() {
        let mut coll = collection(&[("a", "ATGCatgc")]);
        transcribe(&mut coll).unwrap();
        assert_eq!(coll.records[0].seq, b"AUGCaugc");
        assert_eq!(coll.alphabet, Some(Alphabet::Rna));
        back_transcribe(&mut coll).unwrap();
        assert_eq!(coll.records[0].seq, b"ATGCatgc");
        assert_eq!(coll.alphabet, Some(Alphabet::Dna));
    }

    #[test]
    fn test_transcribe_rejects_rna() {
        let mut coll = collection(&[("a", "AUGC")]);
        assert!(transcribe(&mut coll).is_err());
    }

    #[test]
    fn test_complement() {
        let mut coll = collection(&[("a", "ATGC")]);
        complement(&mut coll).unwrap();
        assert_eq!(coll.records[0].seq, b"TACG");
    }

    #[test]
    fn test_complement_rejects_protein() {
        let mut coll = collection(&[("a", "MKLVREWWDPFE")]);
        assert!(complement(&mut coll).is_err());
    }

    #[test]
    fn test_reverse_complement_involution() {
        let mut coll = collection(&[("a", "ATGCCC")]);
        coll.records[0]
            .features
            .push(Feature::new("CDS", Location::simple(0, 3, 1)));
        let original = coll.records[0].clone();

        reverse_complement(&mut coll).unwrap();
        assert_eq!(coll.records[0].seq, b"GGGCAT");
        assert_eq!(
            coll.records[0].features[0].location,
            Location::simple(3, 6, -1)
        );

        reverse_complement(&mut coll).unwrap();
        assert_eq!(coll.records[0], original);
    }

    #[test]
    fn test_rna_reverse_complement() {
        let mut coll = collection(&[("a", "AUGGGG")]);
        reverse_complement(&mut coll).unwrap();
        assert_eq!(coll.records[0].seq, b"CCCCAU");
    }

    #[test]
    fn test_select_frame() {
        let mut coll = collection(&[("a", "ATGCCC")]);
        coll.records[0]
            .features
            .push(Feature::new("CDS", Location::simple(3, 6, 1)));
        select_frame(&mut coll, 2).unwrap();
        assert_eq!(coll.records[0].seq, b"TGCCC");
        assert_eq!(
            coll.records[0].features[0].location,
            Location::simple(2, 5, 1)
        );
    }

    #[test]
    fn test_select_frame_one_is_identity() {
        let mut coll = collection(&[("a", "ATGCCC")]);
        select_frame(&mut coll, 1).unwrap();
        assert_eq!(coll.records[0].seq, b"ATGCCC");
    }

    #[test]
    fn test_select_frame_validates() {
        let mut coll = collection(&[("a", "ATGCCC")]);
        assert!(select_frame(&mut coll, 4).is_err());
    }

    #[test]
    fn test_concat_seqs() {
        let mut coll = collection(&[("first", "ATGAAA"), ("second", "CCCGGG")]);
        coll.records[1]
            .features
            .push(Feature::new("CDS", Location::simple(0, 3, 1)));
        let output = concat_seqs(&coll, false).unwrap();
        assert_eq!(output.len(), 1);
        let rec = &output.records[0];
        assert_eq!(rec.id, "concatenation");
        assert_eq!(rec.seq, b"ATGAAACCCGGG");
        // Two span features plus the shifted CDS
        assert_eq!(rec.features.len(), 3);
        assert_eq!(rec.features[1].location, Location::simple(6, 12, 1));
        assert_eq!(rec.features[2].location, Location::simple(6, 9, 1));
    }

    #[test]
    fn test_extract_region() {
        let mut coll = collection(&[("a", "ATGCCCGGG")]);
        coll.records[0]
            .features
            .push(Feature::new("CDS", Location::simple(0, 6, 1)));
        extract_region(&mut coll, 4, 9).unwrap();
        assert_eq!(coll.records[0].seq, b"CCCGGG");
        assert_eq!(
            coll.records[0].features[0].location,
            Location::simple(0, 3, 1)
        );
        assert!(coll.records[0]
            .description
            .as_deref()
            .unwrap()
            .contains("from residue 4 to 9"));
    }

    #[test]
    fn test_extract_region_rejects_backwards() {
        let mut coll = collection(&[("a", "ATGCCCGGG")]);
        assert!(extract_region(&mut coll, 5, 2).is_err());
    }

    #[test]
    fn test_pull_ends() {
        let mut coll = collection(&[("a", "ATGCCCGGG")]);
        pull_ends(&mut coll, 3, End::Front);
        assert_eq!(coll.records[0].seq, b"ATG");

        let mut coll = collection(&[("a", "ATGCCCGGG")]);
        pull_ends(&mut coll, 3, End::Rear);
        assert_eq!(coll.records[0].seq, b"GGG");
    }

    #[test]
    fn test_pull_ends_longer_than_sequence() {
        let mut coll = collection(&[("a", "ATG")]);
        pull_ends(&mut coll, 10, End::Rear);
        assert_eq!(coll.records[0].seq, b"ATG");
    }
}
