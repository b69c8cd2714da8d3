//! CDS translation (with the bounded repair loop), six-frame translation,
//! and codon-usage back-translation.

use crate::alphabet::Alphabet;
use crate::codon::{GeneticCode, UsageTable};
use crate::collection::{self, SeqCollection};
use crate::transform;
use rand::Rng;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::fmt;

/// The error classes the repair loop knows how to patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    NotMultipleOfThree(usize),
    NotAStartCodon(String),
    NotAStopCodon(String),
    InvalidCodon(String),
    InternalStop(usize),
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::NotMultipleOfThree(len) => {
                write!(f, "Sequence length {} is not a multiple of three", len)
            }
            TranslationError::NotAStartCodon(codon) => {
                write!(f, "First codon '{}' is not a start codon", codon)
            }
            TranslationError::NotAStopCodon(codon) => {
                write!(f, "Final codon '{}' is not a stop codon", codon)
            }
            TranslationError::InvalidCodon(codon) => {
                write!(f, "Codon '{}' is invalid", codon)
            }
            TranslationError::InternalStop(_) => {
                write!(f, "Extra in frame stop codon found")
            }
        }
    }
}

const IUPAC_NUCLEOTIDES: &[u8] = b"ACGTURYSWKMBDHVN";

fn is_iupac(base: u8) -> bool {
    IUPAC_NUCLEOTIDES.contains(&base.to_ascii_uppercase())
}

/// Translate one codon: exact codons via the table, IUPAC-ambiguous codons
/// to 'X', anything else (gaps, non-nucleotide letters) is an error.
fn codon_to_aa(codon: &[u8], code: &GeneticCode) -> Result<u8, TranslationError> {
    if let Some(aa) = code.translate_codon(codon) {
        return Ok(aa);
    }
    if codon.len() == 3 && codon.iter().all(|&b| is_iupac(b)) {
        return Ok(b'X');
    }
    Err(TranslationError::InvalidCodon(codon_string(codon)))
}

fn codon_string(codon: &[u8]) -> String {
    String::from_utf8_lossy(codon).to_uppercase()
}

/// Plain translation: codon-by-codon, stops as '*', trailing partial codon
/// ignored, untranslatable codons as 'X'.
pub fn translate_residues(seq: &[u8], code: &GeneticCode) -> Vec<u8> {
    seq.chunks_exact(3)
        .map(|codon| codon_to_aa(codon, code).unwrap_or(b'X'))
        .collect()
}

/// Strict CDS translation. Requires a start codon (translated as M), a
/// single terminal stop, no internal stops, and a length that is a multiple
/// of three. Returns the protein without the trailing stop.
pub fn translate_cds_strict(
    seq: &[u8],
    code: &GeneticCode,
) -> Result<Vec<u8>, TranslationError> {
    if seq.is_empty() || seq.len() % 3 != 0 {
        return Err(TranslationError::NotMultipleOfThree(seq.len()));
    }

    let first = &seq[..3];
    if !code.is_start_codon(first) {
        return Err(TranslationError::NotAStartCodon(codon_string(first)));
    }

    let last = &seq[seq.len() - 3..];
    if !code.is_stop_codon(last) {
        return Err(TranslationError::NotAStopCodon(codon_string(last)));
    }

    let mut protein = vec![b'M'];
    let n_codons = seq.len() / 3;
    for i in 1..n_codons - 1 {
        let codon = &seq[i * 3..i * 3 + 3];
        if code.is_stop_codon(codon) {
            return Err(TranslationError::InternalStop(i));
        }
        protein.push(codon_to_aa(codon, code)?);
    }
    Ok(protein)
}

/// Replace the first occurrence of `pattern` (case-insensitive) in `seq`
/// with NNN. Returns whether a substitution happened.
fn substitute_first(seq: &mut Vec<u8>, pattern: &[u8]) -> bool {
    let upper: Vec<u8> = seq.iter().map(|b| b.to_ascii_uppercase()).collect();
    let pat: Vec<u8> = pattern.iter().map(|b| b.to_ascii_uppercase()).collect();
    if let Some(pos) = upper.windows(pat.len()).position(|w| w == pat.as_slice()) {
        seq.splice(pos..pos + pat.len(), b"NNN".iter().copied());
        true
    } else {
        false
    }
}

/// Replace every codon-aligned internal stop with NNN.
fn mask_internal_stops(seq: &mut [u8], code: &GeneticCode) {
    let n_codons = seq.len() / 3;
    if n_codons < 2 {
        return;
    }
    for i in 0..n_codons - 1 {
        let codon = &seq[i * 3..i * 3 + 3];
        if code.is_stop_codon(codon) {
            seq[i * 3..i * 3 + 3].copy_from_slice(b"NNN");
        }
    }
}

/// Repair-and-retry CDS translation of every record.
///
/// Patches applied on specific error classes, mirroring what a curator
/// would do by hand: trim a non-multiple-of-three overhang (kept on the
/// record), swap a bad first codon for ATG (scratch copy only), append a
/// TGA when the terminal stop is missing (scratch copy only), mask an
/// invalid codon with NNN (kept), and mask internal stops (scratch copy
/// only). The loop ends when strict translation succeeds or no patch rule
/// applies; the record is then plain-translated with whatever patches were
/// kept, so products may legitimately lack a leading M or carry '*'s.
///
/// DNA feature annotations are mapped onto the protein products.
pub fn translate_cds(collection: &SeqCollection, quiet: bool) -> SeqsmithResult<SeqCollection> {
    if collection.alphabet == Some(Alphabet::Protein) {
        return Err(SeqsmithError::Alphabet(
            "translation requires nucleotide sequences, not protein".to_string(),
        ));
    }
    let code = GeneticCode::standard();

    let mut translation = collection.clone();
    for rec in &mut translation.records {
        rec.features.clear();
        let mut scratch = rec.seq.clone();

        loop {
            let err = match translate_cds_strict(&scratch, code) {
                Ok(_) => break,
                Err(e) => e,
            };
            if !quiet {
                eprintln!("Warning: {} in {}", err, rec.id);
            }

            match err {
                TranslationError::NotMultipleOfThree(_) => {
                    let keep = scratch.len() - scratch.len() % 3;
                    scratch.truncate(keep);
                    let keep = rec.seq.len() - rec.seq.len() % 3;
                    rec.seq.truncate(keep);
                    if scratch.is_empty() {
                        break;
                    }
                }
                TranslationError::NotAStartCodon(_) => {
                    scratch.splice(..3, b"ATG".iter().copied());
                }
                TranslationError::NotAStopCodon(_) => {
                    scratch.extend_from_slice(b"TGA");
                }
                TranslationError::InvalidCodon(codon) => {
                    let patched = substitute_first(&mut scratch, codon.as_bytes());
                    substitute_first(&mut rec.seq, codon.as_bytes());
                    if !patched {
                        break;
                    }
                }
                TranslationError::InternalStop(_) => {
                    mask_internal_stops(&mut scratch, code);
                }
            }
        }

        rec.set_seq(translate_residues(&rec.seq, code));
    }
    translation.alphabet = Some(Alphabet::Protein);

    let mut mapped = collection::map_features_nucleotide_to_protein(collection, &translation)?;
    mapped.out_format = collection.out_format;
    Ok(mapped)
}

/// Translate all six reading frames of every record. Output ids carry the
/// frame suffix (_f1.._f3 forward, _rf1.._rf3 reverse), interleaved per
/// input record.
pub fn translate_six_frames(collection: &SeqCollection) -> SeqsmithResult<SeqCollection> {
    if collection.alphabet == Some(Alphabet::Protein) {
        return Err(SeqsmithError::Alphabet(
            "translation requires nucleotide sequences, not protein".to_string(),
        ));
    }

    let mut reverse = collection.clone();
    transform::reverse_complement(&mut reverse)?;

    let mut frames = Vec::with_capacity(6);
    for (source, tag) in [(collection, ""), (&reverse, "r")] {
        for frame in 1..=3u8 {
            let mut sub = source.clone();
            if frame > 1 {
                transform::select_frame(&mut sub, frame as usize)?;
            }
            let mut translated = translate_cds(&sub, true)?;
            for rec in &mut translated.records {
                let id = format!("{}_{}f{}", rec.id, tag, frame);
                rec.rename(id);
            }
            frames.push(translated);
        }
    }

    let n_records = collection.records.len();
    let mut output = Vec::with_capacity(n_records * 6);
    for i in 0..n_records {
        for frame in &frames {
            if let Some(rec) = frame.records.get(i) {
                output.push(rec.clone());
            }
        }
    }

    let mut result = SeqCollection::from_records(output);
    result.out_format = collection.out_format;
    Ok(result)
}

/// Codon selection strategy for back-translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackTranslateMode {
    /// Sample codons proportionally to their usage frequency
    Random,
    /// Always emit the most frequent codon (deterministic)
    Optimized,
}

impl BackTranslateMode {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RANDOM" | "R" => Some(BackTranslateMode::Random),
            "OPTIMIZED" | "O" => Some(BackTranslateMode::Optimized),
            _ => None,
        }
    }
}

fn sample_codon<R: Rng>(row: &[(&'static str, f64)], rng: &mut R) -> &'static str {
    let draw: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (codon, freq) in row {
        cumulative += freq;
        if cumulative >= draw {
            return codon;
        }
    }
    // Frequencies sum to ~1.0; fall back to the last codon on rounding slack
    row.last().map(|(c, _)| *c).unwrap_or("NNN")
}

/// Back-translate protein records into a plausible encoding DNA using the
/// given codon-usage table. Protein feature annotations are mapped onto the
/// DNA products (coordinates x3).
pub fn back_translate(
    collection: &SeqCollection,
    mode: BackTranslateMode,
    table: UsageTable,
) -> SeqsmithResult<SeqCollection> {
    back_translate_with_rng(collection, mode, table, &mut rand::thread_rng())
}

pub fn back_translate_with_rng<R: Rng>(
    collection: &SeqCollection,
    mode: BackTranslateMode,
    table: UsageTable,
    rng: &mut R,
) -> SeqsmithResult<SeqCollection> {
    if collection.alphabet != Some(Alphabet::Protein) {
        return Err(SeqsmithError::Alphabet(format!(
            "back-translation requires protein sequences, not {}",
            collection
                .alphabet
                .map(|a| a.to_string())
                .unwrap_or_else(|| "an undetermined alphabet".to_string())
        )));
    }

    let mut dna = collection.clone();
    for rec in &mut dna.records {
        rec.features.clear();
        let mut encoded = Vec::with_capacity(rec.seq.len() * 3);
        for &aa in &rec.seq {
            let row = table.row(aa).ok_or_else(|| {
                SeqsmithError::InvalidInput(format!(
                    "residue '{}' in {} has no codon table entry",
                    aa as char, rec.id
                ))
            })?;
            let codon = match mode {
                BackTranslateMode::Optimized => {
                    // row is non-empty by construction
                    table.best_codon(aa).unwrap_or("NNN")
                }
                BackTranslateMode::Random => sample_codon(row, rng),
            };
            encoded.extend_from_slice(codon.as_bytes());
        }
        rec.set_seq(encoded);
    }
    dna.alphabet = Some(Alphabet::Dna);

    let mut mapped = collection::map_features_protein_to_nucleotide(collection, &dna)?;
    mapped.out_format = collection.out_format;
    Ok(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SeqRecord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dna_collection(seqs: &[(&str, &str)]) -> SeqCollection {
        SeqCollection::from_records(
            seqs.iter()
                .map(|(id, s)| SeqRecord::new(*id, s.as_bytes().to_vec()))
                .collect(),
        )
    }

    #[test]
    fn test_strict_translation_success() {
        let code = GeneticCode::standard();
        let protein = translate_cds_strict(b"ATGAAATTTTGA", code).unwrap();
        assert_eq!(protein, b"MKF");
    }

    #[test]
    fn test_strict_rejects_bad_length() {
        let code = GeneticCode::standard();
        assert_eq!(
            translate_cds_strict(b"ATGAAATT", code),
            Err(TranslationError::NotMultipleOfThree(8))
        );
    }

    #[test]
    fn test_strict_rejects_missing_start() {
        let code = GeneticCode::standard();
        assert_eq!(
            translate_cds_strict(b"AAAAAATGA", code),
            Err(TranslationError::NotAStartCodon("AAA".to_string()))
        );
    }

    #[test]
    fn test_strict_rejects_missing_stop() {
        let code = GeneticCode::standard();
        assert_eq!(
            translate_cds_strict(b"ATGAAAAAA", code),
            Err(TranslationError::NotAStopCodon("AAA".to_string()))
        );
    }

    #[test]
    fn test_strict_rejects_internal_stop() {
        let code = GeneticCode::standard();
        assert_eq!(
            translate_cds_strict(b"ATGTGAAAATGA", code),
            Err(TranslationError::InternalStop(1))
        );
    }

    #[test]
    fn test_strict_rejects_invalid_codon() {
        let code = GeneticCode::standard();
        assert_eq!(
            translate_cds_strict(b"ATGA-AAAATGA", code),
            Err(TranslationError::InvalidCodon("A-A".to_string()))
        );
    }

    #[test]
    fn test_ambiguous_codon_translates_to_x() {
        let code = GeneticCode::standard();
        let protein = translate_cds_strict(b"ATGANATGA", code).unwrap();
        assert_eq!(protein, b"MX");
    }

    #[test]
    fn test_repair_loop_clean_cds() {
        let coll = dna_collection(&[("a", "ATGAAATTTTGA")]);
        let result = translate_cds(&coll, true).unwrap();
        assert_eq!(result.records[0].seq, b"MKF*");
    }

    #[test]
    fn test_repair_loop_trims_overhang() {
        // 14 residues: overhang of 2 is trimmed off the kept record too
        let coll = dna_collection(&[("a", "ATGAAATTTTGAGT")]);
        let result = translate_cds(&coll, true).unwrap();
        assert_eq!(result.records[0].seq, b"MKF*");
    }

    #[test]
    fn test_repair_loop_missing_start_keeps_original_first_residue() {
        // The ATG patch applies to the scratch copy; the final product is a
        // plain translation of the kept record, so the first residue stays K
        let coll = dna_collection(&[("a", "AAAAAATTTTGA")]);
        let result = translate_cds(&coll, true).unwrap();
        assert_eq!(result.records[0].seq, b"KKF*");
    }

    #[test]
    fn test_repair_loop_missing_stop() {
        let coll = dna_collection(&[("a", "ATGAAATTT")]);
        let result = translate_cds(&coll, true).unwrap();
        assert_eq!(result.records[0].seq, b"MKF");
    }

    #[test]
    fn test_repair_loop_internal_stop_kept_in_product() {
        // Internal stops are masked only on the scratch copy; the product of
        // the kept record shows '*' at that position
        let coll = dna_collection(&[("a", "ATGTGATTTTGA")]);
        let result = translate_cds(&coll, true).unwrap();
        assert_eq!(result.records[0].seq, b"M*F*");
    }

    #[test]
    fn test_repair_loop_invalid_codon_masked() {
        let coll = dna_collection(&[("a", "ATGA-ATTTTGA")]);
        let result = translate_cds(&coll, true).unwrap();
        assert_eq!(result.records[0].seq, b"MXF*");
    }

    #[test]
    fn test_translate_rejects_protein() {
        let mut coll = dna_collection(&[("a", "MKLVREWWDPFE")]);
        coll.alphabet = Some(Alphabet::Protein);
        assert!(translate_cds(&coll, true).is_err());
    }

    #[test]
    fn test_six_frames_ids_and_count() {
        let coll = dna_collection(&[("a", "ATGAAATTTTGA"), ("b", "ATGCCCGGGTGA")]);
        let result = translate_six_frames(&coll).unwrap();
        assert_eq!(result.records.len(), 12);
        let ids: Vec<&str> = result.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            &ids[..6],
            &["a_f1", "a_f2", "a_f3", "a_rf1", "a_rf2", "a_rf3"]
        );
        assert_eq!(ids[6], "b_f1");
    }

    #[test]
    fn test_back_translate_optimized_deterministic() {
        let mut coll = dna_collection(&[("p", "MKAW")]);
        coll.alphabet = Some(Alphabet::Protein);
        let result = back_translate(
            &coll,
            BackTranslateMode::Optimized,
            UsageTable::Ecoli,
        )
        .unwrap();
        // M=ATG, K=AAA (0.76), A=GCG (0.35), W=TGG
        assert_eq!(result.records[0].seq, b"ATGAAAGCGTGG");
        // Re-running produces the identical sequence
        let again = back_translate(&coll, BackTranslateMode::Optimized, UsageTable::Ecoli)
            .unwrap();
        assert_eq!(result.records[0].seq, again.records[0].seq);
    }

    #[test]
    fn test_back_translate_random_translates_back() {
        let mut coll = dna_collection(&[("p", "MKLVREWWDPFE")]);
        coll.alphabet = Some(Alphabet::Protein);
        let mut rng = StdRng::seed_from_u64(7);
        let result = back_translate_with_rng(
            &coll,
            BackTranslateMode::Random,
            UsageTable::Human,
            &mut rng,
        )
        .unwrap();
        let protein = translate_residues(&result.records[0].seq, GeneticCode::standard());
        assert_eq!(protein, b"MKLVREWWDPFE");
    }

    #[test]
    fn test_back_translate_rejects_dna() {
        let coll = dna_collection(&[("a", "ATGAAA")]);
        assert!(back_translate(&coll, BackTranslateMode::Random, UsageTable::Uniform).is_err());
    }

    #[test]
    fn test_back_translate_unknown_residue_is_error() {
        let mut coll = dna_collection(&[("p", "MK-W")]);
        coll.alphabet = Some(Alphabet::Protein);
        assert!(
            back_translate(&coll, BackTranslateMode::Optimized, UsageTable::Human).is_err()
        );
    }
}
