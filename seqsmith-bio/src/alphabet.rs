use crate::record::SeqRecord;
use serde::{Deserialize, Serialize};

/// Residue vocabulary classification for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alphabet {
    Dna,
    Rna,
    Protein,
}

impl Alphabet {
    pub fn is_nucleic(self) -> bool {
        matches!(self, Alphabet::Dna | Alphabet::Rna)
    }

    /// Short form used by the CLI (`-ga` output)
    pub fn short_name(self) -> &'static str {
        match self {
            Alphabet::Dna => "dna",
            Alphabet::Rna => "rna",
            Alphabet::Protein => "prot",
        }
    }
}

impl std::fmt::Display for Alphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Number of residues sampled before the composition is thresholded.
const SAMPLE_LIMIT: usize = 1000;

/// Guess the alphabet from residue composition.
///
/// Samples residues across records (skipping N, X, gaps, and '?') until just
/// past SAMPLE_LIMIT characters, then thresholds: >95% ACGTU means nucleic
/// acid (RNA when the U fraction exceeds 5%, DNA otherwise), anything else is
/// protein. Ambiguity codes beyond N are not handled; this is a heuristic,
/// not a classification guarantee. Deterministic for a fixed input.
pub fn guess_alphabet(records: &[SeqRecord]) -> Option<Alphabet> {
    let mut sample = Vec::new();
    for rec in records {
        if sample.len() > SAMPLE_LIMIT {
            break;
        }
        sample.extend(
            rec.seq
                .iter()
                .map(|c| c.to_ascii_uppercase())
                .filter(|c| !matches!(c, b'N' | b'X' | b'-' | b'?')),
        );
    }

    if sample.is_empty() {
        return None;
    }

    let len = sample.len() as f64;
    let nucleic = sample
        .iter()
        .filter(|c| matches!(c, b'A' | b'C' | b'G' | b'T' | b'U'))
        .count() as f64;

    if nucleic / len > 0.95 {
        let uracil = sample.iter().filter(|&&c| c == b'U').count() as f64;
        if uracil / len > 0.05 {
            Some(Alphabet::Rna)
        } else {
            Some(Alphabet::Dna)
        }
    } else {
        Some(Alphabet::Protein)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(seq: &str) -> SeqRecord {
        SeqRecord::new("test", seq.as_bytes().to_vec())
    }

    #[test]
    fn test_guess_dna() {
        assert_eq!(
            guess_alphabet(&[rec("ATGCATGCATGC")]),
            Some(Alphabet::Dna)
        );
    }

    #[test]
    fn test_guess_rna() {
        assert_eq!(
            guess_alphabet(&[rec("AUGCAUGCAUGC")]),
            Some(Alphabet::Rna)
        );
    }

    #[test]
    fn test_guess_protein() {
        assert_eq!(
            guess_alphabet(&[rec("MKLVREWWDPFE")]),
            Some(Alphabet::Protein)
        );
    }

    #[test]
    fn test_gaps_and_ambiguity_skipped() {
        // All skippable characters plus a handful of nucleotides
        assert_eq!(
            guess_alphabet(&[rec("NNNN----????XXatgc")]),
            Some(Alphabet::Dna)
        );
    }

    #[test]
    fn test_empty_sample_is_none() {
        assert_eq!(guess_alphabet(&[rec("NNN---")]), None);
        assert_eq!(guess_alphabet(&[]), None);
    }

    #[test]
    fn test_deterministic_across_calls() {
        let records = vec![rec("ATGC".repeat(600).as_str())];
        let first = guess_alphabet(&records);
        for _ in 0..5 {
            assert_eq!(guess_alphabet(&records), first);
        }
    }

    #[test]
    fn test_mostly_nucleic_with_protein_tail() {
        // Protein sequence rich in ACGT-like residues still crosses into
        // protein when enough non-ACGTU residues are present
        assert_eq!(
            guess_alphabet(&[rec("ACGTACGTLLLLLLLL")]),
            Some(Alphabet::Protein)
        );
    }
}
