//! Genetic code and codon-usage tables.
//!
//! The translation table is the NCBI standard code (table 1), expanded from
//! the compact 64-character NCBI string. Codon-usage frequencies are
//! Kazusa-derived per-organism tables used by back-translation.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// A genetic code table for translating codons to amino acids.
#[derive(Debug, Clone)]
pub struct GeneticCode {
    pub id: u8,
    pub name: &'static str,
    codon_table: HashMap<[u8; 3], u8>,
    start_codons: Vec<[u8; 3]>,
    stop_codons: Vec<[u8; 3]>,
}

impl GeneticCode {
    /// Expand an NCBI-format 64-character amino acid string.
    ///
    /// Codon order is TTT, TTC, TTA, TTG, TCT, ... (bases cycle T, C, A, G
    /// from the first position outward).
    fn new(id: u8, name: &'static str, ncbieaa: &str, starts: &[&str]) -> Self {
        const BASES: [u8; 4] = [b'T', b'C', b'A', b'G'];
        let mut codon_table = HashMap::with_capacity(64);
        let mut stop_codons = Vec::new();
        let mut aa = ncbieaa.bytes();

        for b1 in BASES {
            for b2 in BASES {
                for b3 in BASES {
                    let codon = [b1, b2, b3];
                    let residue = aa.next().unwrap_or(b'X');
                    if residue == b'*' {
                        stop_codons.push(codon);
                    }
                    codon_table.insert(codon, residue);
                }
            }
        }

        let start_codons = starts
            .iter()
            .map(|s| {
                let b = s.as_bytes();
                [b[0], b[1], b[2]]
            })
            .collect();

        Self {
            id,
            name,
            codon_table,
            start_codons,
            stop_codons,
        }
    }

    /// The standard genetic code (NCBI table 1)
    pub fn standard() -> &'static GeneticCode {
        &STANDARD_CODE
    }

    /// Translate one codon. U is accepted in place of T; anything not in the
    /// table (ambiguity codes, gaps) yields None.
    pub fn translate_codon(&self, codon: &[u8]) -> Option<u8> {
        if codon.len() != 3 {
            return None;
        }
        let key = [
            normalize_base(codon[0]),
            normalize_base(codon[1]),
            normalize_base(codon[2]),
        ];
        self.codon_table.get(&key).copied()
    }

    pub fn is_start_codon(&self, codon: &[u8]) -> bool {
        normalized(codon).is_some_and(|c| self.start_codons.contains(&c))
    }

    pub fn is_stop_codon(&self, codon: &[u8]) -> bool {
        normalized(codon).is_some_and(|c| self.stop_codons.contains(&c))
    }
}

fn normalize_base(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'U' => b'T',
        b => b,
    }
}

fn normalized(codon: &[u8]) -> Option<[u8; 3]> {
    if codon.len() != 3 {
        return None;
    }
    Some([
        normalize_base(codon[0]),
        normalize_base(codon[1]),
        normalize_base(codon[2]),
    ])
}

lazy_static! {
    static ref STANDARD_CODE: GeneticCode = GeneticCode::new(
        1,
        "Standard",
        "FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
        &["TTG", "CTG", "ATG"],
    );
}

/// One amino acid's codon options: (codon, usage frequency). Frequencies in
/// a row sum to ~1.0.
pub type CodonRow = &'static [(&'static str, f64)];

/// A per-organism codon-usage table keyed by amino acid (one-letter code,
/// '*' for stop, 'X' for unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageTable {
    Human,
    Mouse,
    Ecoli,
    Yeast,
    Uniform,
}

impl UsageTable {
    pub fn from_species(species: &str) -> Option<UsageTable> {
        match species.to_ascii_uppercase().as_str() {
            "HUMAN" | "H" => Some(UsageTable::Human),
            "MOUSE" | "M" => Some(UsageTable::Mouse),
            "ECOLI" | "E" => Some(UsageTable::Ecoli),
            "YEAST" | "Y" => Some(UsageTable::Yeast),
            _ => None,
        }
    }

    /// Codon options for an amino acid, or None for residues outside the
    /// 20+stop+X vocabulary.
    pub fn row(&self, amino_acid: u8) -> Option<CodonRow> {
        let table: &[(u8, CodonRow)] = match self {
            UsageTable::Human => &HUMAN,
            UsageTable::Mouse => &MOUSE,
            UsageTable::Ecoli => &ECOLI,
            UsageTable::Yeast => &YEAST,
            UsageTable::Uniform => &UNIFORM,
        };
        table
            .iter()
            .find(|(aa, _)| *aa == amino_acid.to_ascii_uppercase())
            .map(|(_, row)| *row)
    }

    /// The single most frequent codon for an amino acid ("optimized" mode)
    pub fn best_codon(&self, amino_acid: u8) -> Option<&'static str> {
        self.row(amino_acid)?
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(codon, _)| *codon)
    }
}

// Homo sapiens (taxid 9606)
static HUMAN: [(u8, CodonRow); 22] = [
    (b'A', &[("GCT", 0.27), ("GCC", 0.40), ("GCA", 0.23), ("GCG", 0.11)]),
    (b'C', &[("TGT", 0.46), ("TGC", 0.54)]),
    (b'D', &[("GAT", 0.46), ("GAC", 0.54)]),
    (b'E', &[("GAA", 0.42), ("GAG", 0.58)]),
    (b'F', &[("TTT", 0.46), ("TTC", 0.54)]),
    (b'G', &[("GGT", 0.16), ("GGC", 0.34), ("GGA", 0.25), ("GGG", 0.25)]),
    (b'H', &[("CAT", 0.42), ("CAC", 0.58)]),
    (b'I', &[("ATT", 0.36), ("ATC", 0.47), ("ATA", 0.17)]),
    (b'K', &[("AAA", 0.43), ("AAG", 0.57)]),
    (
        b'L',
        &[
            ("TTA", 0.08),
            ("TTG", 0.13),
            ("CTT", 0.13),
            ("CTC", 0.20),
            ("CTA", 0.07),
            ("CTG", 0.40),
        ],
    ),
    (b'M', &[("ATG", 1.00)]),
    (b'N', &[("AAT", 0.47), ("AAC", 0.53)]),
    (b'P', &[("CCT", 0.29), ("CCC", 0.32), ("CCA", 0.28), ("CCG", 0.11)]),
    (b'Q', &[("CAA", 0.27), ("CAG", 0.73)]),
    (
        b'R',
        &[
            ("CGT", 0.08),
            ("CGC", 0.18),
            ("CGA", 0.11),
            ("CGG", 0.20),
            ("AGA", 0.21),
            ("AGG", 0.21),
        ],
    ),
    (
        b'S',
        &[
            ("TCT", 0.19),
            ("TCC", 0.22),
            ("TCA", 0.15),
            ("TCG", 0.05),
            ("AGT", 0.15),
            ("AGC", 0.24),
        ],
    ),
    (b'*', &[("TAA", 0.30), ("TGA", 0.47), ("TAG", 0.24)]),
    (b'T', &[("ACT", 0.25), ("ACC", 0.36), ("ACA", 0.28), ("ACG", 0.11)]),
    (b'V', &[("GTT", 0.18), ("GTC", 0.24), ("GTA", 0.12), ("GTG", 0.46)]),
    (b'W', &[("TGG", 1.00)]),
    (b'Y', &[("TAT", 0.44), ("TAC", 0.56)]),
    (b'X', &[("NNN", 1.0)]),
];

// Mus musculus (taxid 10090)
static MOUSE: [(u8, CodonRow); 22] = [
    (b'A', &[("GCT", 0.29), ("GCC", 0.38), ("GCA", 0.23), ("GCG", 0.09)]),
    (b'C', &[("TGT", 0.48), ("TGC", 0.52)]),
    (b'D', &[("GAT", 0.45), ("GAC", 0.55)]),
    (b'E', &[("GAA", 0.41), ("GAG", 0.59)]),
    (b'F', &[("TTT", 0.44), ("TTC", 0.56)]),
    (b'G', &[("GGT", 0.18), ("GGC", 0.33), ("GGA", 0.26), ("GGG", 0.23)]),
    (b'H', &[("CAT", 0.41), ("CAC", 0.59)]),
    (b'I', &[("ATT", 0.34), ("ATC", 0.50), ("ATA", 0.16)]),
    (b'K', &[("AAA", 0.39), ("AAG", 0.61)]),
    (
        b'L',
        &[
            ("TTA", 0.07),
            ("TTG", 0.13),
            ("CTT", 0.13),
            ("CTC", 0.20),
            ("CTA", 0.08),
            ("CTG", 0.39),
        ],
    ),
    (b'M', &[("ATG", 1.00)]),
    (b'N', &[("AAT", 0.43), ("AAC", 0.57)]),
    (b'P', &[("CCT", 0.31), ("CCC", 0.30), ("CCA", 0.29), ("CCG", 0.10)]),
    (b'Q', &[("CAA", 0.26), ("CAG", 0.74)]),
    (
        b'R',
        &[
            ("CGT", 0.08),
            ("CGC", 0.17),
            ("CGA", 0.12),
            ("CGG", 0.19),
            ("AGA", 0.22),
            ("AGG", 0.22),
        ],
    ),
    (
        b'S',
        &[
            ("TCT", 0.20),
            ("TCC", 0.22),
            ("TCA", 0.14),
            ("TCG", 0.05),
            ("AGT", 0.15),
            ("AGC", 0.24),
        ],
    ),
    (b'*', &[("TAA", 0.28), ("TGA", 0.49), ("TAG", 0.23)]),
    (b'T', &[("ACT", 0.25), ("ACC", 0.35), ("ACA", 0.29), ("ACG", 0.10)]),
    (b'V', &[("GTT", 0.17), ("GTC", 0.25), ("GTA", 0.12), ("GTG", 0.46)]),
    (b'W', &[("TGG", 1.00)]),
    (b'Y', &[("TAT", 0.43), ("TAC", 0.57)]),
    (b'X', &[("NNN", 1.0)]),
];

// Escherichia coli O157:H7 EDL933 (taxid 155864)
static ECOLI: [(u8, CodonRow); 22] = [
    (b'A', &[("GCT", 0.16), ("GCC", 0.27), ("GCA", 0.22), ("GCG", 0.35)]),
    (b'C', &[("TGT", 0.45), ("TGC", 0.55)]),
    (b'D', &[("GAT", 0.63), ("GAC", 0.37)]),
    (b'E', &[("GAA", 0.68), ("GAG", 0.32)]),
    (b'F', &[("TTT", 0.58), ("TTC", 0.42)]),
    (b'G', &[("GGT", 0.33), ("GGC", 0.39), ("GGA", 0.12), ("GGG", 0.16)]),
    (b'H', &[("CAT", 0.58), ("CAC", 0.42)]),
    (b'I', &[("ATT", 0.50), ("ATC", 0.40), ("ATA", 0.09)]),
    (b'K', &[("AAA", 0.76), ("AAG", 0.24)]),
    (
        b'L',
        &[
            ("TTA", 0.13),
            ("TTG", 0.13),
            ("CTT", 0.11),
            ("CTC", 0.10),
            ("CTA", 0.04),
            ("CTG", 0.49),
        ],
    ),
    (b'M', &[("ATG", 1.00)]),
    (b'N', &[("AAT", 0.47), ("AAC", 0.53)]),
    (b'P', &[("CCT", 0.17), ("CCC", 0.13), ("CCA", 0.19), ("CCG", 0.51)]),
    (b'Q', &[("CAA", 0.33), ("CAG", 0.67)]),
    (
        b'R',
        &[
            ("CGT", 0.36),
            ("CGC", 0.37),
            ("CGA", 0.07),
            ("CGG", 0.11),
            ("AGA", 0.05),
            ("AGG", 0.03),
        ],
    ),
    (
        b'S',
        &[
            ("TCT", 0.14),
            ("TCC", 0.15),
            ("TCA", 0.14),
            ("TCG", 0.15),
            ("AGT", 0.16),
            ("AGC", 0.27),
        ],
    ),
    (b'*', &[("TAA", 0.59), ("TGA", 0.33), ("TAG", 0.08)]),
    (b'T', &[("ACT", 0.17), ("ACC", 0.41), ("ACA", 0.15), ("ACG", 0.27)]),
    (b'V', &[("GTT", 0.26), ("GTC", 0.21), ("GTA", 0.16), ("GTG", 0.37)]),
    (b'W', &[("TGG", 1.00)]),
    (b'Y', &[("TAT", 0.57), ("TAC", 0.43)]),
    (b'X', &[("NNN", 1.0)]),
];

// Saccharomyces cerevisiae (taxid 4932)
static YEAST: [(u8, CodonRow); 22] = [
    (b'A', &[("GCT", 0.38), ("GCC", 0.22), ("GCA", 0.29), ("GCG", 0.11)]),
    (b'C', &[("TGT", 0.63), ("TGC", 0.37)]),
    (b'D', &[("GAT", 0.65), ("GAC", 0.35)]),
    (b'E', &[("GAA", 0.70), ("GAG", 0.30)]),
    (b'F', &[("TTT", 0.59), ("TTC", 0.41)]),
    (b'G', &[("GGT", 0.47), ("GGC", 0.19), ("GGA", 0.22), ("GGG", 0.12)]),
    (b'H', &[("CAT", 0.64), ("CAC", 0.36)]),
    (b'I', &[("ATT", 0.46), ("ATC", 0.26), ("ATA", 0.27)]),
    (b'K', &[("AAA", 0.58), ("AAG", 0.42)]),
    (
        b'L',
        &[
            ("TTA", 0.28),
            ("TTG", 0.29),
            ("CTT", 0.13),
            ("CTC", 0.06),
            ("CTA", 0.14),
            ("CTG", 0.11),
        ],
    ),
    (b'M', &[("ATG", 1.00)]),
    (b'N', &[("AAT", 0.59), ("AAC", 0.41)]),
    (b'P', &[("CCT", 0.31), ("CCC", 0.15), ("CCA", 0.42), ("CCG", 0.12)]),
    (b'Q', &[("CAA", 0.69), ("CAG", 0.31)]),
    (
        b'R',
        &[
            ("CGT", 0.14),
            ("CGC", 0.06),
            ("CGA", 0.07),
            ("CGG", 0.04),
            ("AGA", 0.48),
            ("AGG", 0.21),
        ],
    ),
    (
        b'S',
        &[
            ("TCT", 0.26),
            ("TCC", 0.16),
            ("TCA", 0.21),
            ("TCG", 0.10),
            ("AGT", 0.16),
            ("AGC", 0.11),
        ],
    ),
    (b'*', &[("TAA", 0.47), ("TGA", 0.30), ("TAG", 0.23)]),
    (b'T', &[("ACT", 0.35), ("ACC", 0.22), ("ACA", 0.30), ("ACG", 0.14)]),
    (b'V', &[("GTT", 0.39), ("GTC", 0.21), ("GTA", 0.21), ("GTG", 0.19)]),
    (b'W', &[("TGG", 1.00)]),
    (b'Y', &[("TAT", 0.56), ("TAC", 0.44)]),
    (b'X', &[("NNN", 1.0)]),
];

// Uniform sampling over synonymous codons
static UNIFORM: [(u8, CodonRow); 22] = [
    (b'A', &[("GCT", 0.25), ("GCC", 0.25), ("GCA", 0.25), ("GCG", 0.25)]),
    (b'C', &[("TGT", 0.5), ("TGC", 0.5)]),
    (b'D', &[("GAT", 0.5), ("GAC", 0.5)]),
    (b'E', &[("GAA", 0.5), ("GAG", 0.5)]),
    (b'F', &[("TTT", 0.5), ("TTC", 0.5)]),
    (b'G', &[("GGT", 0.25), ("GGC", 0.25), ("GGA", 0.25), ("GGG", 0.25)]),
    (b'H', &[("CAT", 0.5), ("CAC", 0.5)]),
    (b'I', &[("ATT", 0.3333), ("ATC", 0.3333), ("ATA", 0.3334)]),
    (b'K', &[("AAA", 0.5), ("AAG", 0.5)]),
    (
        b'L',
        &[
            ("TTA", 0.167),
            ("TTG", 0.167),
            ("CTT", 0.167),
            ("CTC", 0.167),
            ("CTA", 0.166),
            ("CTG", 0.166),
        ],
    ),
    (b'M', &[("ATG", 1.00)]),
    (b'N', &[("AAT", 0.5), ("AAC", 0.5)]),
    (b'P', &[("CCT", 0.25), ("CCC", 0.25), ("CCA", 0.25), ("CCG", 0.25)]),
    (b'Q', &[("CAA", 0.5), ("CAG", 0.5)]),
    (
        b'R',
        &[
            ("CGT", 0.167),
            ("CGC", 0.167),
            ("CGA", 0.167),
            ("CGG", 0.167),
            ("AGA", 0.166),
            ("AGG", 0.166),
        ],
    ),
    (
        b'S',
        &[
            ("TCT", 0.167),
            ("TCC", 0.167),
            ("TCA", 0.167),
            ("TCG", 0.167),
            ("AGT", 0.166),
            ("AGC", 0.166),
        ],
    ),
    (b'*', &[("TAA", 0.3333), ("TGA", 0.3333), ("TAG", 0.3334)]),
    (b'T', &[("ACT", 0.25), ("ACC", 0.25), ("ACA", 0.25), ("ACG", 0.25)]),
    (b'V', &[("GTT", 0.25), ("GTC", 0.25), ("GTA", 0.25), ("GTG", 0.25)]),
    (b'W', &[("TGG", 1.00)]),
    (b'Y', &[("TAT", 0.5), ("TAC", 0.5)]),
    (b'X', &[("NNN", 1.0)]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_code_basics() {
        let code = GeneticCode::standard();
        assert_eq!(code.translate_codon(b"ATG"), Some(b'M'));
        assert_eq!(code.translate_codon(b"TGG"), Some(b'W'));
        assert_eq!(code.translate_codon(b"TAA"), Some(b'*'));
        assert_eq!(code.translate_codon(b"TGA"), Some(b'*'));
        assert_eq!(code.translate_codon(b"TAG"), Some(b'*'));
    }

    #[test]
    fn test_rna_codons_accepted() {
        let code = GeneticCode::standard();
        assert_eq!(code.translate_codon(b"AUG"), Some(b'M'));
        assert_eq!(code.translate_codon(b"UUU"), Some(b'F'));
    }

    #[test]
    fn test_lowercase_codons_accepted() {
        let code = GeneticCode::standard();
        assert_eq!(code.translate_codon(b"atg"), Some(b'M'));
    }

    #[test]
    fn test_ambiguous_codon_is_none() {
        let code = GeneticCode::standard();
        assert_eq!(code.translate_codon(b"NNN"), None);
        assert_eq!(code.translate_codon(b"AT-"), None);
        assert_eq!(code.translate_codon(b"AT"), None);
    }

    #[test]
    fn test_start_and_stop_codons() {
        let code = GeneticCode::standard();
        assert!(code.is_start_codon(b"ATG"));
        assert!(code.is_start_codon(b"TTG"));
        assert!(code.is_start_codon(b"CTG"));
        assert!(!code.is_start_codon(b"GGG"));
        assert!(code.is_stop_codon(b"TGA"));
        assert!(!code.is_stop_codon(b"ATG"));
    }

    #[test]
    fn test_all_64_codons_covered() {
        let code = GeneticCode::standard();
        let bases = [b'T', b'C', b'A', b'G'];
        let mut count = 0;
        for b1 in bases {
            for b2 in bases {
                for b3 in bases {
                    assert!(code.translate_codon(&[b1, b2, b3]).is_some());
                    count += 1;
                }
            }
        }
        assert_eq!(count, 64);
    }

    #[test]
    fn test_best_codon_is_most_frequent() {
        assert_eq!(UsageTable::Human.best_codon(b'A'), Some("GCC"));
        assert_eq!(UsageTable::Ecoli.best_codon(b'K'), Some("AAA"));
        assert_eq!(UsageTable::Yeast.best_codon(b'R'), Some("AGA"));
        assert_eq!(UsageTable::Human.best_codon(b'W'), Some("TGG"));
    }

    #[test]
    fn test_usage_rows_sum_to_one() {
        for table in [
            UsageTable::Human,
            UsageTable::Mouse,
            UsageTable::Ecoli,
            UsageTable::Yeast,
            UsageTable::Uniform,
        ] {
            for aa in b"ACDEFGHIKLMNPQRSTVWY*X" {
                let row = table.row(*aa).unwrap();
                let total: f64 = row.iter().map(|(_, f)| f).sum();
                assert!(
                    (total - 1.0).abs() < 0.02,
                    "table {:?} residue {} sums to {}",
                    table,
                    *aa as char,
                    total
                );
            }
        }
    }

    #[test]
    fn test_species_lookup() {
        assert_eq!(UsageTable::from_species("human"), Some(UsageTable::Human));
        assert_eq!(UsageTable::from_species("E"), Some(UsageTable::Ecoli));
        assert_eq!(UsageTable::from_species("dog"), None);
    }
}
