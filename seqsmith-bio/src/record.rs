use crate::feature::Feature;
use serde::{Deserialize, Serialize};

/// A single sequence record: identifier, free-text metadata, residues, and
/// annotated features. Residue case is preserved as parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub seq: Vec<u8>,
    #[serde(default)]
    pub features: Vec<Feature>,
    /// Per-letter quality scores (FASTQ input only)
    #[serde(default)]
    pub quality: Option<Vec<u8>>,
}

impl SeqRecord {
    pub fn new(id: impl Into<String>, seq: Vec<u8>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: None,
            seq,
            features: Vec::new(),
            quality: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features = features;
        self
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Residues as a string (lossy on non-UTF8 bytes, which never occur in
    /// practice for sequence data)
    pub fn seq_str(&self) -> String {
        String::from_utf8_lossy(&self.seq).to_string()
    }

    /// Replace the residues, dropping any stale quality string
    pub fn set_seq(&mut self, seq: Vec<u8>) {
        if self
            .quality
            .as_ref()
            .is_some_and(|q| q.len() != seq.len())
        {
            self.quality = None;
        }
        self.seq = seq;
    }

    /// FASTA-style header line (without the leading '>')
    pub fn header(&self) -> String {
        match &self.description {
            Some(desc) if !desc.is_empty() => format!("{} {}", self.id, desc),
            _ => self.id.clone(),
        }
    }

    /// Rename the record, keeping id and name in sync
    pub fn rename(&mut self, new_id: impl Into<String>) {
        let new_id = new_id.into();
        self.name = new_id.clone();
        self.id = new_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_syncs_name() {
        let rec = SeqRecord::new("seq1", b"ACGT".to_vec());
        assert_eq!(rec.id, "seq1");
        assert_eq!(rec.name, "seq1");
        assert_eq!(rec.len(), 4);
        assert!(rec.description.is_none());
    }

    #[test]
    fn test_header_with_description() {
        let rec = SeqRecord::new("seq1", b"ACGT".to_vec()).with_description("test protein");
        assert_eq!(rec.header(), "seq1 test protein");
    }

    #[test]
    fn test_header_without_description() {
        let rec = SeqRecord::new("seq1", b"ACGT".to_vec());
        assert_eq!(rec.header(), "seq1");
    }

    #[test]
    fn test_set_seq_invalidates_quality() {
        let mut rec = SeqRecord::new("r", b"ACGT".to_vec());
        rec.quality = Some(b"IIII".to_vec());
        rec.set_seq(b"ACG".to_vec());
        assert!(rec.quality.is_none());
    }

    #[test]
    fn test_rename_keeps_name_in_sync() {
        let mut rec = SeqRecord::new("old", b"A".to_vec());
        rec.rename("new");
        assert_eq!(rec.id, "new");
        assert_eq!(rec.name, "new");
    }
}
