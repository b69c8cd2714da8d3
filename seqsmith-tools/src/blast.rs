//! BLAST family wrappers: database search, all-by-all pairwise search, and
//! the similarity purge built on top of it.

use crate::discovery::{self, identify_binary};
use anyhow::{bail, Context, Result};
use seqsmith_bio::alphabet::Alphabet;
use seqsmith_bio::collection::SeqCollection;
use seqsmith_bio::formats::{self, SeqFormat};
use seqsmith_core::Config;
use seqsmith_utils::TempWorkspace;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One row of tabular (`-outfmt 6`) BLAST output.
#[derive(Debug, Clone, PartialEq)]
pub struct HitSummary {
    pub query_id: String,
    pub subject_id: String,
    pub identity: f32,
    pub alignment_length: usize,
    pub mismatches: usize,
    pub gap_opens: usize,
    pub query_start: usize,
    pub query_end: usize,
    pub subject_start: usize,
    pub subject_end: usize,
    pub e_value: f64,
    pub bit_score: f32,
}

impl HitSummary {
    fn parse_line(line: &str) -> Option<HitSummary> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            return None;
        }
        Some(HitSummary {
            query_id: fields[0].to_string(),
            subject_id: fields[1].trim().to_string(),
            identity: fields[2].parse().ok()?,
            alignment_length: fields[3].parse().ok()?,
            mismatches: fields[4].parse().ok()?,
            gap_opens: fields[5].parse().ok()?,
            query_start: fields[6].parse().ok()?,
            query_end: fields[7].parse().ok()?,
            subject_start: fields[8].parse().ok()?,
            subject_end: fields[9].parse().ok()?,
            e_value: fields[10].parse().ok()?,
            bit_score: fields[11].trim().parse().ok()?,
        })
    }
}

/// Parse tabular output, skipping malformed lines.
pub fn parse_tabular(text: &str) -> Vec<HitSummary> {
    text.lines().filter_map(HitSummary::parse_line).collect()
}

/// Resolved locations of the BLAST binaries this process will use.
#[derive(Debug, Clone, Default)]
pub struct BlastBinaries {
    pub blastp: Option<PathBuf>,
    pub blastn: Option<PathBuf>,
    pub blastdbcmd: Option<PathBuf>,
}

impl BlastBinaries {
    /// Resolve binaries from, in order of precedence: free-form `-p`
    /// parameters (identified by probing `-version`), the configuration
    /// file, and finally PATH.
    pub fn discover(params: &[String]) -> Self {
        let mut found = BlastBinaries::default();
        for param in params {
            let path = PathBuf::from(param);
            if let Ok(kind) = identify_binary(&path) {
                match kind.as_str() {
                    "blastp" => found.blastp = Some(path),
                    "blastn" => found.blastn = Some(path),
                    "blastdbcmd" => found.blastdbcmd = Some(path),
                    _ => {}
                }
            }
        }

        let tools = &Config::global().tools;
        found.blastp = found
            .blastp
            .or_else(|| discovery::resolve(tools.blastp.as_deref(), &["blastp"]));
        found.blastn = found
            .blastn
            .or_else(|| discovery::resolve(tools.blastn.as_deref(), &["blastn"]));
        found.blastdbcmd = found
            .blastdbcmd
            .or_else(|| discovery::resolve(tools.blastdbcmd.as_deref(), &["blastdbcmd"]));
        found
    }

    /// The search binary appropriate for the collection's alphabet.
    fn search_binary(&self, alphabet: Option<Alphabet>) -> Result<(&Path, &'static str)> {
        if alphabet == Some(Alphabet::Protein) {
            match &self.blastp {
                Some(p) => Ok((p, "blastp")),
                None => bail!("blastp binary not found; set it explicitly with -p"),
            }
        } else {
            match &self.blastn {
                Some(p) => Ok((p, "blastn")),
                None => bail!("blastn binary not found; set it explicitly with -p"),
            }
        }
    }
}

/// Confirm the database file set exists and was built with -parse_seqids.
fn check_database(db: &Path, protein: bool) -> Result<()> {
    let (core, seqid) = if protein {
        (["pin", "phr", "psq"], ["pog", "psd", "psi"])
    } else {
        (["nin", "nhr", "nsq"], ["nog", "nsd", "nsi"])
    };

    let exists = |ext: &str| {
        let mut os = db.as_os_str().to_owned();
        os.push(".");
        os.push(ext);
        PathBuf::from(os).is_file()
    };

    if !core.iter().all(|ext| exists(ext)) {
        bail!(
            "{} database not found at '{}'",
            if protein { "blastp" } else { "blastn" },
            db.display()
        );
    }
    if !seqid.iter().all(|ext| exists(ext)) {
        bail!(
            "incorrect blastdb at '{}'; rebuild it with the -parse_seqids flag",
            db.display()
        );
    }
    Ok(())
}

fn run_checked(cmd: &mut Command, what: &str) -> Result<std::process::Output> {
    tracing::debug!(?cmd, "running {}", what);
    let output = cmd
        .output()
        .with_context(|| format!("failed to launch {}", what))?;
    if !output.status.success() {
        bail!(
            "{} exited with {}: {}",
            what,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output)
}

fn write_query_fasta(workspace: &TempWorkspace, collection: &SeqCollection) -> Result<PathBuf> {
    let mut buffer = Vec::new();
    formats::write(
        &mut buffer,
        &collection.records,
        SeqFormat::Fasta,
        collection.alphabet,
        80,
    )?;
    workspace.write_file("query.fa", &buffer)
}

/// Search a BLAST database with every record in the collection and return
/// the hit sequences fetched back out of the database, or None when nothing
/// matched.
pub fn blast_search(
    collection: &SeqCollection,
    db: &Path,
    params: &[String],
) -> Result<Option<SeqCollection>> {
    let binaries = BlastBinaries::discover(params);
    let protein = collection.alphabet == Some(Alphabet::Protein);
    let (binary, expected) = binaries.search_binary(collection.alphabet)?;

    // The binary handed to us must actually be the tool we think it is
    let kind = identify_binary(binary)?;
    if kind != expected {
        bail!(
            "binary at {} identifies as '{}', expected {}",
            binary.display(),
            kind,
            expected
        );
    }

    let db = db
        .canonicalize()
        .unwrap_or_else(|_| db.to_path_buf());
    check_database(&db, protein)?;

    let blastdbcmd = binaries
        .blastdbcmd
        .as_ref()
        .context("blastdbcmd binary not found; set it explicitly with -p")?;

    let mut workspace = TempWorkspace::new("blast")?;
    let query = write_query_fasta(&workspace, collection)?;
    let out_path = workspace.path("out.txt");

    let result = run_checked(
        Command::new(binary)
            .arg("-db")
            .arg(&db)
            .arg("-query")
            .arg(&query)
            .arg("-out")
            .arg(&out_path)
            .arg("-num_threads")
            .arg(num_cpus::get().to_string())
            .arg("-evalue")
            .arg("0.01")
            .arg("-outfmt")
            .arg("6"),
        expected,
    );
    if result.is_err() {
        workspace.mark_failed();
    }
    result?;

    let table = workspace.read_file("out.txt")?;
    let mut hit_ids: Vec<String> = Vec::new();
    for hit in parse_tabular(&table) {
        if !hit_ids.contains(&hit.subject_id) {
            hit_ids.push(hit.subject_id);
        }
    }

    if hit_ids.is_empty() {
        eprintln!("No matches identified.");
        return Ok(None);
    }

    let mut fasta = String::new();
    for hit_id in &hit_ids {
        let output = run_checked(
            Command::new(blastdbcmd)
                .arg("-db")
                .arg(&db)
                .arg("-entry")
                .arg(format!("lcl|{}", hit_id)),
            "blastdbcmd",
        )?;
        let text = String::from_utf8_lossy(&output.stdout).replace("lcl|", "");
        fasta.push_str(&text);
        if !text.ends_with('\n') {
            fasta.push('\n');
        }
    }

    let hits = SeqCollection::from_bytes(fasta.as_bytes(), Some(SeqFormat::Fasta))?;
    Ok(Some(hits))
}

/// All-by-all pairwise comparison. Every unordered record pair is searched
/// once (`query` is the later record); pairs with no hit report zeroes.
pub fn bl2seq(collection: &SeqCollection, params: &[String]) -> Result<Vec<HitSummary>> {
    let binaries = BlastBinaries::discover(params);
    let (binary, what) = binaries.search_binary(collection.alphabet)?;

    let workspace = TempWorkspace::new("bl2seq")?;
    let mut results = Vec::new();

    for (i, subject) in collection.records.iter().enumerate() {
        let subject_file = workspace.write_file(
            "subject.fa",
            format!(">{}\n{}\n", subject.header(), subject.seq_str()).as_bytes(),
        )?;
        for query in &collection.records[i + 1..] {
            let query_file = workspace.write_file(
                "query.fa",
                format!(">{}\n{}\n", query.header(), query.seq_str()).as_bytes(),
            )?;

            let output = run_checked(
                Command::new(binary)
                    .arg("-subject")
                    .arg(&subject_file)
                    .arg("-query")
                    .arg(&query_file)
                    .arg("-outfmt")
                    .arg("6"),
                what,
            )?;
            let text = String::from_utf8_lossy(&output.stdout);

            match parse_tabular(&text).into_iter().next() {
                Some(hit) => results.push(hit),
                None => results.push(HitSummary {
                    query_id: query.id.clone(),
                    subject_id: subject.id.clone(),
                    identity: 0.0,
                    alignment_length: 0,
                    mismatches: 0,
                    gap_opens: 0,
                    query_start: 0,
                    query_end: 0,
                    subject_start: 0,
                    subject_end: 0,
                    e_value: 0.0,
                    bit_score: 0.0,
                }),
            }
        }
    }
    Ok(results)
}

/// Greedy similarity purge: walk the records in order and keep one only if
/// its best bit score against every already-kept record stays below the
/// threshold. Returns the kept-id -> purged-ids mapping.
pub fn purge(
    collection: &mut SeqCollection,
    threshold: f64,
    params: &[String],
) -> Result<HashMap<String, Vec<String>>> {
    let binaries = BlastBinaries::discover(params);
    let (binary, what) = binaries.search_binary(collection.alphabet)?;
    let workspace = TempWorkspace::new("purge")?;

    let mut kept: Vec<usize> = Vec::new();
    let mut deleted: HashMap<String, Vec<String>> = HashMap::new();

    for (i, rec) in collection.records.iter().enumerate() {
        let mut absorbed_by = None;
        for &k in &kept {
            let keeper = &collection.records[k];
            let subject_file = workspace.write_file(
                "subject.fa",
                format!(">{}\n{}\n", keeper.header(), keeper.seq_str()).as_bytes(),
            )?;
            let query_file = workspace.write_file(
                "query.fa",
                format!(">{}\n{}\n", rec.header(), rec.seq_str()).as_bytes(),
            )?;
            let output = run_checked(
                Command::new(binary)
                    .arg("-subject")
                    .arg(&subject_file)
                    .arg("-query")
                    .arg(&query_file)
                    .arg("-outfmt")
                    .arg("6"),
                what,
            )?;
            let text = String::from_utf8_lossy(&output.stdout);
            if let Some(hit) = parse_tabular(&text).into_iter().next() {
                if hit.bit_score as f64 >= threshold {
                    absorbed_by = Some(keeper.id.clone());
                    break;
                }
            }
        }

        match absorbed_by {
            Some(keeper_id) => {
                deleted.entry(keeper_id).or_default().push(rec.id.clone());
            }
            None => {
                kept.push(i);
                deleted.entry(rec.id.clone()).or_default();
            }
        }
    }

    let kept_ids: Vec<String> = kept
        .iter()
        .map(|&i| collection.records[i].id.clone())
        .collect();
    collection
        .records
        .retain(|rec| kept_ids.iter().any(|id| *id == rec.id));
    Ok(deleted)
}
