//! The seqsmith binary: one flag per sequence operation, in the classic
//! shell-toolkit style. Inputs are file paths or raw residue strings.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use seqsmith_bio::codon::UsageTable;
use seqsmith_bio::collection::{self, RepeatScope, SeqCollection};
use seqsmith_bio::formats::SeqFormat;
use seqsmith_bio::transform::{self, End};
use seqsmith_bio::translate::{self, BackTranslateMode};
use seqsmith_bio::Alphabet;
use seqsmith_cli::{init_tracing, report_error, stderr_message};
use seqsmith_utils::display::{banner, columnize};
use std::path::Path;
use std::process;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(
    name = "seqsmith",
    version,
    about = "Command-line toolkit for biological sequence files",
    long_about = "Convert, transform, filter, and annotate DNA/RNA/protein sequence \
                  files, and run them through locally installed BLAST binaries. \
                  Each operation is a flag; supply files (or raw sequences) as \
                  positional arguments."
)]
struct Cli {
    /// Sequence files (or raw sequence strings)
    #[arg(value_name = "SEQUENCE", required = true, num_args = 1..)]
    sequence: Vec<String>,

    /// Strip out non-sequence characters, such as stops (*) and gaps (-)
    #[arg(long, alias = "cs")]
    clean_seq: bool,

    /// Convert all sequences to uppercase
    #[arg(long, alias = "uc")]
    uppercase: bool,

    /// Convert all sequences to lowercase
    #[arg(long, alias = "lc")]
    lowercase: bool,

    /// Remove metadata from the file (only the id is retained)
    #[arg(long, alias = "dm")]
    delete_metadata: bool,

    /// Return line-break separated sequences
    #[arg(long, alias = "rs")]
    raw_seq: bool,

    /// Convert coding sequences into amino acid sequences
    #[arg(long, alias = "tr")]
    translate: bool,

    /// Change the reading frame of sequences by deleting characters off the front
    #[arg(long, alias = "sfr", value_name = "FRAME")]
    select_frame: Option<usize>,

    /// Translate nucleotide sequences into all six reading frames
    #[arg(long, alias = "tr6")]
    translate6frames: bool,

    /// Convert amino acid sequences into codons; pick mode and species with -p
    /// [random|r|optimized|o] [human|h|mouse|m|yeast|y|ecoli|e]
    #[arg(long, alias = "btr")]
    back_translate: bool,

    /// Convert DNA sequences to RNA
    #[arg(long, alias = "d2r")]
    transcribe: bool,

    /// Convert RNA sequences to DNA
    #[arg(long, alias = "r2d")]
    back_transcribe: bool,

    /// Return the complement of a nucleotide sequence
    #[arg(long, alias = "cmp")]
    complement: bool,

    /// Return the reverse complement of a nucleotide sequence
    #[arg(long, alias = "rc")]
    reverse_complement: bool,

    /// Output all sequence identifiers; use -p to set the column count
    #[arg(long, alias = "li")]
    list_ids: bool,

    /// Count how many sequences are present in the input
    #[arg(long, alias = "ns")]
    num_seqs: bool,

    /// Return the average length of all sequences; use '-p clean' to strip
    /// gaps first
    #[arg(long, alias = "asl")]
    ave_seq_length: bool,

    /// Concatenate all records into a single sequence; use '-p clean' to
    /// strip stops and gaps first
    #[arg(long, alias = "cts")]
    concat_seqs: bool,

    /// Map features from nucleotide records onto protein records; one DNA
    /// file and one protein file must be passed in
    #[arg(long, alias = "fd2p")]
    map_features_dna2prot: bool,

    /// Map features from protein records onto nucleotide records; one DNA
    /// file and one protein file must be passed in
    #[arg(long, alias = "fp2d")]
    map_features_prot2dna: bool,

    /// Replace a pattern in record ids with a substitution
    #[arg(long, alias = "ri", num_args = 2, value_names = ["PATTERN", "SUBSTITUTION"])]
    rename_ids: Option<Vec<String>>,

    /// Combine the features of two files onto matching records
    #[arg(long, alias = "cf")]
    combine_features: bool,

    /// Randomly reorder the records in the file
    #[arg(long, alias = "sh")]
    shuffle: bool,

    /// Sort records by id; use '-p rev' for descending order
    #[arg(long, alias = "oi")]
    order_ids: bool,

    /// Order features by their position within each record
    #[arg(long, alias = "ofp")]
    order_features_by_position: bool,

    /// Order features alphabetically by type
    #[arg(long, alias = "ofa")]
    order_features_alphabetically: bool,

    /// Rewrite the records in another format
    #[arg(long, alias = "sf", value_name = "FORMAT")]
    screw_formats: Option<String>,

    /// Rename every identifier to a unique 10-character hash
    #[arg(long, alias = "hsi")]
    hash_seq_ids: bool,

    /// Keep only records with ids or descriptions matching the pattern
    #[arg(long, alias = "pr", value_name = "REGEX")]
    pull_records: Option<String>,

    /// Keep only the ends of every sequence
    #[arg(long, alias = "pre", num_args = 2, value_names = ["AMOUNT", "FRONT|REAR"])]
    pull_record_ends: Option<Vec<String>>,

    /// Extract a subsequence range (1-based, inclusive)
    #[arg(long, alias = "er", num_args = 2, value_names = ["START", "END"])]
    extract_region: Option<Vec<isize>>,

    /// Remove records matching the patterns; deleted ids go to stderr
    #[arg(long, alias = "dr", num_args = 1.., value_name = "REGEX")]
    delete_records: Option<Vec<String>>,

    /// Delete sequences with length below the threshold
    #[arg(long, alias = "dsm", value_name = "LENGTH")]
    delete_small: Option<usize>,

    /// Delete sequences with length above the threshold
    #[arg(long, alias = "dlg", value_name = "LENGTH")]
    delete_large: Option<usize>,

    /// Remove features whose type matches the patterns
    #[arg(long, alias = "df", num_args = 1.., value_name = "REGEX")]
    delete_features: Option<Vec<String>>,

    /// Strip records with duplicate ids and/or identical sequences
    #[arg(long, alias = "drp")]
    delete_repeats: bool,

    /// Report duplicate ids and duplicate sequences
    #[arg(long, alias = "fr")]
    find_repeats: bool,

    /// Pool the records of every input file
    #[arg(long, alias = "mg")]
    merge: bool,

    /// BLAST the input against a database and return the hits
    #[arg(long, alias = "bl", value_name = "DATABASE")]
    blast: Option<String>,

    /// All-by-all pairwise BLAST among the input records
    #[arg(long, alias = "bl2s")]
    bl2seq: bool,

    /// Delete records with a BLAST bit score above the threshold
    #[arg(long, alias = "prg", value_name = "BIT_SCORE")]
    purge: Option<f64>,

    /// Report the inferred alphabet (dna/rna/prot)
    #[arg(long, alias = "ga")]
    guess_alphabet: bool,

    /// Report the detected file format of every input
    #[arg(long, alias = "gf")]
    guess_format: bool,

    /// Rewrite the input file in place. Be careful!
    #[arg(short = 'i', long)]
    in_place: bool,

    /// Free-form arguments consumed by some operations
    #[arg(short = 'p', long, num_args = 1..)]
    params: Option<Vec<String>>,

    /// Suppress stderr messages
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Output format override
    #[arg(short = 'o', long, value_name = "FORMAT")]
    out_format: Option<String>,

    /// Input format override, when detection guesses wrong
    #[arg(short = 'f', long, value_name = "FORMAT")]
    in_format: Option<String>,
}

impl Cli {
    fn params(&self) -> &[String] {
        self.params.as_deref().unwrap_or(&[])
    }

    fn columns(&self) -> usize {
        self.params()
            .first()
            .and_then(|p| p.parse().ok())
            .unwrap_or(1)
    }

    fn clean_param(&self) -> bool {
        self.params().first().map(String::as_str) == Some("clean")
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        process::exit(report_error(&e));
    }
}

fn parse_format(spec: &Option<String>) -> Result<Option<SeqFormat>> {
    spec.as_deref()
        .map(|s| SeqFormat::from_str(s).map_err(anyhow::Error::from))
        .transpose()
}

/// Load every positional input into one collection.
fn load_all(cli: &Cli) -> Result<SeqCollection> {
    let in_format = parse_format(&cli.in_format)?;
    let mut collections = Vec::with_capacity(cli.sequence.len());
    for input in &cli.sequence {
        collections.push(
            SeqCollection::from_input(input, in_format)
                .with_context(|| format!("failed to read '{}'", input))?,
        );
    }
    let mut merged = collection::merge(collections)?;
    if let Some(format) = parse_format(&cli.out_format)? {
        merged.out_format = format;
    }
    Ok(merged)
}

/// Load exactly two inputs, kept separate (feature-mapping operations).
fn load_pair(cli: &Cli) -> Result<(SeqCollection, SeqCollection)> {
    if cli.sequence.len() < 2 {
        return Err(anyhow!("this operation needs two sequence files"));
    }
    let in_format = parse_format(&cli.in_format)?;
    let first = SeqCollection::from_input(&cli.sequence[0], in_format)?;
    let second = SeqCollection::from_input(&cli.sequence[1], in_format)?;
    Ok((first, second))
}

/// Split two inputs into (nucleotide, protein) no matter the order given.
fn split_dna_protein(
    a: SeqCollection,
    b: SeqCollection,
) -> Result<(SeqCollection, SeqCollection)> {
    match (a.alphabet, b.alphabet) {
        (Some(Alphabet::Protein), Some(Alphabet::Protein)) | (None, None) => Err(anyhow!(
            "you must provide one DNA file and one protein file"
        )),
        (Some(Alphabet::Protein), _) => Ok((b, a)),
        (_, Some(Alphabet::Protein)) => Ok((a, b)),
        _ => Err(anyhow!("you must provide one DNA file and one protein file")),
    }
}

fn print_recs(collection: &SeqCollection, cli: &Cli, in_place_allowed: bool) -> Result<()> {
    if collection.is_empty() {
        eprintln!("Nothing returned.");
        return Ok(());
    }
    let output = collection.write_string()?;

    if cli.in_place && in_place_allowed {
        let target = Path::new(&cli.sequence[0]);
        if target.is_file() {
            std::fs::write(target, &output)?;
            stderr_message(
                &format!("File over-written at:\n{}", target.display()),
                cli.quiet,
            );
            return Ok(());
        }
        stderr_message(
            "Warning: the -i flag was passed in, but the positional argument doesn't seem \
             to be a file. Nothing was written.",
            cli.quiet,
        );
    }
    println!("{}", output.trim_end());
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    // Purge
    if let Some(threshold) = cli.purge {
        let mut seqs = load_all(cli)?;
        let deleted = seqsmith_tools::purge(&mut seqs, threshold, cli.params())?;
        let mut report = String::from("# Deleted record mapping #\n");
        let mut keepers: Vec<_> = deleted.iter().collect();
        keepers.sort();
        for (keeper, absorbed) in keepers {
            report.push_str(&format!("{}\n{}\n\n", keeper, absorbed.join(", ")));
        }
        stderr_message(&report, cli.quiet);
        return print_recs(&seqs, cli, true);
    }

    // All-by-all BLAST
    if cli.bl2seq {
        let seqs = load_all(cli)?;
        eprintln!("#query\tsubject\t%_ident\tlength\tevalue\tbit_score");
        for hit in seqsmith_tools::bl2seq(&seqs, cli.params())? {
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}",
                hit.query_id,
                hit.subject_id,
                hit.identity,
                hit.alignment_length,
                hit.e_value,
                hit.bit_score
            );
        }
        return Ok(());
    }

    // BLAST against a database
    if let Some(db) = &cli.blast {
        let seqs = load_all(cli)?;
        if let Some(hits) = seqsmith_tools::blast_search(&seqs, Path::new(db), cli.params())? {
            return print_recs(&hits, cli, false);
        }
        return Ok(());
    }

    // Shuffle
    if cli.shuffle {
        let mut seqs = load_all(cli)?;
        seqs.shuffle();
        return print_recs(&seqs, cli, true);
    }

    // Order ids
    if cli.order_ids {
        let mut seqs = load_all(cli)?;
        let reverse = cli.params().first().map(String::as_str) == Some("rev");
        seqs.order_ids(reverse);
        return print_recs(&seqs, cli, true);
    }

    // Delete repeats
    if cli.delete_repeats {
        let mut seqs = load_all(cli)?;
        let report = collection::find_repeats(&seqs);
        if report.is_empty() {
            stderr_message("No duplicate records found", cli.quiet);
            return Ok(());
        }
        let mut body = String::new();
        if !report.repeat_ids.is_empty() {
            body.push_str("# Records with duplicate ids deleted (first instance retained)\n");
            body.push_str(&columnize(&report.repeat_ids, cli.columns()));
            body.push('\n');
        }
        let dupe_seq_ids: Vec<String> = report
            .repeat_seqs
            .iter()
            .flat_map(|group| group[1..].iter().cloned())
            .collect();
        if !dupe_seq_ids.is_empty() {
            body.push_str(
                "# Records with duplicate sequences deleted (first instance retained)\n",
            );
            body.push_str(&columnize(&dupe_seq_ids, cli.columns()));
            body.push('\n');
        }
        stderr_message(&banner(&body), cli.quiet);
        collection::delete_repeats(&mut seqs, RepeatScope::All);
        return print_recs(&seqs, cli, true);
    }

    // Delete records
    if let Some(patterns) = &cli.delete_records {
        let mut seqs = load_all(cli)?;
        let mut deleted = Vec::new();
        for pattern in patterns {
            deleted.extend(seqs.delete_records(pattern)?);
        }
        let body = if deleted.is_empty() {
            format!(
                "# No sequence identifiers match {}",
                patterns.join(", ")
            )
        } else {
            format!(
                "# Deleted records\n{}",
                columnize(&deleted, cli.columns())
            )
        };
        stderr_message(&banner(&body), cli.quiet);
        return print_recs(&seqs, cli, true);
    }

    // Size filters
    if let Some(max_len) = cli.delete_large {
        let mut seqs = load_all(cli)?;
        seqs.delete_large(max_len);
        return print_recs(&seqs, cli, true);
    }
    if let Some(min_len) = cli.delete_small {
        let mut seqs = load_all(cli)?;
        seqs.delete_small(min_len);
        return print_recs(&seqs, cli, true);
    }

    // Delete features
    if let Some(patterns) = &cli.delete_features {
        let mut seqs = load_all(cli)?;
        for pattern in patterns {
            seqs.delete_features(pattern)?;
        }
        return print_recs(&seqs, cli, true);
    }

    // Merge
    if cli.merge {
        let seqs = load_all(cli)?;
        return print_recs(&seqs, cli, false);
    }

    // Format conversion
    if let Some(format) = &cli.screw_formats {
        let mut seqs = load_all(cli)?;
        seqs.out_format = SeqFormat::from_str(format)?;
        if cli.in_place {
            // The extension must follow the format for the rewrite to make sense
            let original = Path::new(&cli.sequence[0]);
            if original.is_file() {
                let renamed = original.with_extension(seqs.out_format.extension());
                let output = seqs.write_string()?;
                std::fs::write(&renamed, output)?;
                if renamed != original {
                    std::fs::remove_file(original)?;
                }
                stderr_message(
                    &format!("File over-written at:\n{}", renamed.display()),
                    cli.quiet,
                );
                return Ok(());
            }
        }
        return print_recs(&seqs, cli, false);
    }

    // Rename ids
    if let Some(args) = &cli.rename_ids {
        let mut seqs = load_all(cli)?;
        seqs.rename_ids(&args[0], &args[1])?;
        return print_recs(&seqs, cli, true);
    }

    // Case folding
    if cli.uppercase {
        let mut seqs = load_all(cli)?;
        transform::uppercase(&mut seqs);
        return print_recs(&seqs, cli, true);
    }
    if cli.lowercase {
        let mut seqs = load_all(cli)?;
        transform::lowercase(&mut seqs);
        return print_recs(&seqs, cli, true);
    }

    // Transcription
    if cli.transcribe {
        let mut seqs = load_all(cli)?;
        transform::transcribe(&mut seqs)?;
        return print_recs(&seqs, cli, true);
    }
    if cli.back_transcribe {
        let mut seqs = load_all(cli)?;
        transform::back_transcribe(&mut seqs)?;
        return print_recs(&seqs, cli, true);
    }

    // Complementation
    if cli.complement {
        let mut seqs = load_all(cli)?;
        transform::complement(&mut seqs)?;
        return print_recs(&seqs, cli, true);
    }
    if cli.reverse_complement {
        let mut seqs = load_all(cli)?;
        transform::reverse_complement(&mut seqs)?;
        return print_recs(&seqs, cli, true);
    }

    // List identifiers
    if cli.list_ids {
        let seqs = load_all(cli)?;
        println!("{}", columnize(&seqs.ids(), cli.columns()));
        return Ok(());
    }

    // Translation
    if cli.translate {
        let seqs = load_all(cli)?;
        let translated = translate::translate_cds(&seqs, cli.quiet)?;
        return print_recs(&translated, cli, true);
    }
    if let Some(frame) = cli.select_frame {
        let mut seqs = load_all(cli)?;
        transform::select_frame(&mut seqs, frame)?;
        return print_recs(&seqs, cli, true);
    }
    if cli.translate6frames {
        let seqs = load_all(cli)?;
        let mut translated = translate::translate_six_frames(&seqs)?;
        if let Some(format) = parse_format(&cli.out_format)? {
            translated.out_format = format;
        }
        return print_recs(&translated, cli, true);
    }
    if cli.back_translate {
        let seqs = load_all(cli)?;
        let mode = cli
            .params()
            .iter()
            .find_map(|p| BackTranslateMode::from_str_loose(p))
            .unwrap_or(BackTranslateMode::Random);
        let table = match cli
            .params()
            .iter()
            .find_map(|p| UsageTable::from_species(p))
        {
            Some(table) => table,
            None => UsageTable::Uniform,
        };
        let result = translate::back_translate(&seqs, mode, table)?;
        return print_recs(&result, cli, true);
    }

    // Concatenate
    if cli.concat_seqs {
        let seqs = load_all(cli)?;
        let mut output = transform::concat_seqs(&seqs, cli.clean_param())?;
        if let Some(format) = parse_format(&cli.out_format)? {
            output.out_format = format;
        }
        return print_recs(&output, cli, false);
    }

    // Counts and statistics
    if cli.num_seqs {
        let seqs = load_all(cli)?;
        println!("{}", seqs.len());
        return Ok(());
    }
    if cli.ave_seq_length {
        let mut seqs = load_all(cli)?;
        if cli.clean_param() {
            transform::clean_seq(&mut seqs);
        }
        println!("{:.2}", seqs.average_length());
        return Ok(());
    }

    // Find repeats
    if cli.find_repeats {
        let seqs = load_all(cli)?;
        let report = collection::find_repeats(&seqs);
        let mut output = String::new();
        if report.repeat_ids.is_empty() {
            output.push_str("No records with duplicate IDs\n\n");
        } else {
            output.push_str("Records with duplicate IDs:\n");
            output.push_str(&report.repeat_ids.join(", "));
            output.push_str("\n\n");
        }
        if report.repeat_seqs.is_empty() {
            output.push_str("No records with duplicate sequences\n");
        } else {
            output.push_str("Records with duplicate sequences:\n");
            let groups: Vec<String> = report
                .repeat_seqs
                .iter()
                .map(|g| format!("({})", g.join(", ")))
                .collect();
            output.push_str(&groups.join(", "));
            output.push('\n');
        }
        println!("{}", output.trim_end());
        return Ok(());
    }

    // Sequence ends
    if let Some(args) = &cli.pull_record_ends {
        let mut seqs = load_all(cli)?;
        let amount: usize = args[0]
            .parse()
            .map_err(|_| anyhow!("'{}' is not a valid amount", args[0]))?;
        let end = End::from_str(&args[1])?;
        transform::pull_ends(&mut seqs, amount, end);
        return print_recs(&seqs, cli, true);
    }

    // Region extraction
    if let Some(range) = &cli.extract_region {
        let mut seqs = load_all(cli)?;
        transform::extract_region(&mut seqs, range[0], range[1])?;
        return print_recs(&seqs, cli, true);
    }

    // Pull records
    if let Some(pattern) = &cli.pull_records {
        let mut seqs = load_all(cli)?;
        seqs.pull_records(pattern)?;
        return print_recs(&seqs, cli, false);
    }

    // Hash ids
    if cli.hash_seq_ids {
        let mut seqs = load_all(cli)?;
        let table = seqs.hash_ids();
        let mut report = String::from("# Hash table\n");
        for (hash, original) in &table {
            report.push_str(&format!("{},{}\n", hash, original));
        }
        stderr_message(&report, cli.quiet);
        return print_recs(&seqs, cli, true);
    }

    // Guess alphabet
    if cli.guess_alphabet {
        let seqs = load_all(cli)?;
        match seqs.alphabet {
            Some(alpha) => println!("{}", alpha),
            None => println!("Undetermined"),
        }
        return Ok(());
    }

    // Delete metadata
    if cli.delete_metadata {
        let mut seqs = load_all(cli)?;
        seqs.delete_metadata();
        return print_recs(&seqs, cli, true);
    }

    // Raw sequences
    if cli.raw_seq {
        let mut seqs = load_all(cli)?;
        transform::clean_seq(&mut seqs);
        seqs.out_format = SeqFormat::Raw;
        let output = seqs.write_string()?;
        println!("{}", output.trim_end());
        return Ok(());
    }

    // Clean
    if cli.clean_seq {
        let mut seqs = load_all(cli)?;
        transform::clean_seq(&mut seqs);
        return print_recs(&seqs, cli, true);
    }

    // Guess format
    if cli.guess_format {
        let in_format = parse_format(&cli.in_format)?;
        for input in &cli.sequence {
            match SeqCollection::from_input(input, in_format) {
                Ok(seqs) => println!("{}\t-->\t{}", input, seqs.in_format),
                Err(_) => println!("{}\t-->\tUndetermined", input),
            }
        }
        return Ok(());
    }

    // Feature mapping, nucleotide onto protein
    if cli.map_features_dna2prot {
        let (a, b) = load_pair(cli)?;
        let (dna, prot) = split_dna_protein(a, b)?;
        let mapped = collection::map_features_nucleotide_to_protein(&dna, &prot)?;
        return print_recs(&mapped, cli, false);
    }

    // Feature mapping, protein onto nucleotide
    if cli.map_features_prot2dna {
        let (a, b) = load_pair(cli)?;
        let (dna, prot) = split_dna_protein(a, b)?;
        let mapped = collection::map_features_protein_to_nucleotide(&prot, &dna)?;
        return print_recs(&mapped, cli, false);
    }

    // Feature union
    if cli.combine_features {
        let (a, b) = load_pair(cli)?;
        let combined = collection::combine_features(&a, &b)?;
        return print_recs(&combined, cli, false);
    }

    // Feature ordering
    if cli.order_features_by_position {
        let mut seqs = load_all(cli)?;
        seqs.order_features_by_position();
        return print_recs(&seqs, cli, true);
    }
    if cli.order_features_alphabetically {
        let mut seqs = load_all(cli)?;
        seqs.order_features_alphabetically();
        return print_recs(&seqs, cli, true);
    }

    Err(anyhow!(
        "no operation requested; run with --help to see what seqsmith can do"
    ))
}
