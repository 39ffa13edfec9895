use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use csv::WriterBuilder;
use tracing::{info, warn};

use crate::cli::SimulateArgs;
use crate::commands::evaluate::parse_passage_list;
use crate::commands::evaluate::table::{Table, read_table};
use crate::model::{SimulationCounts, SimulationManifest};
use crate::util::{ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

const MANIFEST_VERSION: u32 = 1;
const MIN_DISTRACTOR_CHARS: usize = 10;
const TOP_RANK_SHARE: f64 = 0.60;
const BURIED_SHARE: f64 = 0.20;

pub fn run(args: SimulateArgs) -> Result<()> {
    if args.top_k < 2 {
        bail!("--top-k must be at least 2, got {}", args.top_k);
    }
    let run_id = format!("sim-{}", utc_compact_string(Utc::now()));
    let manifest_path = resolve_manifest_path(&args.output, args.manifest_path.as_deref())?;

    let input = File::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let table = read_table(BufReader::new(input))
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let references = reference_lists(&table, &args.reference_column)?;

    let pool = build_distractor_pool(&references);
    info!(
        rows = table.rows.len(),
        pool_size = pool.len(),
        top_k = args.top_k,
        seed = args.seed,
        run_id = %run_id,
        "simulating retrieval results"
    );

    let mut rng = XorShift::new(args.seed);
    let mut counts = SimulationCounts {
        row_count: table.rows.len(),
        pool_size: pool.len(),
        top_rank_rows: 0,
        buried_rows: 0,
        miss_rows: 0,
        no_reference_rows: 0,
    };
    let mut retrieved = Vec::with_capacity(references.len());
    for (row_index, row_references) in references.iter().enumerate() {
        let (passages, outcome) = simulate_row(&mut rng, &pool, row_references, args.top_k)
            .with_context(|| format!("failed to simulate row {row_index}"))?;
        match outcome {
            Outcome::TopRank => counts.top_rank_rows += 1,
            Outcome::Buried => counts.buried_rows += 1,
            Outcome::Miss => counts.miss_rows += 1,
            Outcome::NoReference => counts.no_reference_rows += 1,
        }
        retrieved.push(passages);
    }

    if let Some(parent) = args.output.parent() {
        ensure_directory(parent)?;
    }
    let output = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    write_with_retrieved(BufWriter::new(output), &table, &args.retrieved_column, &retrieved)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    info!(
        path = %args.output.display(),
        top_rank = counts.top_rank_rows,
        buried = counts.buried_rows,
        miss = counts.miss_rows,
        no_reference = counts.no_reference_rows,
        "wrote simulated retrievals"
    );

    let manifest = SimulationManifest {
        manifest_version: MANIFEST_VERSION,
        run_id,
        generated_at: now_utc_string(),
        input_path: args.input.display().to_string(),
        input_sha256: sha256_file(&args.input)?,
        output_path: args.output.display().to_string(),
        reference_column: args.reference_column,
        retrieved_column: args.retrieved_column,
        top_k: args.top_k,
        seed: args.seed,
        counts,
    };
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote simulation manifest");

    Ok(())
}

fn resolve_manifest_path(output: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let stem = output
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("output path has no usable file name: {}", output.display()))?;
    Ok(output.with_file_name(format!("{stem}_simulation.json")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    TopRank,
    Buried,
    Miss,
    NoReference,
}

/// xorshift64; deterministic for a given seed.
struct XorShift {
    state: u64,
}

impl XorShift {
    fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift.
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1_u64 << 53) as f64
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }
}

fn reference_lists(table: &Table, column: &str) -> Result<Vec<Vec<String>>> {
    let column_index = table.require_column(column)?;
    Ok(table
        .rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let raw = row.get(column_index).unwrap_or_default();
            parse_passage_list(raw).unwrap_or_else(|err| {
                warn!(row = row_index, error = %err, "unparseable reference list; treating as empty");
                Vec::new()
            })
        })
        .collect())
}

/// Unique reference passages long enough to pass as plausible retrievals.
fn build_distractor_pool(references: &[Vec<String>]) -> Vec<String> {
    let mut seen = HashSet::<&str>::new();
    let mut pool = Vec::new();
    for passage in references.iter().flatten() {
        if passage.chars().count() > MIN_DISTRACTOR_CHARS && seen.insert(passage.as_str()) {
            pool.push(passage.clone());
        }
    }
    pool
}

fn sample_distractors(
    rng: &mut XorShift,
    pool: &[String],
    exclude: Option<&str>,
    count: usize,
) -> Result<Vec<String>> {
    let mut candidates = pool
        .iter()
        .filter(|passage| Some(passage.as_str()) != exclude)
        .collect::<Vec<&String>>();
    if candidates.len() < count {
        bail!(
            "distractor pool too small: need {count}, have {}",
            candidates.len()
        );
    }

    // Partial Fisher-Yates: the first `count` slots end up uniformly sampled.
    for slot in 0..count {
        let pick = slot + rng.below(candidates.len() - slot);
        candidates.swap(slot, pick);
    }
    Ok(candidates
        .into_iter()
        .take(count)
        .cloned()
        .collect())
}

fn simulate_row(
    rng: &mut XorShift,
    pool: &[String],
    references: &[String],
    top_k: usize,
) -> Result<(Vec<String>, Outcome)> {
    let Some(true_passage) = references.first() else {
        return Ok((sample_distractors(rng, pool, None, top_k)?, Outcome::NoReference));
    };

    let mut retrieved = sample_distractors(rng, pool, Some(true_passage), top_k)?;
    let roll = rng.next_f64();
    let outcome = if roll < TOP_RANK_SHARE {
        retrieved.insert(0, true_passage.clone());
        retrieved.truncate(top_k);
        Outcome::TopRank
    } else if roll < TOP_RANK_SHARE + BURIED_SHARE {
        let position = 1 + rng.below(top_k - 1);
        retrieved[position] = true_passage.clone();
        Outcome::Buried
    } else {
        Outcome::Miss
    };

    Ok((retrieved, outcome))
}

fn write_with_retrieved<W: Write>(
    writer: W,
    table: &Table,
    retrieved_column: &str,
    retrieved: &[Vec<String>],
) -> Result<()> {
    let existing = table.column_index(retrieved_column);
    let mut headers = table.headers.clone();
    if existing.is_none() {
        headers.push_field(retrieved_column);
    }

    let mut csv_writer = WriterBuilder::new().flexible(true).from_writer(writer);
    csv_writer
        .write_record(&headers)
        .context("failed to write header")?;

    for (index, (row, passages)) in table.rows.iter().zip(retrieved).enumerate() {
        let serialized =
            serde_json::to_string(passages).context("failed to serialize retrieved passages")?;
        let mut fields = row.iter().map(ToOwned::to_owned).collect::<Vec<String>>();
        let target = existing.unwrap_or(headers.len() - 1);
        if fields.len() <= target {
            fields.resize(target + 1, String::new());
        }
        fields[target] = serialized;

        csv_writer
            .write_record(&fields)
            .with_context(|| format!("failed to write row {index}"))?;
    }

    csv_writer.flush().context("failed to flush output")?;
    Ok(())
}
