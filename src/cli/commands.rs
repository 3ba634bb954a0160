//! CLI command definitions for dataselect.
//!
//! Each subcommand reads JSONL records from disk, runs one selection strategy
//! and writes JSONL to stdout or a file. Configuration is layered as
//! defaults, then `--config` YAML, then `SELECTOR_*` variables, then flags.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::config::SelectorConfig;
use crate::diversity::embedding_matrix;
use crate::record::Record;
use crate::sampling::{Estimator, SampleMode, SampleSizeCalculator, SampleSpec};
use crate::selector::{Selector, SubsetStrategy};

/// Training-data selection: sampling, coreset selection and hard-negative mining.
#[derive(Parser, Debug)]
#[command(name = "dataselect")]
#[command(about = "Select records from a corpus for training-data curation")]
#[command(version)]
#[command(
    long_about = "dataselect decides which records of a corpus to keep.\n\nRecords are read as JSONL (one JSON object per line); embeddings as JSONL arrays of numbers.\n\nExample usage:\n  dataselect sample --input corpus.jsonl --mode proportion --margin 0.03\n  dataselect subset --input corpus.jsonl --embeddings emb.jsonl --ratio 0.1 --strategy diversity\n  dataselect negatives --input pairs.jsonl --query-field query --positive-field answer"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// YAML configuration file.
    #[arg(short, long, env = "SELECTOR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Base random seed; overrides the configuration.
    #[arg(long, global = true)]
    pub seed: Option<u64>,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Print the statistically required sample size for a population.
    Size(SizeArgs),

    /// Draw a uniform sample of records in one pass.
    Sample(SampleArgs),

    /// Keep a fixed ratio of records, at random or by embedding diversity.
    #[command(alias = "coreset")]
    Subset(SubsetArgs),

    /// Mine BM25 hard negatives for query/positive pairs.
    #[command(alias = "mine")]
    Negatives(NegativesArgs),
}

/// Sample sizing flags shared by `size` and `sample`.
#[derive(clap::Args, Debug, Default)]
pub struct SizingArgs {
    /// Sizing mode.
    #[arg(long, value_enum)]
    pub mode: Option<SampleMode>,

    /// Sample size for manual mode.
    #[arg(short = 'k', long)]
    pub k: Option<usize>,

    /// Confidence level (0.90, 0.95 or 0.99).
    #[arg(long)]
    pub conf_level: Option<f64>,

    /// Margin of error.
    #[arg(long)]
    pub margin: Option<f64>,

    /// Expected proportion for proportion mode.
    #[arg(long)]
    pub p: Option<f64>,

    /// Expected standard deviation for mean mode.
    #[arg(long)]
    pub sigma: Option<f64>,
}

impl SizingArgs {
    fn apply(&self, spec: &mut SampleSpec) {
        if let Some(mode) = self.mode {
            spec.mode = mode;
        }
        if let Some(k) = self.k {
            spec.k = Some(k);
        }
        if let Some(conf_level) = self.conf_level {
            spec.conf_level = conf_level;
        }
        if let Some(margin) = self.margin {
            spec.margin = margin;
        }
        if let Some(p) = self.p {
            spec.p = p;
        }
        if let Some(sigma) = self.sigma {
            spec.sigma = sigma;
        }
    }
}

/// Arguments for `dataselect size`.
#[derive(Parser, Debug)]
pub struct SizeArgs {
    /// Population size N.
    #[arg(short = 'n', long)]
    pub population: usize,

    #[command(flatten)]
    pub sizing: SizingArgs,
}

/// Arguments for `dataselect sample`.
#[derive(Parser, Debug)]
pub struct SampleArgs {
    /// JSONL file of records.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output JSONL file (stdout if omitted).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub sizing: SizingArgs,
}

/// Arguments for `dataselect subset`.
#[derive(Parser, Debug)]
pub struct SubsetArgs {
    /// JSONL file of records.
    #[arg(short, long)]
    pub input: PathBuf,

    /// JSONL file of embedding arrays, one per record, same order.
    #[arg(short, long)]
    pub embeddings: Option<PathBuf>,

    /// Fraction of records to keep, in (0, 1].
    #[arg(short, long)]
    pub ratio: f64,

    /// Selection strategy.
    #[arg(short, long, value_enum, default_value = "diversity")]
    pub strategy: SubsetStrategy,

    /// Write selected indices instead of records.
    #[arg(long)]
    pub indices_only: bool,

    /// Output JSONL file (stdout if omitted).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `dataselect negatives`.
#[derive(Parser, Debug)]
pub struct NegativesArgs {
    /// JSONL file of query/positive records.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Field holding the query text.
    #[arg(long, default_value = "query")]
    pub query_field: String,

    /// Field holding the gold positive text.
    #[arg(long, default_value = "positive")]
    pub positive_field: String,

    /// Negatives per query.
    #[arg(long)]
    pub num_neg: Option<usize>,

    /// Ranked entries skipped before collecting negatives.
    #[arg(long)]
    pub start_rank: Option<usize>,

    /// BM25 k1.
    #[arg(long)]
    pub k1: Option<f64>,

    /// BM25 b.
    #[arg(long)]
    pub b: Option<f64>,

    /// Output JSONL file (stdout if omitted).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
///
/// For more control over logging initialization, use `parse_cli()` and `run_with_cli()`.
pub fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli())
}

/// Run the CLI with the parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    match cli.command {
        Commands::Size(args) => run_size_command(config, args),
        Commands::Sample(args) => run_sample_command(config, args),
        Commands::Subset(args) => run_subset_command(config, args),
        Commands::Negatives(args) => run_negatives_command(config, args),
    }
}

/// Defaults, then the YAML file, then environment variables.
fn load_config(path: Option<&Path>) -> anyhow::Result<SelectorConfig> {
    let mut config = match path {
        Some(path) => SelectorConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SelectorConfig::default(),
    };
    config.apply_env().context("invalid SELECTOR_* environment variable")?;
    Ok(config)
}

fn run_size_command(config: SelectorConfig, args: SizeArgs) -> anyhow::Result<()> {
    let k = resolve_size(config, &args)?;
    println!("{k}");
    Ok(())
}

fn resolve_size(mut config: SelectorConfig, args: &SizeArgs) -> anyhow::Result<usize> {
    args.sizing.apply(&mut config.sampling);
    let spec = &config.sampling;

    let estimator = match spec.mode {
        SampleMode::Manual => anyhow::bail!("size needs --mode proportion or --mode mean"),
        SampleMode::Proportion => Estimator::Proportion(spec.p),
        SampleMode::Mean => Estimator::Mean(spec.sigma),
    };
    let k = SampleSizeCalculator.size(args.population, spec.conf_level, spec.margin, estimator)?;
    Ok(k)
}

fn run_sample_command(mut config: SelectorConfig, args: SampleArgs) -> anyhow::Result<()> {
    args.sizing.apply(&mut config.sampling);
    let selector = Selector::new(config)?;

    let records: Vec<Record> = read_jsonl(&args.input)?;
    let result = selector.sample(&records)?;
    info!(
        requested = result.requested,
        achieved = result.achieved,
        total = records.len(),
        "sample complete"
    );
    write_jsonl(&result.items, args.output.as_deref())
}

fn run_subset_command(config: SelectorConfig, args: SubsetArgs) -> anyhow::Result<()> {
    let selector = Selector::new(config)?;
    let records: Vec<Record> = read_jsonl(&args.input)?;

    let embeddings = match &args.embeddings {
        Some(path) => {
            let vectors: Vec<Vec<f32>> = read_jsonl(path)?;
            Some(embedding_matrix(&vectors).with_context(|| {
                format!("invalid embeddings in {}", path.display())
            })?)
        }
        None => None,
    };

    let result = selector.select_subset_indices(
        records.len(),
        embeddings.as_ref().map(|m| m.view()),
        args.ratio,
        args.strategy,
    )?;
    info!(
        requested = result.requested,
        achieved = result.achieved,
        total = records.len(),
        strategy = ?args.strategy,
        "subset selection complete"
    );

    if args.indices_only {
        write_jsonl(&result.items, args.output.as_deref())
    } else {
        let selected: Vec<&Record> = result.items.iter().map(|&i| &records[i]).collect();
        write_jsonl(&selected, args.output.as_deref())
    }
}

fn run_negatives_command(mut config: SelectorConfig, args: NegativesArgs) -> anyhow::Result<()> {
    if let Some(num_neg) = args.num_neg {
        config.negatives.num_neg = num_neg;
    }
    if let Some(start_rank) = args.start_rank {
        config.negatives.start_rank = start_rank;
    }
    if let Some(k1) = args.k1 {
        config.bm25.k1 = k1;
    }
    if let Some(b) = args.b {
        config.bm25.b = b;
    }
    let selector = Selector::new(config)?;

    let records: Vec<Record> = read_jsonl(&args.input)?;
    let examples = selector.mine_negatives(&records, &args.query_field, &args.positive_field)?;
    write_jsonl(&examples, args.output.as_deref())
}

/// Reads one JSON value per non-blank line.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut items = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid JSON", path.display(), line_no + 1))?;
        items.push(item);
    }
    Ok(items)
}

/// Writes one JSON value per line to `output`, or stdout when `None`.
pub fn write_jsonl<T: Serialize>(items: &[T], output: Option<&Path>) -> anyhow::Result<()> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
