use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::engine::MatchPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "rageval",
    version,
    about = "Retrieval quality evaluation for RAG test sets"
)]
pub struct Cli {
    /// Log every scored row (debug level) unless RUST_LOG is set.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score retrieved passages against reference passages per query.
    Evaluate(EvaluateArgs),
    /// Fill the retrieved column with seeded synthetic retrievals.
    Simulate(SimulateArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum MatchPolicyArg {
    ExactSet,
    Substring,
}

impl MatchPolicyArg {
    pub fn as_policy(self) -> MatchPolicy {
        match self {
            Self::ExactSet => MatchPolicy::ExactSet,
            Self::Substring => MatchPolicy::SubstringContainment,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, value_enum)]
    pub match_policy: MatchPolicyArg,

    #[arg(long, default_value_t = false)]
    pub no_normalization: bool,

    #[arg(long, default_value = "reference_contexts")]
    pub reference_column: String,

    #[arg(long, default_value = "retrieved_contexts")]
    pub retrieved_column: String,

    #[arg(long, default_value = "user_input")]
    pub query_column: String,

    #[arg(long, default_value = "evaluations")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub results_path: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long = "group-by")]
    pub group_by: Vec<String>,

    #[arg(long)]
    pub complexity_column: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long, default_value = "reference_contexts")]
    pub reference_column: String,

    #[arg(long, default_value = "retrieved_contexts")]
    pub retrieved_column: String,

    #[arg(long, default_value_t = 3)]
    pub top_k: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Defaults to `<output stem>_simulation.json` beside the output CSV.
    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}
