use clap::{Parser, Subcommand};
use miette::{miette, Result};
use std::path::PathBuf;

use blockorder_rs::cli;
use blockorder_rs::cli::order::OutputFormat;

#[derive(Parser)]
#[command(name = "blockorder-rs")]
#[command(about = "Probability-guided basic block ordering for code emission and register allocation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the code emitting and linear scan orders of a graph
    Order {
        /// Input graph description (JSON)
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Options file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Divisor used when deciding whether to defer a merge block
        #[arg(long)]
        merge_penalty: Option<f64>,

        /// Skip alignment and loop layout checks
        #[arg(long)]
        no_verify: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print blocks and loop structure of a graph
    Inspect {
        /// Input graph description (JSON)
        input: PathBuf,

        /// Print the normalized graph description instead
        #[arg(long)]
        json: bool,
    },

    /// Export a graph to DOT format
    Dot {
        /// Input graph description (JSON)
        input: PathBuf,

        /// Output DOT file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not annotate the graph with its block order
        #[arg(long)]
        plain: bool,
    },

    /// Order several graphs in parallel
    Batch {
        /// Input graph descriptions (JSON)
        inputs: Vec<PathBuf>,

        /// Options file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Divisor used when deciding whether to defer a merge block
        #[arg(long)]
        merge_penalty: Option<f64>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Order {
            input,
            format,
            config,
            merge_penalty,
            no_verify,
            output,
        } => {
            let args = cli::order::OrderArgs {
                input: &input,
                format,
                config: config.as_deref(),
                merge_penalty,
                no_verify,
                output: output.as_deref(),
            };
            cli::order::order(&args).map_err(|e| miette!("{}", e))
        }
        Commands::Inspect { input, json } => {
            cli::inspect::inspect(&input, json).map_err(|e| miette!("{}", e))
        }
        Commands::Dot {
            input,
            output,
            plain,
        } => cli::dot::dot(&input, output.as_deref(), plain).map_err(|e| miette!("{}", e)),
        Commands::Batch {
            inputs,
            config,
            merge_penalty,
            json,
        } => cli::batch::batch(&inputs, config.as_deref(), merge_penalty, json)
            .map_err(|e| miette!("{:#}", e)),
    }
}
