use crate::cfg::BlockId;
use crate::cli::utils;
use crate::config::OrderOptions;
use crate::error::{Error, Result};
use crate::order::{compute_block_orders, verify, BlockOrder};
use serde::Serialize;
use std::path::Path;

/// Output format of the order subcommand
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct OrderReport<'a> {
    name: Option<&'a str>,
    block_count: usize,
    code_emitting: &'a [BlockId],
    linear_scan: &'a [BlockId],
    aligned: Vec<BlockId>,
    loops_contiguous: bool,
}

/// Arguments of the order subcommand
#[derive(Debug, Clone)]
pub struct OrderArgs<'a> {
    pub input: &'a Path,
    pub format: OutputFormat,
    pub config: Option<&'a Path>,
    pub merge_penalty: Option<f64>,
    pub no_verify: bool,
    pub output: Option<&'a Path>,
}

/// Compute and print both block orders for one graph
pub fn order(args: &OrderArgs<'_>) -> Result<()> {
    let cfg = utils::load_cfg(args.input)?;
    let options: OrderOptions =
        utils::resolve_options(args.config, args.merge_penalty, args.no_verify)?;

    let result = compute_block_orders(&cfg, &options);
    let contiguous = verify::check_loop_contiguity(&cfg, &result.code_emitting).is_ok();

    let content = match args.format {
        OutputFormat::Json => {
            let report = OrderReport {
                name: cfg.name(),
                block_count: cfg.graph().node_count(),
                code_emitting: &result.code_emitting,
                linear_scan: &result.linear_scan,
                aligned: result.aligned_blocks(),
                loops_contiguous: contiguous,
            };
            serde_json::to_string_pretty(&report)
                .map_err(|e| Error::internal(format!("Failed to serialize order report: {}", e)))?
        }
        OutputFormat::Text => format_text(cfg.name(), &result, contiguous),
    };

    utils::write_output(&content, args.output)
}

fn join(blocks: &[BlockId]) -> String {
    blocks
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_text(name: Option<&str>, result: &BlockOrder, contiguous: bool) -> String {
    let mut out = String::new();
    if let Some(name) = name {
        out.push_str(&format!("Graph: {}\n", name));
    }
    out.push_str(&format!("Blocks: {}\n", result.code_emitting.len()));
    out.push_str(&format!("Code emitting order: {}\n", join(&result.code_emitting)));
    out.push_str(&format!("Linear scan order: {}\n", join(&result.linear_scan)));
    let aligned = result.aligned_blocks();
    if aligned.is_empty() {
        out.push_str("Aligned blocks: none\n");
    } else {
        out.push_str(&format!("Aligned blocks: {}\n", join(&aligned)));
    }
    if !contiguous {
        out.push_str("Warning: some loops are not laid out contiguously\n");
    }
    out.trim_end().to_string()
}
