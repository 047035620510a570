use crate::cli::utils;
use crate::config::OrderOptions;
use crate::error::{Error, Result};
use crate::order::compute_block_orders;
use std::path::Path;

/// Export a graph to DOT, annotated with its block order unless `plain`
pub fn dot(input_path: &Path, output_dot: Option<&Path>, plain: bool) -> Result<()> {
    let cfg = utils::load_cfg(input_path)?;

    let dot_content = if plain {
        cfg.to_dot()
    } else {
        let order = compute_block_orders(&cfg, &OrderOptions::default());
        cfg.to_dot_with_order(&order)
    };

    match output_dot {
        Some(path) => {
            std::fs::write(path, dot_content)
                .map_err(|e| Error::Io(format!("Failed to write DOT file: {}", e)))?;
            log::info!("DOT exported to: {}", path.display());
            Ok(())
        }
        None => utils::write_output(&dot_content, None),
    }
}
