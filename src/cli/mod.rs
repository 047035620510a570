//! Command-line interface module
//!
//! This module contains the implementations for the CLI subcommands.

pub mod batch;
pub mod dot;
pub mod inspect;
pub mod order;

/// Common CLI utilities
pub mod utils {
    use crate::cfg::{Cfg, GraphDescription};
    use crate::config::OrderOptions;
    use crate::error::Result;
    use std::path::Path;

    /// Read a graph description and build its CFG
    pub fn load_cfg(path: &Path) -> Result<Cfg> {
        let description = GraphDescription::from_file(path)?;
        let mut cfg = description.to_cfg()?;
        if cfg.name().is_none() {
            if let Some(stem) = path.file_stem() {
                cfg = cfg.with_name(stem.to_string_lossy());
            }
        }
        Ok(cfg)
    }

    /// Options from an optional config file, overridden by flags
    pub fn resolve_options(
        config: Option<&Path>,
        merge_penalty: Option<f64>,
        no_verify: bool,
    ) -> Result<OrderOptions> {
        let mut options = match config {
            Some(path) => OrderOptions::from_json_file(path)?,
            None => OrderOptions::default(),
        };
        if let Some(penalty) = merge_penalty {
            options = options.with_merge_penalty(penalty);
        }
        if no_verify {
            options = options.with_verify(false);
        }
        options.validate()?;
        Ok(options)
    }

    /// Write output to file or stdout
    pub fn write_output(content: &str, output_path: Option<&Path>) -> Result<()> {
        match output_path {
            Some(path) => std::fs::write(path, content).map_err(crate::error::Error::from),
            None => {
                println!("{}", content);
                Ok(())
            }
        }
    }
}
