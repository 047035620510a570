//! Serialized graph descriptions
//!
//! JSON form of a block graph, used by the command line tool and tests.

use crate::cfg::block::BlockId;
use crate::cfg::builder::CfgBuilder;
use crate::cfg::Cfg;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_probability() -> f64 {
    1.0
}

/// One block of a serialized graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDescription {
    pub id: usize,
    #[serde(default = "default_probability")]
    pub probability: f64,
    #[serde(default)]
    pub successors: Vec<usize>,
    /// Overrides inverted-loop detection when this block is a loop header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverted: Option<bool>,
}

/// A serialized block graph; block 0 is the start block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub blocks: Vec<BlockDescription>,
}

impl GraphDescription {
    /// Parse a description from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a description from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&data)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the CFG this description denotes
    pub fn to_cfg(&self) -> Result<Cfg> {
        let count = self.blocks.len();
        let mut slots: Vec<Option<&BlockDescription>> = vec![None; count];
        for block in &self.blocks {
            let slot = slots.get_mut(block.id).ok_or_else(|| {
                Error::invalid_graph(format!(
                    "block id {} out of range, ids must be 0..{}",
                    block.id, count
                ))
            })?;
            if slot.is_some() {
                return Err(Error::invalid_graph(format!(
                    "block id {} declared twice",
                    block.id
                )));
            }
            *slot = Some(block);
        }

        let mut builder = match &self.name {
            Some(name) => CfgBuilder::new().with_name(name.clone()),
            None => CfgBuilder::new(),
        };
        // Every slot is filled: `count` distinct ids in `0..count`.
        let ordered: Vec<&BlockDescription> = slots.into_iter().flatten().collect();
        for block in &ordered {
            builder.add_block(block.probability);
        }
        for block in &ordered {
            for &succ in &block.successors {
                builder.add_edge(BlockId(block.id), BlockId(succ));
            }
            if let Some(inverted) = block.inverted {
                builder.set_inverted(BlockId(block.id), inverted);
            }
        }

        builder.build()
    }
}

impl From<&Cfg> for GraphDescription {
    fn from(cfg: &Cfg) -> Self {
        let blocks = cfg
            .blocks()
            .map(|block| BlockDescription {
                id: block.id.index(),
                probability: block.probability,
                successors: block.successors.iter().map(|s| s.index()).collect(),
                inverted: block
                    .loop_id
                    .filter(|_| block.is_loop_header)
                    .map(|l| cfg.get_loop(l).inverted),
            })
            .collect();
        Self {
            name: cfg.name().map(str::to_string),
            blocks,
        }
    }
}
