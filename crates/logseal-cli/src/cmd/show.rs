//! `logseal show`: draw the tree of a log file.

use crate::hasher::FileHasher;
use crate::output::{OutputMode, render};
use anyhow::{Context, Result};
use clap::Args;
use logseal_core::{ProjectConfig, render_tree};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Log file to draw.
    pub file: PathBuf,

    /// Hash algorithm: SHA-256, SHA-1, MD5 or BLAKE3.
    #[arg(short, long)]
    pub algorithm: Option<String>,

    /// Hex characters shown per node; 0 shows full digests.
    #[arg(short, long, default_value_t = 8)]
    pub width: usize,

    /// Also write the drawing to this file.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ShowReport {
    file: String,
    algorithm: String,
    events: u64,
    nodes: usize,
    depth: u32,
    root: String,
    drawing: String,
}

pub fn run_show(args: &ShowArgs, output: OutputMode, config: &ProjectConfig) -> Result<()> {
    let aggregator = super::aggregator_config(config, args.algorithm.as_deref());
    let tree = FileHasher::new(aggregator).hash_file(&args.file)?;
    let drawing = render_tree(&tree, args.width)?;

    if let Some(out) = &args.out {
        fs::write(out, &drawing).with_context(|| format!("Failed to write {}", out.display()))?;
    }

    let root = tree.root_digest()?;
    let report = ShowReport {
        file: args.file.display().to_string(),
        algorithm: root.algorithm().name().to_string(),
        events: tree.leaf_count(),
        nodes: tree.node_count(),
        depth: tree.depth().unwrap_or_default(),
        root: root.to_hex(),
        drawing,
    };
    render(output, &report, |r, w| {
        write!(w, "{}", r.drawing)?;
        if let Some(out) = &args.out {
            writeln!(w, "output written to: {}", out.display())?;
        }
        Ok(())
    })
}
