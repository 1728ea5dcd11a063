//! `logseal chain` and `logseal check-chain`: extract an event's hash chain
//! from a log file, and re-check a saved chain offline.

use crate::hasher::FileHasher;
use crate::output::{OutputMode, pretty_kv, render};
use crate::signature::Signature;
use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use logseal_core::{Digest, HashAlgorithm, HashChain, ProjectConfig, Side};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone)]
pub struct ChainArgs {
    /// Log file to build the tree from.
    pub file: PathBuf,

    /// Event (one full line) to extract the chain for.
    pub event: String,

    /// Hash algorithm: SHA-256, SHA-1, MD5 or BLAKE3.
    #[arg(short, long)]
    pub algorithm: Option<String>,

    /// Also write the chain as JSON to this file.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckChainArgs {
    /// Chain file written by `logseal chain --out`.
    pub chain: PathBuf,

    /// Signature whose root the chain must end in.
    #[arg(long)]
    pub signature: Option<PathBuf>,
}

/// One chain digest and the side it took in its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub digest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
}

/// Serialized form of a [`HashChain`]: leaf first, root last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    pub algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub digests: Vec<ChainEntry>,
}

impl ChainRecord {
    pub fn from_chain(chain: &HashChain, event: Option<&str>) -> Self {
        Self {
            algorithm: chain.root().algorithm().name().to_string(),
            event: event.map(str::to_string),
            digests: chain
                .as_slice()
                .iter()
                .map(|digest| ChainEntry {
                    digest: digest.to_hex(),
                    side: digest.side(),
                })
                .collect(),
        }
    }

    /// Parse the stored digests back into a chain.
    ///
    /// # Errors
    ///
    /// Fails on an unknown algorithm, bad hex, or fewer than two digests.
    pub fn to_chain(&self) -> Result<HashChain> {
        let algorithm: HashAlgorithm = self.algorithm.parse()?;
        let digests = self
            .digests
            .iter()
            .map(|entry| {
                Digest::from_hex(&entry.digest, algorithm)
                    .map(|digest| digest.with_side(entry.side))
                    .with_context(|| format!("Malformed digest in chain: {}", entry.digest))
            })
            .collect::<Result<Vec<_>>>()?;
        HashChain::from_digests(digests).ok_or_else(|| anyhow!("chain needs a leaf and a root"))
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, format!("{json}\n"))
            .with_context(|| format!("Failed to write chain {}", path.display()))
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read chain {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse chain {}", path.display()))
    }
}

fn write_entries(w: &mut dyn Write, record: &ChainRecord) -> std::io::Result<()> {
    let last = record.digests.len().saturating_sub(1);
    for (i, entry) in record.digests.iter().enumerate() {
        let label = if i == 0 {
            "leaf".to_string()
        } else if i == last {
            "root".to_string()
        } else {
            entry.side.map_or_else(|| "sibling".to_string(), |side| side.to_string())
        };
        writeln!(w, "{label:<7} {}", entry.digest)?;
    }
    Ok(())
}

/// Build the tree for `path` and extract the chain for `event`.
///
/// # Errors
///
/// Fails if the file cannot be hashed; [`logseal_core::Error::DigestNotFound`]
/// if `event` is not a line of the file.
pub fn chain_for_event(
    path: &Path,
    event: &str,
    config: &ProjectConfig,
    algorithm: Option<&str>,
) -> Result<ChainRecord> {
    let tree = FileHasher::new(super::aggregator_config(config, algorithm)).hash_file(path)?;
    let chain = tree.hash_chain(event)?;
    Ok(ChainRecord::from_chain(&chain, Some(event)))
}

pub fn run_chain(args: &ChainArgs, output: OutputMode, config: &ProjectConfig) -> Result<()> {
    let record = chain_for_event(&args.file, &args.event, config, args.algorithm.as_deref())?;

    if let Some(out) = &args.out {
        record.write_to(out)?;
    }

    render(output, &record, |r, w| {
        write_entries(w, r)?;
        if let Some(out) = &args.out {
            writeln!(w, "output written to: {}", out.display())?;
        }
        Ok(())
    })
}

#[derive(Debug, Serialize)]
struct CheckReport {
    valid: bool,
    consistent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    matches_signature: Option<bool>,
    root: String,
}

pub fn run_check_chain(args: &CheckChainArgs, output: OutputMode) -> Result<()> {
    let record = ChainRecord::read_from(&args.chain)?;
    let chain = record.to_chain()?;
    let consistent = chain.is_consistent()?;

    let matches_signature = match &args.signature {
        Some(path) => Some(&Signature::read_from(path)?.root_digest()? == chain.root()),
        None => None,
    };

    let report = CheckReport {
        valid: consistent && matches_signature.unwrap_or(true),
        consistent,
        matches_signature,
        root: chain.root().to_hex(),
    };
    render(output, &report, |r, w| {
        writeln!(w, "Chain {}", if r.valid { "valid" } else { "invalid" })?;
        pretty_kv(w, "root", &r.root)?;
        pretty_kv(w, "consistent", r.consistent.to_string())?;
        if let Some(matches) = r.matches_signature {
            pretty_kv(w, "signature", if matches { "matches" } else { "differs" })?;
        }
        Ok(())
    })?;

    if !report.valid {
        bail!("chain check failed for {}", args.chain.display());
    }
    Ok(())
}
