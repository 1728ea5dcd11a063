//! `logseal sign`: hash a log file and write its signature.

use crate::hasher::FileHasher;
use crate::output::{OutputMode, pretty_kv, render};
use crate::signature::Signature;
use anyhow::Result;
use clap::Args;
use logseal_core::{AggregatorConfig, ProjectConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct SignArgs {
    /// Log file to sign.
    pub file: PathBuf,

    /// Signature output path. Defaults to `<file>.sig`.
    pub signature: Option<PathBuf>,

    /// Hash algorithm: SHA-256, SHA-1, MD5 or BLAKE3.
    #[arg(short, long)]
    pub algorithm: Option<String>,

    /// Keep the signature valid when lines are appended later.
    #[arg(long)]
    pub allow_append: bool,
}

#[derive(Debug, Serialize)]
struct SignReport<'a> {
    file: String,
    signature_file: String,
    #[serde(flatten)]
    signature: &'a Signature,
}

/// Path used when no signature path is given.
pub fn default_signature_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(".sig");
    PathBuf::from(name)
}

/// Hash `path` and describe it as a signature.
///
/// # Errors
///
/// Propagates hashing failures.
pub fn sign_file(path: &Path, append_allowed: bool, config: AggregatorConfig) -> Result<Signature> {
    let tree = FileHasher::new(config).hash_file(path)?;
    Signature::from_tree(&tree, append_allowed)
}

pub fn run_sign(args: &SignArgs, output: OutputMode, config: &ProjectConfig) -> Result<()> {
    let aggregator = super::aggregator_config(config, args.algorithm.as_deref());
    let append_allowed = args.allow_append || config.sign.allow_append;

    let signature = sign_file(&args.file, append_allowed, aggregator)?;
    let signature_path = args
        .signature
        .clone()
        .unwrap_or_else(|| default_signature_path(&args.file));
    signature.write_to(&signature_path)?;

    info!(
        file = %args.file.display(),
        events = signature.event_count,
        append_allowed,
        "log signed"
    );

    let report = SignReport {
        file: args.file.display().to_string(),
        signature_file: signature_path.display().to_string(),
        signature: &signature,
    };
    render(output, &report, |r, w| {
        pretty_kv(w, "signed", &r.file)?;
        pretty_kv(w, "root", &r.signature.root)?;
        pretty_kv(w, "algorithm", &r.signature.algorithm)?;
        pretty_kv(w, "events", r.signature.event_count.to_string())?;
        pretty_kv(w, "append", if r.signature.append_allowed { "allowed" } else { "no" })?;
        pretty_kv(w, "signature", &r.signature_file)
    })
}
