//! `logseal verify`: check a log file against its signature.

use crate::cmd::sign::default_signature_path;
use crate::hasher::FileHasher;
use crate::output::{OutputMode, pretty_kv, render};
use crate::signature::Signature;
use anyhow::{Result, bail};
use clap::Args;
use logseal_core::ProjectConfig;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Log file to verify.
    pub file: PathBuf,

    /// Signature to verify against. Defaults to `<file>.sig`.
    pub signature: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    /// The file must hash to the signed root.
    Exact,
    /// The signed root must survive as a node of the current tree.
    Append,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub file: String,
    pub valid: bool,
    pub mode: VerifyMode,
    pub algorithm: String,
    pub signed_root: String,
    pub current_root: String,
    pub signed_events: u64,
    pub current_events: u64,
}

/// Hash `path` as `signature` prescribes and compare.
///
/// Append-only signatures pass when the signed root is still the root of the
/// file's leading lines; a missing or displaced root is a failed
/// verification, not an error.
///
/// # Errors
///
/// Fails if the file cannot be hashed or the signature is malformed.
pub fn verify_file(signature: &Signature, path: &Path, config: &ProjectConfig) -> Result<VerifyReport> {
    let signed_root = signature.root_digest()?;
    let aggregator = super::aggregator_config(config, Some(signature.algorithm.as_str()));
    let tree = FileHasher::new(aggregator)
        .with_prev_event_count(signature.event_count)
        .hash_file(path)?;
    let current_root = tree.root_digest()?;

    let (mode, valid) = if signature.append_allowed {
        // The signed root must still validate and sit on the left spine,
        // so it covers lines [0, signed_events) and nothing was put in front.
        let valid = match tree.hash_chain_for_digest(&signed_root) {
            Ok(chain) => chain.is_left_spine() && tree.is_valid_digest(&signed_root)?,
            Err(logseal_core::Error::DigestNotFound(_)) => false,
            Err(err) => return Err(err.into()),
        };
        (VerifyMode::Append, valid)
    } else {
        (VerifyMode::Exact, current_root == &signed_root)
    };

    Ok(VerifyReport {
        file: path.display().to_string(),
        valid,
        mode,
        algorithm: signature.algorithm.clone(),
        signed_root: signature.root.clone(),
        current_root: current_root.to_hex(),
        signed_events: signature.event_count,
        current_events: tree.leaf_count(),
    })
}

pub fn run_verify(args: &VerifyArgs, output: OutputMode, config: &ProjectConfig) -> Result<()> {
    let signature_path = args
        .signature
        .clone()
        .unwrap_or_else(|| default_signature_path(&args.file));
    let signature = Signature::read_from(&signature_path)?;
    let report = verify_file(&signature, &args.file, config)?;

    if report.valid {
        info!(file = %report.file, mode = ?report.mode, "verification successful");
    } else {
        warn!(file = %report.file, mode = ?report.mode, "verification failed");
    }

    render(output, &report, |r, w| {
        writeln!(
            w,
            "Verification {}",
            if r.valid { "successful" } else { "failed" }
        )?;
        pretty_kv(w, "file", &r.file)?;
        pretty_kv(w, "mode", format!("{:?}", r.mode).to_lowercase())?;
        pretty_kv(w, "events", format!("{} signed, {} now", r.signed_events, r.current_events))?;
        pretty_kv(w, "signed", &r.signed_root)?;
        pretty_kv(w, "current", &r.current_root)
    })?;

    if !report.valid {
        bail!("verification failed for {}", args.file.display());
    }
    Ok(())
}
