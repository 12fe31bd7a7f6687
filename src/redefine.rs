//! Class-redefinition pipeline.
//!
//! On every intercepted class load the pipeline externalizes the class
//! bytes to a temp file, invokes the external bytecode transformer on it,
//! and reads the rewritten bytes back for the loader:
//!
//! ```text
//! class bytes -> input exchange file -> transformer process -> output
//! exchange file -> replacement bytes
//! ```
//!
//! The exchange-file pair is a single shared channel, so the whole sequence
//! runs under one lock; class loads arriving concurrently on other VM
//! threads queue behind it. The transformer is waited on synchronously with
//! no timeout, which blocks the owning callback thread for the lifetime of
//! the child process.
//!
//! A failure at any step is terminal for that one class: the caller is told
//! "no transformation" and the original bytes load unmodified. No retry.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::gate::BootstrapGate;
use crate::options::RedefineOptions;

#[derive(Debug, Error)]
pub enum RedefineError {
    #[error("failed to write class bytes to {path}: {source}")]
    WriteInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to clear output file {path}: {source}")]
    ClearOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to execute transformer {cmd}: {source}")]
    Spawn {
        cmd: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("transformer exited with {status}: {stderr}")]
    TransformerFailed { status: ExitStatus, stderr: String },
    #[error("failed to read transformed bytes from {path}: {source}")]
    ReadOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("transformer exited successfully but wrote no output")]
    EmptyOutput,
}

// =============================================================================
// Temp-file exchange
// =============================================================================

/// Truncate-and-write one exchange file.
pub fn write_exchange_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    fs::write(path, bytes)
}

/// Reads an exchange file back. A missing file is an error; an existing but
/// empty file yields an empty buffer. Whether "empty" counts as failure is
/// the pipeline's policy, not this function's.
pub fn read_exchange_file(path: &Path) -> io::Result<Vec<u8>> {
    fs::read(path)
}

// =============================================================================
// External transformer invocation
// =============================================================================

/// Outcome of a transformer run that at least started: the exit status plus
/// whatever it printed to stderr.
#[derive(Debug)]
pub struct Invocation {
    pub status: ExitStatus,
    pub stderr: String,
}

/// Spawns the transformer and waits for it to finish.
///
/// Only a spawn failure (e.g. the executable does not exist) is an `Err`;
/// a non-zero exit from a process that did run is reported as data in the
/// returned [`Invocation`] so the caller decides how to react.
pub fn run_transformer<I, S>(program: &Path, args: I) -> io::Result<Invocation>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()?;

    Ok(Invocation {
        status: output.status,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

// =============================================================================
// Pipeline
// =============================================================================

/// Orchestrates exchange files and the external transformer for one agent
/// lifetime. Constructed only when redefinition is configured.
pub struct Redefiner {
    options: RedefineOptions,
    gate: Arc<BootstrapGate>,
    // Guards the exchange-file pair; two concurrent class loads would
    // otherwise corrupt each other's channel to the transformer.
    exchange_lock: Mutex<()>,
}

impl Redefiner {
    pub fn new(options: RedefineOptions, gate: Arc<BootstrapGate>) -> Self {
        Self {
            options,
            gate,
            exchange_lock: Mutex::new(()),
        }
    }

    /// Runs one class through the transformer.
    ///
    /// `class_name` is the descriptor-form name from the class-file load
    /// hook (`a/b/C`); the dotted form is derived only for the transformer's
    /// command line, the bytes are never altered.
    ///
    /// Returns `Ok(None)` when the bootstrap gate is still closed (a logged
    /// no-op with zero side effects), `Ok(Some(bytes))` with the replacement
    /// on success, and `Err` on any pipeline failure.
    pub fn try_transform(
        &self,
        class_name: &str,
        class_data: &[u8],
    ) -> Result<Option<Vec<u8>>, RedefineError> {
        if !self.gate.is_ready() {
            warn!(
                "Ignoring load of class {} because the bootstrap class loader is not yet \
                 initialized. Transforming this class could cause spurious failures.",
                class_name
            );
            return Ok(None);
        }

        let dotted_name = class_name.replace('/', ".");
        let _guard = self.exchange_lock.lock();

        write_exchange_file(&self.options.input_path, class_data).map_err(|source| {
            RedefineError::WriteInput {
                path: self.options.input_path.clone(),
                source,
            }
        })?;

        // Clear the output file before the transformer runs, so a child that
        // dies without writing can never be confused with a stale result
        // from a previous class, even if its exit code is suppressed.
        write_exchange_file(&self.options.output_path, &[]).map_err(|source| {
            RedefineError::ClearOutput {
                path: self.options.output_path.clone(),
                source,
            }
        })?;

        debug!("running transformer for class {}", dotted_name);
        let invocation = run_transformer(
            &self.options.transformer_cmd,
            [
                // Always a full rewrite; partial rewrites exercise too little.
                OsStr::new("-x"),
                OsStr::new("full_rewrite"),
                OsStr::new("-e"),
                OsStr::new(&dotted_name),
                OsStr::new("-o"),
                self.options.output_path.as_os_str(),
                self.options.input_path.as_os_str(),
            ],
        )
        .map_err(|source| RedefineError::Spawn {
            cmd: self.options.transformer_cmd.clone(),
            source,
        })?;

        if !invocation.status.success() {
            return Err(RedefineError::TransformerFailed {
                status: invocation.status,
                stderr: invocation.stderr,
            });
        }

        let transformed = read_exchange_file(&self.options.output_path).map_err(|source| {
            RedefineError::ReadOutput {
                path: self.options.output_path.clone(),
                source,
            }
        })?;
        // Covers the transformer that reports success but writes nothing.
        if transformed.is_empty() {
            return Err(RedefineError::EmptyOutput);
        }

        Ok(Some(transformed))
    }
}
