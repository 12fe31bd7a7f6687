//! Attach-time option parsing.
//!
//! The option string is everything after `=` in
//! `-agentpath:libjvmti_stress.so=<options>`:
//!
//! ```text
//! jvmti-stress[,redefine,<transformer-cmd>,<input-temp>,<output-temp>][,trace]
//! ```
//!
//! The leading marker is mandatory. The optional segments may appear in
//! either order. Anything else is a configuration error, which is fatal at
//! attach time: the agent has no user to report to besides the log, so
//! `Agent_OnLoad` refuses to load rather than run half-configured.

use std::path::PathBuf;

use thiserror::Error;

/// First token every option string must carry.
pub const OPTIONS_MARKER: &str = "jvmti-stress";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("options should start with {OPTIONS_MARKER} (got {0:?})")]
    MissingMarker(String),
    #[error("unknown option: {0:?}")]
    UnknownOption(String),
    #[error("redefine requires <transformer-cmd>,<input-temp>,<output-temp>")]
    TruncatedRedefine,
}

/// Paths for the redefinition stress path. Present iff `redefine` was
/// configured, so a populated value always carries all three paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedefineOptions {
    /// External bytecode-rewriting tool to invoke per class.
    pub transformer_cmd: PathBuf,
    /// Exchange file the intercepted class bytes are written to.
    pub input_path: PathBuf,
    /// Exchange file the transformer writes its result to.
    pub output_path: PathBuf,
}

/// Parsed agent configuration. Built once in `Agent_OnLoad`, immutable
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StressOptions {
    pub trace: bool,
    pub redefine: Option<RedefineOptions>,
}

impl StressOptions {
    /// Decodes a raw option string.
    pub fn parse(raw: &str) -> Result<Self, OptionsError> {
        let mut tokens = raw.split(',');

        let marker = tokens.next().unwrap_or("");
        if marker != OPTIONS_MARKER {
            return Err(OptionsError::MissingMarker(marker.to_string()));
        }

        let mut options = StressOptions::default();
        while let Some(token) = tokens.next() {
            match token {
                "trace" => options.trace = true,
                "redefine" => {
                    // Consumes exactly the next three tokens, positionally.
                    let transformer_cmd = tokens.next().ok_or(OptionsError::TruncatedRedefine)?;
                    let input_path = tokens.next().ok_or(OptionsError::TruncatedRedefine)?;
                    let output_path = tokens.next().ok_or(OptionsError::TruncatedRedefine)?;
                    options.redefine = Some(RedefineOptions {
                        transformer_cmd: PathBuf::from(transformer_cmd),
                        input_path: PathBuf::from(input_path),
                        output_path: PathBuf::from(output_path),
                    });
                }
                other => return Err(OptionsError::UnknownOption(other.to_string())),
            }
        }

        Ok(options)
    }
}
