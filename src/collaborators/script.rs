//! Collaborator implementations that shell out to a per-request script.
//!
//! Both scripts follow the same convention: positional arguments in, one
//! JSON object on stdout (possibly preceded by diagnostic log lines), and
//! free-form diagnostics on stderr. Diagnostics alone are never fatal.

use crate::collaborators::error::CollaboratorError;
use crate::collaborators::{PredictionRequest, RainPredictor, ValueExtractor};
use async_trait::async_trait;
use log::warn;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Runs `program` with `args`, returning the JSON object it printed.
///
/// The child is spawned with `kill_on_drop`, so a caller that drops this
/// future (typically because its timeout fired) terminates the process
/// instead of leaking it.
async fn run_script(program: &Path, args: &[String]) -> Result<Value, CollaboratorError> {
    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| CollaboratorError::Spawn(program.to_path_buf(), e))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        warn!("{} reported diagnostics: {}", program.display(), stderr.trim());
    }
    if !output.status.success() {
        warn!("{} exited with {}", program.display(), output.status);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_json_output(&stdout).ok_or(CollaboratorError::UnparseableOutput)
}

/// Finds the JSON object in a script's stdout.
///
/// Prefers the last single line that parses as an object (diagnostic lines
/// may precede it), then falls back to scanning the whole buffer for a
/// pretty-printed document.
fn parse_json_output(stdout: &str) -> Option<Value> {
    for line in stdout.lines().rev() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(line) {
            if value.is_object() {
                return Some(value);
            }
        }
    }
    let start = stdout.find('{')?;
    serde_json::from_str::<Value>(&stdout[start..])
        .ok()
        .filter(|value| value.is_object())
}

/// [`ValueExtractor`] that invokes an extraction script as
/// `<program> <lat> <lon> <file>` and reads `precip_mm_per_hr` from its
/// JSON output.
#[derive(Debug, Clone)]
pub struct ScriptExtractor {
    program: PathBuf,
}

impl ScriptExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        ScriptExtractor {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ValueExtractor for ScriptExtractor {
    async fn extract(
        &self,
        latitude: f64,
        longitude: f64,
        file_path: &Path,
    ) -> Result<f64, CollaboratorError> {
        let args = vec![
            latitude.to_string(),
            longitude.to_string(),
            file_path.display().to_string(),
        ];
        let value = run_script(&self.program, &args).await?;
        value
            .get("precip_mm_per_hr")
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or(CollaboratorError::NonNumericValue("precip_mm_per_hr"))
    }
}

/// [`RainPredictor`] that invokes the model runner as
/// `<program> <lat> <lon> <tz> <date> <time> [hint]` and returns its raw
/// JSON output for the adapter to normalize.
#[derive(Debug, Clone)]
pub struct ScriptPredictor {
    program: PathBuf,
}

impl ScriptPredictor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        ScriptPredictor {
            program: program.into(),
        }
    }
}

#[async_trait]
impl RainPredictor for ScriptPredictor {
    async fn predict(&self, request: &PredictionRequest) -> Result<Value, CollaboratorError> {
        let mut args = vec![
            request.latitude.to_string(),
            request.longitude.to_string(),
            request.tz_offset_hours.to_string(),
            request.date.format("%Y-%m-%d").to_string(),
            request.time.format("%H:%M").to_string(),
        ];
        if let Some(hint) = &request.location_hint {
            args.push(hint.clone());
        }
        run_script(&self.program, &args).await
    }
}
