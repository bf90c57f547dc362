//! Loading build-family known-issue declarations from disk.
//!
//! Each build suffix has its own source file: `<dir>/<build_suffix>.json`.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{KnownIssueData, validate_known_issues};

/// Read and validate the known issues of a build suffix.
///
/// A missing source file means no known issues are declared for the family.
pub async fn load_known_issues(dir: &Path, build_suffix: &str) -> AppResult<Vec<KnownIssueData>> {
    if build_suffix.is_empty()
        || !build_suffix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::InvalidInput(format!(
            "invalid build suffix '{}'",
            build_suffix
        )));
    }

    let path = dir.join(format!("{}.json", build_suffix));
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No known issue source at {}", path.display());
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(AppError::InvalidInput(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )));
        }
    };

    let data: Vec<KnownIssueData> = serde_json::from_slice(&bytes).map_err(|e| {
        AppError::InvalidInput(format!("malformed known issues in {}: {}", path.display(), e))
    })?;
    validate_known_issues(&data)?;

    debug!(
        "Loaded {} known issue entries from {}",
        data.len(),
        path.display()
    );
    Ok(data)
}
