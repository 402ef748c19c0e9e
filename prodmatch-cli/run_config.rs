use crate::error::{PipelineError, PipelineResult};
use prodmatch_core::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// One comparison job described in a JSON or TOML file.
///
/// Relative paths are resolved against the directory holding the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub image_1_path: PathBuf,
    pub image_2_path: PathBuf,
    /// Overrides `pipeline.threshold` when set
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub output_filename: Option<String>,
    #[serde(default)]
    pub pipeline: Option<PipelineConfig>,
}

impl RunConfig {
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        serde_json::from_str(json).map_err(|e| PipelineError::Config(e.to_string()))
    }

    pub fn from_toml(toml_str: &str) -> PipelineResult<Self> {
        toml::from_str(toml_str).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Load from a `.json` or `.toml` file, picked by extension
    pub fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Effective pipeline settings, validated
    pub fn pipeline_config(&self) -> PipelineResult<PipelineConfig> {
        let mut cfg = self.pipeline.clone().unwrap_or_default();
        if let Some(threshold) = self.threshold {
            cfg.threshold = threshold;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Both image paths joined onto `base_dir`. With `sandbox`, each must
    /// resolve to an existing file inside `base_dir`.
    pub fn image_paths(&self, base_dir: &Path, sandbox: bool) -> PipelineResult<(PathBuf, PathBuf)> {
        let resolve = |p: &Path| resolve_path(base_dir, p, sandbox);
        Ok((resolve(&self.image_1_path)?, resolve(&self.image_2_path)?))
    }

    /// Where the side-by-side image goes, if the run asks for one. With
    /// `sandbox` the output directory must be relative and free of `..`.
    pub fn output_path(&self, base_dir: &Path, sandbox: bool) -> PipelineResult<Option<PathBuf>> {
        let Some(dir) = self.output_dir.as_ref() else {
            return Ok(None);
        };
        if sandbox && dir.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)) {
            return Err(PipelineError::PathEscape(dir.clone()));
        }
        let name = self.output_filename.as_deref().unwrap_or("comparison.png");
        Ok(Some(base_dir.join(dir).join(name)))
    }
}

/// Join `candidate` onto `base_dir`; with `sandbox` the canonical result must
/// stay inside the canonical `base_dir`.
pub fn resolve_path(base_dir: &Path, candidate: &Path, sandbox: bool) -> PipelineResult<PathBuf> {
    let joined = base_dir.join(candidate);
    if !sandbox {
        return Ok(joined);
    }
    let base = base_dir.canonicalize()?;
    let resolved = joined.canonicalize()?;
    if resolved.starts_with(&base) {
        Ok(resolved)
    } else {
        Err(PipelineError::PathEscape(candidate.to_path_buf()))
    }
}
