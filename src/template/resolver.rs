//! Template resolution.
//!
//! Callers hand the engine a template reference in whatever form they have
//! (inline structure, serialized body, file path, remote URL); the resolver
//! turns it into the single form the control plane accepts: a serialized
//! body or a remote reference. Template content is never transformed beyond
//! serialization.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, TemplateError};

/// A template reference as supplied by the caller.
#[derive(Debug, Clone)]
pub enum TemplateInput {
    /// An in-memory template structure.
    Inline(serde_json::Value),
    /// An already-serialized template body.
    Body(String),
    /// A path to a local template file (JSON or YAML).
    Path(PathBuf),
    /// A remote template URL.
    Url(String),
}

impl TemplateInput {
    /// Guesses the input kind from a raw CLI argument.
    ///
    /// `http(s)` prefixes are URLs, a leading brace is an inline JSON body,
    /// anything else is treated as a file path.
    #[must_use]
    pub fn detect(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Self::Url(trimmed.to_string());
        }
        if trimmed.starts_with('{') {
            return Self::Body(trimmed.to_string());
        }
        Self::Path(PathBuf::from(trimmed))
    }
}

/// A resolved template, ready to attach to a control-plane call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Serialized template body.
    Body(String),
    /// Remote reference the control plane fetches itself.
    Url(String),
}

/// Turns a [`TemplateInput`] into a [`TemplateSource`].
#[async_trait]
pub trait TemplateResolver: Send + Sync {
    /// Resolves the given template reference.
    async fn resolve(&self, input: TemplateInput) -> Result<TemplateSource>;
}

/// Default resolver covering inline values, bodies, local files, and URLs.
#[derive(Debug, Default)]
pub struct DefaultTemplateResolver {
    /// HTTP client for non-S3 remote templates.
    http: reqwest::Client,
}

impl DefaultTemplateResolver {
    /// Creates a new resolver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Reads a local template file, serializing YAML files to JSON.
    fn read_file(path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(TemplateError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        debug!("Reading template from: {}", path.display());

        let raw = std::fs::read_to_string(path).map_err(|e| {
            TemplateError::parse(format!("Failed to read {}: {e}", path.display()))
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            let value: serde_yaml::Value = serde_yaml::from_str(&raw)
                .map_err(|e| TemplateError::parse(format!("YAML parse error: {e}")))?;
            Ok(serde_json::to_string(&value)
                .map_err(|e| TemplateError::parse(format!("YAML to JSON error: {e}")))?)
        } else {
            Ok(raw)
        }
    }

    /// Fetches a remote template body over HTTP.
    async fn fetch_url(&self, url: &str) -> Result<String> {
        debug!("Fetching template from: {url}");

        let response = self.http.get(url).send().await.map_err(|e| {
            TemplateError::FetchFailed {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(TemplateError::FetchFailed {
                url: url.to_string(),
                message: format!("HTTP status {}", response.status()),
            }
            .into());
        }

        Ok(response.text().await.map_err(|e| TemplateError::FetchFailed {
            url: url.to_string(),
            message: e.to_string(),
        })?)
    }

    /// S3 URLs are handed to the control plane untouched; it can only
    /// fetch template references from S3.
    fn is_remote_reference(url: &str) -> bool {
        url.contains(".amazonaws.com/")
    }
}

#[async_trait]
impl TemplateResolver for DefaultTemplateResolver {
    async fn resolve(&self, input: TemplateInput) -> Result<TemplateSource> {
        match input {
            TemplateInput::Inline(value) => Ok(TemplateSource::Body(
                serde_json::to_string(&value)
                    .map_err(|e| TemplateError::parse(format!("JSON serialize error: {e}")))?,
            )),
            TemplateInput::Body(body) => Ok(TemplateSource::Body(body)),
            TemplateInput::Path(path) => Ok(TemplateSource::Body(Self::read_file(&path)?)),
            TemplateInput::Url(url) if Self::is_remote_reference(&url) => {
                Ok(TemplateSource::Url(url))
            }
            TemplateInput::Url(url) => Ok(TemplateSource::Body(self.fetch_url(&url).await?)),
        }
    }
}
