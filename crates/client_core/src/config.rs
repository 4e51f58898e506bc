use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use shared::domain::{LlmChoice, LlmService, DEFAULT_OLLAMA_MODEL};
use tracing::debug;
use url::Url;

use crate::state::{ConcurrencyPolicy, InteractionConfig};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5001";
pub const DEFAULT_CONFIG_FILE: &str = "docagent.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub backend_url: String,
    pub banner_ttl_ms: u64,
    pub expire_upload_status: bool,
    pub concurrency: ConcurrencyPolicy,
    pub default_service: LlmService,
    pub ollama_model: String,
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.into(),
            banner_ttl_ms: 5_000,
            expire_upload_status: false,
            concurrency: ConcurrencyPolicy::Reject,
            default_service: LlmService::Gemini,
            ollama_model: DEFAULT_OLLAMA_MODEL.into(),
            request_timeout_secs: None,
        }
    }
}

impl ClientSettings {
    pub fn interaction_config(&self) -> InteractionConfig {
        InteractionConfig {
            banner_ttl: Duration::from_millis(self.banner_ttl_ms),
            expire_upload_status: self.expire_upload_status,
            concurrency: self.concurrency,
            initial_llm: LlmChoice {
                service: self.default_service,
                model_name: self.ollama_model.clone(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    backend_url: Option<String>,
    banner_ttl_ms: Option<u64>,
    expire_upload_status: Option<bool>,
    concurrency: Option<String>,
    llm_service: Option<String>,
    ollama_model: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then `docagent.toml` (or `$DOCAGENT_CONFIG`), then environment.
pub fn load_settings() -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    let path = std::env::var("DOCAGENT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
    if path.exists() {
        apply_file(&mut settings, &path)?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    settings.backend_url = normalize_backend_url(&settings.backend_url)?;
    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, path: &Path) -> anyhow::Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    apply_toml(settings, &raw).with_context(|| format!("invalid config file {}", path.display()))?;
    debug!(path = %path.display(), "loaded client config file");
    Ok(())
}

pub(crate) fn apply_toml(settings: &mut ClientSettings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileConfig = toml::from_str(raw)?;
    if let Some(v) = file_cfg.backend_url {
        settings.backend_url = v;
    }
    if let Some(v) = file_cfg.banner_ttl_ms {
        settings.banner_ttl_ms = v;
    }
    if let Some(v) = file_cfg.expire_upload_status {
        settings.expire_upload_status = v;
    }
    if let Some(v) = file_cfg.concurrency {
        settings.concurrency = parse_concurrency(&v)?;
    }
    if let Some(v) = file_cfg.llm_service {
        settings.default_service = v.parse()?;
    }
    if let Some(v) = file_cfg.ollama_model {
        settings.ollama_model = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = Some(v);
    }
    Ok(())
}

pub(crate) fn apply_env<F>(settings: &mut ClientSettings, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("DOCAGENT_BACKEND_URL") {
        settings.backend_url = v;
    }
    if let Some(v) = lookup("APP__BACKEND_URL") {
        settings.backend_url = v;
    }

    if let Some(v) = lookup("APP__BANNER_TTL_MS") {
        settings.banner_ttl_ms = v
            .parse()
            .with_context(|| format!("APP__BANNER_TTL_MS is not a number: {v}"))?;
    }
    if let Some(v) = lookup("APP__EXPIRE_UPLOAD_STATUS") {
        settings.expire_upload_status = parse_flag(&v)?;
    }
    if let Some(v) = lookup("APP__CONCURRENCY") {
        settings.concurrency = parse_concurrency(&v)?;
    }
    if let Some(v) = lookup("APP__LLM_SERVICE") {
        settings.default_service = v.parse()?;
    }
    if let Some(v) = lookup("APP__OLLAMA_MODEL") {
        settings.ollama_model = v;
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = Some(
            v.parse()
                .with_context(|| format!("APP__REQUEST_TIMEOUT_SECS is not a number: {v}"))?,
        );
    }
    Ok(())
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected a boolean, got `{other}`")),
    }
}

pub fn parse_concurrency(raw: &str) -> anyhow::Result<ConcurrencyPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "permit" => Ok(ConcurrencyPolicy::Permit),
        "reject" => Ok(ConcurrencyPolicy::Reject),
        other => Err(anyhow!(
            "unknown concurrency policy `{other}` (expected permit or reject)"
        )),
    }
}

pub fn normalize_backend_url(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(DEFAULT_BACKEND_URL.to_string());
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let parsed =
        Url::parse(&with_scheme).with_context(|| format!("invalid backend url `{raw}`"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!(
            "backend url must use http or https, got `{}`",
            parsed.scheme()
        ));
    }
    Ok(with_scheme.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
