//! Configuration module
//!
//! Deployment configuration for the pipeline and worker, read from the
//! environment with `BACKDROP_`-prefixed keys.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which object-storage backend the worker wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    Memory,
}

/// Which synthesis strategy handles uploads that carry a creative prompt.
/// Prompt-less uploads always take the deterministic local path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStrategy {
    Copy,
    DirectEdit,
    SegmentInpaint,
    VisionGuided,
}

impl PromptStrategy {
    /// Whether this strategy calls a remote inference endpoint.
    pub fn is_remote(&self) -> bool {
        !matches!(self, PromptStrategy::Copy)
    }
}

impl FromStr for PromptStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "copy" => Ok(PromptStrategy::Copy),
            "direct_edit" => Ok(PromptStrategy::DirectEdit),
            "segment_inpaint" => Ok(PromptStrategy::SegmentInpaint),
            "vision_guided" => Ok(PromptStrategy::VisionGuided),
            _ => Err(anyhow::anyhow!("Invalid prompt strategy: {}", s)),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    // Object storage
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Inference endpoints
    pub inference_base_url: Option<String>,
    pub inference_api_key: Option<String>,
    pub edit_endpoint_id: String,
    pub segmentation_endpoint_id: String,
    pub vision_endpoint_id: String,
    // Strategy selection and parameters
    pub prompt_strategy: PromptStrategy,
    pub aspect_ratio: String,
    pub edit_mode: Option<String>,
    /// Backdrop color for the local high-fidelity path, as (r, g, b).
    pub backdrop_color: (u8, u8, u8),
    // Record resolution
    pub resolver_max_attempts: u32,
    pub resolver_retry_delay_ms: u64,
    // Invocation budget
    pub invocation_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const RESOLVER_MAX_ATTEMPTS: u32 = 5;
        const RESOLVER_RETRY_DELAY_MS: u64 = 1000;
        const INVOCATION_TIMEOUT_SECS: u64 = 300;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env::var("BACKDROP_STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            _ => StorageBackend::Local,
        };

        let prompt_strategy = env::var("BACKDROP_PROMPT_STRATEGY")
            .unwrap_or_else(|_| "vision_guided".to_string())
            .to_lowercase()
            .parse()?;

        let backdrop_color = parse_hex_color(
            &env::var("BACKDROP_COLOR").unwrap_or_else(|_| "#FFFFFF".to_string()),
        )?;

        Ok(Self {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            storage_backend,
            local_storage_path: env::var("BACKDROP_LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("BACKDROP_LOCAL_STORAGE_BASE_URL").ok(),
            inference_base_url: env::var("BACKDROP_INFERENCE_BASE_URL").ok(),
            inference_api_key: env::var("BACKDROP_INFERENCE_API_KEY").ok(),
            edit_endpoint_id: env::var("BACKDROP_EDIT_ENDPOINT")
                .unwrap_or_else(|_| "image-edit".to_string()),
            segmentation_endpoint_id: env::var("BACKDROP_SEGMENTATION_ENDPOINT")
                .unwrap_or_else(|_| "image-segmentation".to_string()),
            vision_endpoint_id: env::var("BACKDROP_VISION_ENDPOINT")
                .unwrap_or_else(|_| "vision-analysis".to_string()),
            prompt_strategy,
            aspect_ratio: env::var("BACKDROP_ASPECT_RATIO").unwrap_or_else(|_| "1:1".to_string()),
            edit_mode: env::var("BACKDROP_EDIT_MODE").ok(),
            backdrop_color,
            resolver_max_attempts: env::var("BACKDROP_RESOLVER_MAX_ATTEMPTS")
                .unwrap_or_else(|_| RESOLVER_MAX_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(RESOLVER_MAX_ATTEMPTS),
            resolver_retry_delay_ms: env::var("BACKDROP_RESOLVER_RETRY_DELAY_MS")
                .unwrap_or_else(|_| RESOLVER_RETRY_DELAY_MS.to_string())
                .parse()
                .unwrap_or(RESOLVER_RETRY_DELAY_MS),
            invocation_timeout_secs: env::var("BACKDROP_INVOCATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| INVOCATION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(INVOCATION_TIMEOUT_SECS),
        })
    }

    /// Reject combinations that cannot run.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.prompt_strategy.is_remote() && self.inference_base_url.is_none() {
            return Err(anyhow::anyhow!(
                "BACKDROP_INFERENCE_BASE_URL must be set when BACKDROP_PROMPT_STRATEGY is a remote strategy"
            ));
        }

        if self.storage_backend == StorageBackend::Local
            && (self.local_storage_path.is_none() || self.local_storage_base_url.is_none())
        {
            return Err(anyhow::anyhow!(
                "BACKDROP_LOCAL_STORAGE_PATH and BACKDROP_LOCAL_STORAGE_BASE_URL must be set for local storage"
            ));
        }

        if self.resolver_max_attempts == 0 {
            return Err(anyhow::anyhow!(
                "BACKDROP_RESOLVER_MAX_ATTEMPTS must be at least 1"
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn resolver_retry_delay(&self) -> Duration {
        Duration::from_millis(self.resolver_retry_delay_ms)
    }

    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_secs(self.invocation_timeout_secs)
    }
}

/// Parse a `#RRGGBB` color string into (r, g, b).
pub fn parse_hex_color(s: &str) -> Result<(u8, u8, u8), anyhow::Error> {
    let hex = s
        .strip_prefix('#')
        .ok_or_else(|| anyhow::anyhow!("Color must start with '#': {}", s))?;
    if hex.len() != 6 {
        return Err(anyhow::anyhow!("Color must be #RRGGBB: {}", s));
    }

    let r = u8::from_str_radix(&hex[0..2], 16)?;
    let g = u8::from_str_radix(&hex[2..4], 16)?;
    let b = u8::from_str_radix(&hex[4..6], 16)?;
    Ok((r, g, b))
}
