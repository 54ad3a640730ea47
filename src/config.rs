use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_base: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GENERATION_API_KEY".to_string(),
            timeout_ms: 30_000,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

impl GenerationConfig {
    pub fn api_key(&self) -> Option<String> {
        env::var(&self.api_key_env)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 1000,
            max_delay_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    pub cache_ttl_secs: u64,
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
    pub default_limit: i64,
    pub default_plan: String,
    pub admin_users: Vec<String>,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            endpoint: None,
            timeout_ms: 5000,
            default_limit: 10,
            default_plan: "free".to_string(),
            admin_users: Vec::new(),
        }
    }
}

impl UsageConfig {
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_users
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(user_id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub dir: PathBuf,
    pub cap: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/history"),
            cap: 50,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub generation: GenerationConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub usage: UsageConfig,
    pub history: HistoryConfig,
}

impl EnhancerConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), String> {
        let config_path = path.or_else(default_config_path);
        let mut config = if let Some(path) = config_path.as_ref() {
            if path.exists() {
                let contents = std::fs::read_to_string(path)
                    .map_err(|err| format!("failed to read config: {}", err))?;
                toml::from_str(&contents)
                    .map_err(|err| format!("failed to parse config: {}", err))?
            } else {
                EnhancerConfig::default()
            }
        } else {
            EnhancerConfig::default()
        };

        config.apply_env_overrides();
        Ok((config, config_path))
    }

    pub fn write(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| format!("failed to create config dir: {}", err))?;
        }
        let payload = toml::to_string_pretty(self)
            .map_err(|err| format!("failed to serialize config: {}", err))?;
        std::fs::write(path, payload)
            .map_err(|err| format!("failed to write config: {}", err))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(api_base) = env::var("GENERATION_API_BASE") {
            if !api_base.trim().is_empty() {
                self.generation.api_base = api_base;
            }
        }
        if let Ok(model) = env::var("GENERATION_MODEL") {
            if !model.trim().is_empty() {
                self.generation.model = model;
            }
        }
        if let Ok(timeout) = env::var("GENERATION_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.generation.timeout_ms = value;
            }
        }
        if let Ok(endpoint) = env::var("ENTITLEMENT_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.usage.endpoint = Some(endpoint);
            }
        }
        if let Ok(dir) = env::var("HISTORY_DIR") {
            if !dir.trim().is_empty() {
                self.history.dir = PathBuf::from(dir);
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    env::var("ENHANCER_CONFIG_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/enhancer.toml")))
}
