use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    stable_hash64, Category, EnhancementRequest, EnhancementResult, PlatformContent, Tone,
};

pub const GUEST_KEY: &str = "guest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalHistoryRecord {
    pub id: String,
    pub original_text: String,
    pub platform_content: PlatformContent,
    pub category: Category,
    pub tone: Tone,
    pub virality_score: Option<u8>,
    pub insights: Vec<String>,
    pub view_reasons: Vec<String>,
    pub quick_wins: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl LocalHistoryRecord {
    pub fn from_result(request: &EnhancementRequest, result: &EnhancementResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            original_text: request.original_text().to_string(),
            platform_content: result.platform_content.clone(),
            category: request.category(),
            tone: request.tone(),
            virality_score: Some(result.diagnostics.virality_score),
            insights: result.diagnostics.insights.clone(),
            view_reasons: result.diagnostics.view_reasons.clone(),
            quick_wins: result.diagnostics.quick_wins.clone(),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, String>;
    async fn set(&self, key: &str, value: String) -> Result<(), String>;
    async fn remove(&self, key: &str) -> Result<(), String>;
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        let guard = self.values.lock().await;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), String> {
        let mut guard = self.values.lock().await;
        guard.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        let mut guard = self.values.lock().await;
        guard.remove(key);
        Ok(())
    }
}

/// One JSON file per key under `dir`, replaced atomically on write.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let readable: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .take(48)
            .collect();
        self.dir
            .join(format!("{}-{:08x}.json", readable, stable_hash64(key) as u32))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        tokio::fs::read_to_string(&path)
            .await
            .map(Some)
            .map_err(|err| format!("failed to read history: {}", err))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), String> {
        ensure_dir(&self.dir).await?;
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, value)
            .await
            .map_err(|err| format!("failed to write history: {}", err))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|err| format!("failed to finalize history: {}", err))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(());
        }
        tokio::fs::remove_file(&path)
            .await
            .map_err(|err| format!("failed to remove history: {}", err))
    }
}

async fn ensure_dir(path: &Path) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|err| format!("failed to create history dir: {}", err))
}

/// Newest-first, capped list of records per identity.
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    cap: usize,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>, cap: usize) -> Self {
        Self {
            store,
            cap: cap.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn storage_key(identity_key: &str) -> String {
        format!("history:{}", identity_key)
    }

    /// Unreadable or corrupt data reads as an empty history.
    pub async fn list(&self, identity_key: &str) -> Vec<LocalHistoryRecord> {
        let key = Self::storage_key(identity_key);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(identity = identity_key, "history read failed: {}", err);
                return Vec::new();
            }
        };
        if raw.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str::<Vec<LocalHistoryRecord>>(&raw) {
            Ok(records) => records,
            Err(err) => {
                warn!(identity = identity_key, "discarding corrupt history: {}", err);
                Vec::new()
            }
        }
    }

    pub async fn append(&self, identity_key: &str, record: LocalHistoryRecord) -> Result<(), String> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.list(identity_key).await;
        records.insert(0, record);
        if records.len() > self.cap {
            records.truncate(self.cap);
        }
        let payload = serde_json::to_string(&records)
            .map_err(|err| format!("failed to serialize history: {}", err))?;
        self.store.set(&Self::storage_key(identity_key), payload).await
    }

    pub async fn clear(&self, identity_key: &str) -> Result<(), String> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(&Self::storage_key(identity_key)).await
    }
}
