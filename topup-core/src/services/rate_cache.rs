//! Local persistence of converted fiat values.
//!
//! Each successful token-to-fiat conversion is stored under its direction and
//! source amount so the last known value can be shown when the broker is not
//! reachable. Writes are last-write-wins.

use async_trait::async_trait;
use compact_str::CompactString;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;

/// Which conversion a cached value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateDirection {
    AppcToFiat,
    EthToFiat,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateKey {
    pub direction: RateDirection,
    pub source_amount: Decimal,
}

impl RateKey {
    pub fn new(direction: RateDirection, source_amount: Decimal) -> Self {
        Self {
            direction,
            source_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRate {
    pub amount: Decimal,
    pub currency: CompactString,
    pub symbol: CompactString,
    pub saved_at: OffsetDateTime,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("rate cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rate cache is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait RatePersistence: Send + Sync {
    async fn save_rate(&self, key: RateKey, rate: CachedRate) -> Result<(), CacheError>;

    async fn load_rate(&self, key: &RateKey) -> Result<Option<CachedRate>, CacheError>;
}

/// Process-local cache, lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryRateCache {
    rates: DashMap<RateKey, CachedRate>,
}

impl InMemoryRateCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RatePersistence for InMemoryRateCache {
    async fn save_rate(&self, key: RateKey, rate: CachedRate) -> Result<(), CacheError> {
        self.rates.insert(key, rate);
        Ok(())
    }

    async fn load_rate(&self, key: &RateKey) -> Result<Option<CachedRate>, CacheError> {
        Ok(self.rates.get(key).map(|entry| entry.value().clone()))
    }
}

#[derive(Serialize, Deserialize)]
struct RateRecord {
    key: RateKey,
    rate: CachedRate,
}

/// Cache backed by a JSON file.
///
/// Reads are served from memory. Every write rewrites the whole file through
/// a temporary sibling that is renamed into place.
pub struct JsonFileRateCache {
    path: PathBuf,
    rates: DashMap<RateKey, CachedRate>,
    write_lock: Mutex<()>,
}

impl JsonFileRateCache {
    /// Open the cache at `path`. A missing file starts an empty cache.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let rates = DashMap::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let records: Vec<RateRecord> = serde_json::from_slice(&bytes)?;
                for record in records {
                    rates.insert(record.key, record.rate);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(path = %path.display(), entries = rates.len(), "Opened rate cache");

        Ok(Self {
            path,
            rates,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;

        let records: Vec<RateRecord> = self
            .rates
            .iter()
            .map(|entry| RateRecord {
                key: entry.key().clone(),
                rate: entry.value().clone(),
            })
            .collect();
        let bytes = serde_json::to_vec_pretty(&records)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RatePersistence for JsonFileRateCache {
    async fn save_rate(&self, key: RateKey, rate: CachedRate) -> Result<(), CacheError> {
        self.rates.insert(key, rate);
        self.flush().await
    }

    async fn load_rate(&self, key: &RateKey) -> Result<Option<CachedRate>, CacheError> {
        Ok(self.rates.get(key).map(|entry| entry.value().clone()))
    }
}
