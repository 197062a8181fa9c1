//! Push-notification subscriptions, kept as persisted per-device records.
//!
//! Encryption and delivery are done by an external web-push relay; this
//! service owns the records and hands the relay everything it needs.

use crate::config::PushConfig;
use crate::utils::error::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const NOTIFICATION_TITLE: &str = "Smart Menu";
pub const NOTIFICATION_ICON: &str = "/icons/icon-192.png";

#[derive(Error, Debug)]
pub enum PushError {
    #[error("No subscription available")]
    NoSubscription,

    #[error("Invalid subscription: {0}")]
    InvalidSubscription(String),

    #[error("{0}")]
    NotConfigured(String),

    #[error("Subscription store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Subscription store is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Push relay rejected the notification ({status}): {message}")]
    Relay { status: u16, message: String },

    #[error("Push relay unreachable: {0}")]
    RelayUnreachable(String),
}

impl From<PushError> for ApiError {
    fn from(err: PushError) -> Self {
        match err {
            PushError::NoSubscription => ApiError::NotFound(err.to_string()),
            PushError::InvalidSubscription(_) => ApiError::BadRequest(err.to_string()),
            PushError::NotConfigured(msg) => ApiError::Configuration(msg),
            PushError::Io(_) | PushError::Serialization(_) => ApiError::Internal(err.to_string()),
            PushError::Relay { status, message } => ApiError::Upstream { status, message },
            PushError::RelayUnreachable(msg) => ApiError::Unreachable(msg),
        }
    }
}

// ===== RECORDS =====

/// Browser `PushSubscription.toJSON()` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(default)]
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

impl PushSubscription {
    fn validate(&self) -> Result<(), PushError> {
        if !self.endpoint.starts_with("https://") && !self.endpoint.starts_with("http://") {
            return Err(PushError::InvalidSubscription("endpoint must be an http(s) URL".into()));
        }
        if self.keys.p256dh.is_empty() || self.keys.auth.is_empty() {
            return Err(PushError::InvalidSubscription("keys.p256dh and keys.auth are required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub device_id: String,
    pub subscription: PushSubscription,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl NotificationPayload {
    pub fn new(message: &str) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body: message.to_string(),
            icon: NOTIFICATION_ICON.to_string(),
        }
    }
}

// ===== STORES =====

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get(&self, device_id: &str) -> Result<Option<SubscriptionRecord>, PushError>;
    async fn put(&self, record: SubscriptionRecord) -> Result<(), PushError>;
    /// `true` when a record was removed.
    async fn remove(&self, device_id: &str) -> Result<bool, PushError>;
}

/// Process-local store, used when no store path is configured.
#[derive(Default)]
pub struct MemorySubscriptionStore {
    records: DashMap<String, SubscriptionRecord>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn get(&self, device_id: &str) -> Result<Option<SubscriptionRecord>, PushError> {
        Ok(self.records.get(device_id).map(|r| r.value().clone()))
    }

    async fn put(&self, record: SubscriptionRecord) -> Result<(), PushError> {
        self.records.insert(record.device_id.clone(), record);
        Ok(())
    }

    async fn remove(&self, device_id: &str) -> Result<bool, PushError> {
        Ok(self.records.remove(device_id).is_some())
    }
}

/// JSON file of records fronted by an in-memory cache. Writes go to a
/// sibling temp file first and are renamed into place.
pub struct FileSubscriptionStore {
    path: PathBuf,
    cache: DashMap<String, SubscriptionRecord>,
    write_lock: Mutex<()>,
}

impl FileSubscriptionStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PushError> {
        let path = path.as_ref().to_path_buf();
        let cache = DashMap::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                let records: Vec<SubscriptionRecord> = serde_json::from_slice(&bytes)?;
                for record in records {
                    cache.insert(record.device_id.clone(), record);
                }
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No subscription file at {}, starting empty", path.display());
            }
            Err(e) => return Err(e.into()),
        }

        info!("📬 Loaded {} push subscription(s) from {}", cache.len(), path.display());
        Ok(Self {
            path,
            cache,
            write_lock: Mutex::new(()),
        })
    }

    async fn persist(&self) -> Result<(), PushError> {
        let _guard = self.write_lock.lock().await;

        let mut records: Vec<SubscriptionRecord> =
            self.cache.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        let bytes = serde_json::to_vec_pretty(&records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for FileSubscriptionStore {
    async fn get(&self, device_id: &str) -> Result<Option<SubscriptionRecord>, PushError> {
        Ok(self.cache.get(device_id).map(|r| r.value().clone()))
    }

    async fn put(&self, record: SubscriptionRecord) -> Result<(), PushError> {
        let device_id = record.device_id.clone();
        let previous = self.cache.insert(device_id.clone(), record);
        if let Err(e) = self.persist().await {
            // Cache must keep matching the file.
            match previous {
                Some(previous) => {
                    self.cache.insert(device_id, previous);
                }
                None => {
                    self.cache.remove(&device_id);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    async fn remove(&self, device_id: &str) -> Result<bool, PushError> {
        let Some((device_id, previous)) = self.cache.remove(device_id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist().await {
            self.cache.insert(device_id, previous);
            return Err(e);
        }
        Ok(true)
    }
}

// ===== SERVICE =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VapidDetails<'a> {
    subject: &'a str,
    public_key: &'a str,
    private_key: &'a str,
}

/// What the relay receives: the subscription, the serialized payload and
/// the VAPID identity to sign with.
#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    subscription: &'a PushSubscription,
    payload: String,
    vapid: VapidDetails<'a>,
}

#[derive(Clone)]
pub struct PushService {
    store: Arc<dyn SubscriptionStore>,
    client: Client,
    config: PushConfig,
}

impl PushService {
    pub fn new(store: Arc<dyn SubscriptionStore>, client: Client, config: PushConfig) -> Self {
        Self { store, client, config }
    }

    /// Store chosen by `push.store_path` (empty keeps records in memory).
    pub async fn open_store(config: &PushConfig) -> Result<Arc<dyn SubscriptionStore>, PushError> {
        if config.store_path.trim().is_empty() {
            warn!("push.store_path is empty; subscriptions will not survive restarts");
            return Ok(Arc::new(MemorySubscriptionStore::new()));
        }
        Ok(Arc::new(FileSubscriptionStore::open(&config.store_path).await?))
    }

    pub fn vapid_public_key(&self) -> Option<&str> {
        self.config.vapid_public_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Saves (or replaces) the subscription for `device_id`.
    pub async fn subscribe(
        &self,
        device_id: &str,
        subscription: PushSubscription,
    ) -> Result<SubscriptionRecord, PushError> {
        if device_id.trim().is_empty() {
            return Err(PushError::InvalidSubscription("deviceId is required".into()));
        }
        subscription.validate()?;

        let now = Utc::now();
        let created_at = self
            .store
            .get(device_id)
            .await?
            .map(|existing| existing.created_at)
            .unwrap_or(now);

        let record = SubscriptionRecord {
            device_id: device_id.to_string(),
            subscription,
            created_at,
            updated_at: now,
        };
        self.store.put(record.clone()).await?;
        debug!("Stored push subscription for device {}", device_id);
        Ok(record)
    }

    pub async fn unsubscribe(&self, device_id: &str) -> Result<bool, PushError> {
        let removed = self.store.remove(device_id).await?;
        debug!("Unsubscribe for device {} (removed: {})", device_id, removed);
        Ok(removed)
    }

    pub async fn send_notification(
        &self,
        device_id: &str,
        message: &str,
    ) -> Result<NotificationPayload, PushError> {
        let record = self
            .store
            .get(device_id)
            .await?
            .ok_or(PushError::NoSubscription)?;

        let relay_url = self
            .config
            .relay_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| PushError::NotConfigured("PUSH_RELAY_URL is not configured.".into()))?;
        let (Some(public_key), Some(private_key)) = (
            self.vapid_public_key(),
            self.config.vapid_private_key.as_deref().filter(|k| !k.is_empty()),
        ) else {
            return Err(PushError::NotConfigured("VAPID keys are not configured.".into()));
        };

        let payload = NotificationPayload::new(message);
        let request = RelayRequest {
            subscription: &record.subscription,
            payload: serde_json::to_string(&payload)?,
            vapid: VapidDetails {
                subject: &self.config.subject,
                public_key,
                private_key,
            },
        };

        let response = self
            .client
            .post(relay_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PushError::RelayUnreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PushError::Relay {
                status: status.as_u16(),
                message,
            });
        }

        info!("🔔 Notification sent to device {}", device_id);
        Ok(payload)
    }
}
