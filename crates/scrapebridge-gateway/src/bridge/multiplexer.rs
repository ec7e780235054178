use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use futures_util::future::join_all;

use scrapebridge_core::error::Result;
use scrapebridge_core::TargetId;

use super::channel::{Channel, ChannelSettings};
use super::launcher::Launcher;

/// Channel registry: `TargetId -> Channel`, one channel per target for the
/// life of the process.
///
/// The map's shard lock covers lookup/insert only; it is released before the
/// channel is used, so different targets never wait on each other.
pub struct Multiplexer {
    channels: DashMap<TargetId, Arc<Channel>>,
    launcher: Arc<dyn Launcher>,
    settings: ChannelSettings,
}

impl Multiplexer {
    pub fn new(launcher: Arc<dyn Launcher>, settings: ChannelSettings) -> Self {
        Self {
            channels: DashMap::new(),
            launcher,
            settings,
        }
    }

    /// Existing channel for `target`, or a fresh disconnected one.
    pub fn resolve(&self, target: &TargetId) -> Arc<Channel> {
        if let Some(ch) = self.channels.get(target) {
            return Arc::clone(ch.value());
        }
        let entry = self.channels.entry(target.clone()).or_insert_with(|| {
            Arc::new(Channel::new(
                target.clone(),
                Arc::clone(&self.launcher),
                self.settings.clone(),
            ))
        });
        Arc::clone(entry.value())
    }

    pub async fn query(&self, target: &TargetId) -> Result<Bytes> {
        let channel = self.resolve(target);
        channel.query().await
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn connected(&self) -> usize {
        self.channels.iter().filter(|e| e.value().is_connected()).count()
    }

    pub fn launches(&self) -> u64 {
        self.channels.iter().map(|e| e.value().launches()).sum()
    }

    /// Tear down every channel's client process.
    pub async fn shutdown(&self) {
        let channels: Vec<Arc<Channel>> = self.channels.iter().map(|e| Arc::clone(e.value())).collect();
        join_all(channels.iter().map(|ch| ch.shutdown())).await;
        tracing::info!(channels = channels.len(), "channels shut down");
    }
}
