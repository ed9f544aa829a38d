//! Shared cache of active alerts, owned by the control-plane layer.
//!
//! The refresh loop only reads snapshots and subscribes to the update
//! stream; it never mutates. An update lands at the routing engine without
//! waiting for the next tick, while the tick guarantees nothing is
//! forgotten.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use tokio::sync::broadcast;

use crate::model::Alert;

pub type AlertKey = BTreeMap<String, String>;

pub struct AlertCache {
    alerts: RwLock<HashMap<AlertKey, Alert>>,
    updates: broadcast::Sender<Alert>,
}

impl AlertCache {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            alerts: RwLock::new(HashMap::new()),
            updates,
        }
    }

    /// Insert or replace an alert and notify subscribers.
    pub fn upsert(&self, alert: Alert) {
        self.alerts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(alert.key(), alert.clone());
        let _ = self.updates.send(alert);
    }

    /// Drop an alert. It stops being refreshed and expires at its
    /// last-pushed endsAt on the routing engine's side.
    pub fn remove(&self, key: &AlertKey) -> Option<Alert> {
        self.alerts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
    }

    pub fn snapshot(&self) -> Vec<Alert> {
        self.alerts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.updates.subscribe()
    }
}

impl Default for AlertCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_upsert_and_snapshot() {
        let cache = AlertCache::new();
        assert!(cache.is_empty());

        let alert = Alert::new("HighCpu", Utc::now());
        cache.upsert(alert.clone());
        cache.upsert(alert.clone()); // same labels, same entry
        assert_eq!(cache.len(), 1);

        cache.upsert(Alert::new("AppDown", Utc::now()));
        assert_eq!(cache.snapshot().len(), 2);

        cache.remove(&alert.key());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let cache = AlertCache::new();
        let mut updates = cache.subscribe();

        let alert = Alert::new("HighCpu", Utc::now());
        cache.upsert(alert.clone());

        let received = updates.recv().await.unwrap();
        assert_eq!(received, alert);
    }
}
