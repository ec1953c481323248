//! Health check functionality
//! Reports whether the storage and notification collaborators are usable

use std::collections::HashMap;
use async_trait::async_trait;
use tracing::warn;

use luna_track_data::store::{keys, KeyValueStore};

use crate::notifications::dispatch::NotificationDispatcherTrait;

/// System health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component works but something the user controls blocks it
    Degraded,
    /// Component is not functioning
    Unhealthy,
}

/// Represents a health component with status and optional details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthComponent {
    pub status: ComponentStatus,
    pub details: Option<String>,
}

impl HealthComponent {
    fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            details: None,
        }
    }
}

/// Represents the overall health of the system
#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub status: SystemStatus,
    /// Map of component names to their health status
    pub components: HashMap<String, HealthComponent>,
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;
}

/// Health service over the store and the notification dispatcher
pub struct HealthService<S, D> {
    store: S,
    dispatcher: D,
}

impl<S: KeyValueStore, D: NotificationDispatcherTrait> HealthService<S, D> {
    pub fn new(store: S, dispatcher: D) -> Self {
        Self { store, dispatcher }
    }
}

#[async_trait]
impl<S: KeyValueStore, D: NotificationDispatcherTrait> HealthServiceTrait for HealthService<S, D> {
    async fn get_system_health(&self) -> SystemHealth {
        get_system_health(&self.store, &self.dispatcher).await
    }
}

/// Check that the store answers a read
pub async fn check_storage_status<S: KeyValueStore + ?Sized>(store: &S) -> HealthComponent {
    match store.get(keys::CYCLE_SETTINGS).await {
        Ok(_) => HealthComponent::healthy(),
        Err(e) => {
            warn!("Storage health probe failed: {}", e);
            HealthComponent {
                status: ComponentStatus::Unhealthy,
                details: Some(e.to_string()),
            }
        }
    }
}

/// Check whether notifications can be delivered
pub async fn check_notification_status<D: NotificationDispatcherTrait + ?Sized>(dispatcher: &D) -> HealthComponent {
    match dispatcher.check_permission().await {
        Ok(true) => HealthComponent::healthy(),
        Ok(false) => HealthComponent {
            status: ComponentStatus::Degraded,
            details: Some("Notification permission not granted".to_string()),
        },
        Err(e) => {
            warn!("Notification health probe failed: {}", e);
            HealthComponent {
                status: ComponentStatus::Unhealthy,
                details: Some(e.to_string()),
            }
        }
    }
}

/// Get overall system health
pub async fn get_system_health<S, D>(store: &S, dispatcher: &D) -> SystemHealth
where
    S: KeyValueStore + ?Sized,
    D: NotificationDispatcherTrait + ?Sized,
{
    let storage = check_storage_status(store).await;
    let notifications = check_notification_status(dispatcher).await;

    let statuses = [storage.status, notifications.status];
    let overall_status = if statuses.contains(&ComponentStatus::Unhealthy) {
        SystemStatus::Unhealthy
    } else if statuses.contains(&ComponentStatus::Degraded) {
        SystemStatus::Degraded
    } else {
        SystemStatus::Healthy
    };

    SystemHealth {
        status: overall_status,
        components: vec![
            ("storage".to_string(), storage),
            ("notifications".to_string(), notifications),
        ]
        .into_iter()
        .collect(),
    }
}
