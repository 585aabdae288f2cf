//! Domain layer health check functionality
//! Reports storage and session-store status for the `/health` endpoint

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use prism_data::database;

use crate::auth::session::SessionStore;

/// Checks slower than this mark the database degraded
const SLOW_DATABASE_THRESHOLD: Duration = Duration::from_secs(1);

/// Which storage the server ended up with at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Postgres,
    /// Fallback when the database was unreachable; nothing is persisted
    InMemory,
}

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

impl SystemStatus {
    /// Wire value reported by `/health`
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemStatus::Healthy => "ok",
            SystemStatus::Degraded => "degraded",
            SystemStatus::Unhealthy => "error",
        }
    }
}

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Healthy => "healthy",
            ComponentStatus::Degraded => "degraded",
            ComponentStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Represents a health component with status and optional details
#[derive(Debug, Clone)]
pub struct HealthComponent {
    pub status: ComponentStatus,
    pub details: Option<String>,
    /// How long the check took
    pub response_time_ms: Option<u64>,
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
pub trait HealthServiceTrait: Send + Sync + std::fmt::Debug {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;
}

/// Worst component status wins
pub fn overall_status<'a>(components: impl IntoIterator<Item = &'a HealthComponent>) -> SystemStatus {
    let mut status = SystemStatus::Healthy;
    for component in components {
        match component.status {
            ComponentStatus::Unhealthy => return SystemStatus::Unhealthy,
            ComponentStatus::Degraded => status = SystemStatus::Degraded,
            ComponentStatus::Healthy => {}
        }
    }
    status
}

#[derive(Debug, Clone)]
pub struct HealthService {
    mode: StorageMode,
    sessions: SessionStore,
}

impl HealthService {
    pub fn new(mode: StorageMode, sessions: SessionStore) -> Self {
        Self { mode, sessions }
    }

    async fn check_database(&self) -> HealthComponent {
        if self.mode == StorageMode::InMemory {
            return HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some("Running on in-memory storage; data is not persisted".to_string()),
                response_time_ms: None,
            };
        }

        let started = Instant::now();
        let result = database::check_connection().await;
        let elapsed = started.elapsed();
        let response_time_ms = Some(elapsed.as_millis() as u64);

        match result {
            Err(e) => HealthComponent {
                status: ComponentStatus::Unhealthy,
                details: Some(format!("Database connection error: {}", e)),
                response_time_ms,
            },
            Ok(()) if elapsed > SLOW_DATABASE_THRESHOLD => HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some("Database is available but responding slowly".to_string()),
                response_time_ms,
            },
            Ok(()) => HealthComponent {
                status: ComponentStatus::Healthy,
                details: database::get_connection_info(),
                response_time_ms,
            },
        }
    }
}

#[async_trait]
impl HealthServiceTrait for HealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let mut components = HashMap::new();
        components.insert("database".to_string(), self.check_database().await);
        components.insert(
            "sessions".to_string(),
            HealthComponent {
                status: ComponentStatus::Healthy,
                details: Some(format!("{} active session(s)", self.sessions.size())),
                response_time_ms: None,
            },
        );

        SystemHealth {
            status: overall_status(components.values()),
            components,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(status: ComponentStatus) -> HealthComponent {
        HealthComponent { status, details: None, response_time_ms: None }
    }

    #[test]
    fn test_overall_status_takes_the_worst() {
        let healthy = component(ComponentStatus::Healthy);
        let degraded = component(ComponentStatus::Degraded);
        let unhealthy = component(ComponentStatus::Unhealthy);

        assert_eq!(overall_status([&healthy]), SystemStatus::Healthy);
        assert_eq!(overall_status([&healthy, &degraded]), SystemStatus::Degraded);
        assert_eq!(overall_status([&degraded, &unhealthy]), SystemStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_in_memory_mode_is_degraded() {
        let service = HealthService::new(StorageMode::InMemory, SessionStore::default());
        let health = service.get_system_health().await;

        assert_eq!(health.status, SystemStatus::Degraded);
        assert_eq!(health.status.as_str(), "degraded");
        assert!(health.components.contains_key("database"));
        assert!(health.components.contains_key("sessions"));
    }

    #[tokio::test]
    async fn test_postgres_mode_without_pool_is_unhealthy() {
        // No pool is initialized in unit tests
        let service = HealthService::new(StorageMode::Postgres, SessionStore::default());
        let health = service.get_system_health().await;

        assert_eq!(health.status, SystemStatus::Unhealthy);
        assert_eq!(health.status.as_str(), "error");
    }
}
