//! Server configuration read from the environment (and `.env` via dotenv)

use std::env;

use chrono::NaiveTime;
use thiserror::Error;
use tracing::warn;

use prism_domain::booking::BookingRules;

const DEV_SESSION_SECRET: &str = "prism-development-session-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Bootstrap administrator credentials
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// `NODE_ENV` / `APP_ENV`, `development` by default
    pub environment: String,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    /// Static key accepted in `x-api-key`; `None` disables that branch
    pub client_api_key: Option<String>,
    /// Empty means mirror the request origin
    pub cors_origins: Vec<String>,
    pub admin: Option<AdminBootstrap>,
    pub booking: BookingRules,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            environment: "development".to_string(),
            session_secret: DEV_SESSION_SECRET.to_string(),
            session_ttl_hours: 24,
            client_api_key: None,
            cors_origins: Vec::new(),
            admin: None,
            booking: BookingRules::default(),
        }
    }
}

/// Longest accepted `SESSION_TTL_HOURS`, thirty days
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 30;

/// Variable source; trimmed, and empty values count as unset
struct Vars<F: Fn(&str) -> Option<String>> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
            None => Ok(default),
        }
    }

    fn time(&self, name: &'static str, default: NaiveTime) -> Result<NaiveTime, ConfigError> {
        match self.get(name) {
            Some(value) => NaiveTime::parse_from_str(&value, "%H:%M")
                .map_err(|_| ConfigError::Invalid { name, value }),
            None => Ok(default),
        }
    }
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let defaults = Self::default();

        let environment = vars
            .get("NODE_ENV")
            .or_else(|| vars.get("APP_ENV"))
            .unwrap_or(defaults.environment);
        let production = environment.eq_ignore_ascii_case("production");

        let session_secret = match vars.get("SESSION_SECRET") {
            Some(secret) => secret,
            None if production => return Err(ConfigError::Missing("SESSION_SECRET")),
            None => {
                warn!("SESSION_SECRET is not set, using the development default");
                defaults.session_secret
            }
        };

        let client_api_key = vars.get("CLIENT_API_KEY");
        if client_api_key.is_none() {
            warn!("CLIENT_API_KEY is not set; API-key access is disabled");
        }

        let cors_origins = vars
            .get("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let admin = match (vars.get("ADMIN_USERNAME"), vars.get("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminBootstrap { username, password }),
            _ => None,
        };

        let booking_defaults = BookingRules::default();
        let closed_weekdays = match vars.get("CLOSED_WEEKDAYS") {
            Some(value) => BookingRules::parse_weekdays(&value)
                .map_err(|_| ConfigError::Invalid { name: "CLOSED_WEEKDAYS", value })?,
            None => booking_defaults.closed_weekdays.clone(),
        };
        let booking = BookingRules {
            open: vars.time("CLINIC_OPEN", booking_defaults.open)?,
            close: vars.time("CLINIC_CLOSE", booking_defaults.close)?,
            slot_minutes: vars.parse("SLOT_MINUTES", booking_defaults.slot_minutes)?,
            capacity: vars.parse("SLOT_CAPACITY", booking_defaults.capacity)?,
            closed_weekdays,
            days_ahead: vars.parse("BOOKING_DAYS_AHEAD", booking_defaults.days_ahead)?,
        };
        booking.validate().map_err(|e| ConfigError::Invalid {
            name: "booking rules",
            value: e.to_string(),
        })?;

        let session_ttl_hours = vars.parse("SESSION_TTL_HOURS", defaults.session_ttl_hours)?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl_hours) {
            return Err(ConfigError::Invalid {
                name: "SESSION_TTL_HOURS",
                value: session_ttl_hours.to_string(),
            });
        }

        Ok(Self {
            port: vars.parse("PORT", defaults.port)?,
            environment,
            session_secret,
            session_ttl_hours,
            client_api_key,
            cors_origins,
            admin,
            booking,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use chrono::Weekday;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 3000);
        assert!(!config.is_production());
        assert!(config.client_api_key.is_none());
        assert_eq!(config.booking, BookingRules::default());
    }

    #[test]
    fn test_production_flag_is_case_insensitive() {
        let config = AppConfig { environment: "Production".into(), ..Default::default() };
        assert!(config.is_production());
    }
    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.environment, "development");
        assert_eq!(config.session_secret, DEV_SESSION_SECRET);
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.booking, BookingRules::default());
    }

    #[test]
    fn test_production_requires_session_secret() {
        assert!(matches!(
            from_pairs(&[("NODE_ENV", "production")]),
            Err(ConfigError::Missing("SESSION_SECRET"))
        ));

        let config = from_pairs(&[("NODE_ENV", "production"), ("SESSION_SECRET", "s3cret")]).unwrap();
        assert!(config.is_production());
        assert_eq!(config.session_secret, "s3cret");
    }

    #[test]
    fn test_session_ttl_bounds() {
        for bad in ["0", "-5", "721", "99999999999999"] {
            assert!(
                matches!(
                    from_pairs(&[("SESSION_TTL_HOURS", bad)]),
                    Err(ConfigError::Invalid { name: "SESSION_TTL_HOURS", .. })
                ),
                "{} should be rejected",
                bad
            );
        }
        assert_eq!(from_pairs(&[("SESSION_TTL_HOURS", "720")]).unwrap().session_ttl_hours, 720);
    }

    #[test]
    fn test_booking_rules_from_environment() {
        let config = from_pairs(&[
            ("CLOSED_WEEKDAYS", "sat, sun"),
            ("CLINIC_OPEN", "08:30"),
            ("CLINIC_CLOSE", "17:00"),
            ("SLOT_MINUTES", "30"),
        ])
        .unwrap();
        assert_eq!(config.booking.closed_weekdays, vec![Weekday::Sat, Weekday::Sun]);
        assert_eq!(config.booking.open, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(config.booking.slot_minutes, 30);

        assert!(matches!(
            from_pairs(&[("CLINIC_OPEN", "8am")]),
            Err(ConfigError::Invalid { name: "CLINIC_OPEN", .. })
        ));
        assert!(matches!(
            from_pairs(&[("CLOSED_WEEKDAYS", "funday")]),
            Err(ConfigError::Invalid { name: "CLOSED_WEEKDAYS", .. })
        ));
        assert!(from_pairs(&[("BOOKING_DAYS_AHEAD", "4000000000")]).is_err());
        assert!(from_pairs(&[("CLINIC_OPEN", "18:00"), ("CLINIC_CLOSE", "09:00")]).is_err());
    }

    #[test]
    fn test_blank_api_key_disables_key_access() {
        assert!(from_pairs(&[("CLIENT_API_KEY", "   ")]).unwrap().client_api_key.is_none());
        assert_eq!(
            from_pairs(&[("CLIENT_API_KEY", "site-key")]).unwrap().client_api_key.as_deref(),
            Some("site-key")
        );
    }

    #[test]
    fn test_admin_bootstrap_needs_both_values() {
        assert!(from_pairs(&[("ADMIN_USERNAME", "admin")]).unwrap().admin.is_none());
        let config = from_pairs(&[("ADMIN_USERNAME", "admin"), ("ADMIN_PASSWORD", "change-me-now")]).unwrap();
        assert_eq!(config.admin.map(|a| a.username).as_deref(), Some("admin"));
    }
}
