//! Process configuration read from the environment.

use std::net::SocketAddr;

use thiserror::Error;

use paperstock_auth::StorageMembership;
use paperstock_core::{MemberId, StorageId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// When absent the API runs on the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub run_migrations: bool,
    /// Memberships granted at startup when running on the in-memory store.
    /// `DEV_MEMBERSHIPS=storage:member[:admin],...`
    pub dev_memberships: Vec<StorageMembership>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            database_max_connections: 10,
            run_migrations: true,
            dev_memberships: Vec::new(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let database_max_connections = parse_or(
            "DATABASE_MAX_CONNECTIONS",
            get("DATABASE_MAX_CONNECTIONS"),
            defaults.database_max_connections,
        )?;
        if database_max_connections == 0 {
            return Err(ConfigError::Invalid {
                name: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            bind_addr: parse_or("BIND_ADDR", get("BIND_ADDR"), defaults.bind_addr)?,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            run_migrations: parse_or("RUN_MIGRATIONS", get("RUN_MIGRATIONS"), defaults.run_migrations)?,
            dev_memberships: match get("DEV_MEMBERSHIPS") {
                Some(raw) => parse_memberships(&raw)?,
                None => defaults.dev_memberships,
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .to_ascii_lowercase()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// `storage:member` grants a clerk, `storage:member:admin` an admin.
fn parse_memberships(raw: &str) -> Result<Vec<StorageMembership>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let invalid = || ConfigError::Invalid {
                name: "DEV_MEMBERSHIPS",
                value: item.to_string(),
            };
            let id = |part: &str| part.trim().parse::<i64>().ok().filter(|id| *id > 0);

            let parts: Vec<&str> = item.split(':').collect();
            let (storage, member, is_admin) = match parts.as_slice() {
                [storage, member] => (*storage, *member, false),
                [storage, member, role] if role.trim().eq_ignore_ascii_case("admin") => {
                    (*storage, *member, true)
                }
                _ => return Err(invalid()),
            };
            Ok(StorageMembership {
                storage_id: StorageId::new(id(storage).ok_or_else(invalid)?),
                member_id: MemberId::new(id(member).ok_or_else(invalid)?),
                is_admin,
                is_active: true,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]).unwrap(), ApiConfig::default());
        assert_eq!(config(&[("DATABASE_URL", "  ")]).unwrap().database_url, None);
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://localhost/paper"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("RUN_MIGRATIONS", "FALSE"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/paper"));
        assert_eq!(cfg.database_max_connections, 4);
        assert!(!cfg.run_migrations);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(config(&[("BIND_ADDR", "nowhere")]).is_err());
        assert!(config(&[("DATABASE_MAX_CONNECTIONS", "0")]).is_err());
        assert!(config(&[("DATABASE_MAX_CONNECTIONS", "-1")]).is_err());
        assert!(config(&[("RUN_MIGRATIONS", "maybe")]).is_err());
    }

    #[test]
    fn reads_dev_memberships() {
        let cfg = config(&[("DEV_MEMBERSHIPS", "1:10, 1:11:ADMIN,")]).unwrap();
        assert_eq!(
            cfg.dev_memberships,
            vec![
                StorageMembership {
                    storage_id: StorageId::new(1),
                    member_id: MemberId::new(10),
                    is_admin: false,
                    is_active: true,
                },
                StorageMembership {
                    storage_id: StorageId::new(1),
                    member_id: MemberId::new(11),
                    is_admin: true,
                    is_active: true,
                },
            ]
        );

        for bad in ["1", "1:x", "0:10", "1:10:owner", "1:10:admin:extra"] {
            assert!(config(&[("DEV_MEMBERSHIPS", bad)]).is_err(), "{bad}");
        }
    }
}
