use std::sync::Arc;

use chrono::Duration;
use log::{error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::store::{MemoryStore, MongoStore, Polls};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_recent_window_hours")]
    recent_window_hours: u32,
}

fn default_recent_window_hours() -> u32 {
    24
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recent_window_hours: default_recent_window_hours(),
        }
    }
}

impl Config {
    /// How far back a question may have been published and still be flagged as recent.
    pub fn recent_window(&self) -> Duration {
        Duration::hours(self.recent_window_hours.into())
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the storage backend.
#[derive(Deserialize)]
struct StoreConfig {
    // secrets
    /// MongoDB connection string. Without one, polls live in memory.
    db_uri: Option<String>,
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
}

fn default_db_name() -> String {
    "polls".to_string()
}

/// A fairing that loads the storage config, connects to MongoDB if asked to,
/// performs any setup necessary, and places a [`Polls`] handle into managed
/// state.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Poll store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let polls: Polls = match config.db_uri {
            Some(uri) => {
                info!("Loaded database config, connecting...");
                match MongoStore::connect(&uri, &config.db_name).await {
                    Ok(store) => {
                        info!("...database connection online!");
                        Arc::new(store)
                    }
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
            None => {
                warn!("No `db_uri` configured; polls will be kept in memory and lost on shutdown");
                Arc::new(MemoryStore::new())
            }
        };

        // Manage the state.
        rocket = rocket.manage(polls);
        Ok(rocket)
    }
}

#[cfg(test)]
mod tests {
    use rocket::figment::{providers::Serialized, Figment};

    use super::*;

    #[test]
    fn recent_window_defaults_to_a_day() {
        let config = Figment::new().extract::<Config>().unwrap();
        assert_eq!(config.recent_window(), Duration::days(1));
        assert_eq!(Config::default().recent_window(), Duration::days(1));
    }

    #[test]
    fn recent_window_is_configurable() {
        let figment = Figment::new().merge(Serialized::default("recent_window_hours", 6));
        let config = figment.extract::<Config>().unwrap();
        assert_eq!(config.recent_window(), Duration::hours(6));
    }

    #[test]
    fn store_defaults_to_memory() {
        let config = Figment::new().extract::<StoreConfig>().unwrap();
        assert!(config.db_uri.is_none());
        assert_eq!(config.db_name, "polls");
    }
}
