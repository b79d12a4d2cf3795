#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

use config::{ConfigFairing, StoreFairing};
use logging::LoggerFairing;
use model::store::Polls;

pub use config::Config;

/// Build the production server, choosing the store from configuration.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .mount("/", api::routes())
}

/// Build a server around an existing store, bypassing the storage config.
pub fn rocket_for_store(polls: Polls) -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .manage(polls)
        .mount("/", api::routes())
}

/// Name of the MongoDB database the `_mongo` test variants connect to.
/// Random so concurrently running tests never share data.
#[cfg(test)]
pub(crate) fn test_database_name() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}

/// URI of the MongoDB deployment used by the `_mongo` test variants.
#[cfg(test)]
pub(crate) fn test_database_uri() -> String {
    std::env::var("MONGO_TEST_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

/// Send log output from this crate to the console, once per test binary.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    use log::LevelFilter;
    use log4rs::{
        append::console::{ConsoleAppender, Target},
        config::{Appender, Logger, Root},
        encode::pattern::PatternEncoder,
    };

    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let stderr = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(Box::new(PatternEncoder::new("{l} {t} - {m}{n}")))
            .build();
        let config = log4rs::Config::builder()
            .appender(Appender::builder().build("stderr", Box::new(stderr)))
            .logger(Logger::builder().build("polls_backend", LevelFilter::Debug))
            .build(Root::builder().appender("stderr").build(LevelFilter::Warn))
            .expect("Valid test logging config");
        // Another logger may already be installed, which is fine.
        let _ = log4rs::init_config(config);
    });
}
