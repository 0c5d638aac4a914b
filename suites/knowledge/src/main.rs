#![warn(clippy::unwrap_used)]

mod suites;

use enginesim::{run_suites, EngineClient, EngineConfig};

use crate::suites::{assets, health, ingest, library};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };
    let engine = match EngineClient::new(&config) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("failed to build engine client: {err}");
            std::process::exit(1);
        }
    };

    let suites = vec![
        health::suite(),
        ingest::suite(),
        library::suite(),
        assets::suite(),
    ];

    let report = run_suites(&engine, config.test_matcher.as_ref(), suites).await;
    report.print(&config.gate);
    std::process::exit(report.exit_code(&config.gate));
}
