//! Scenario-based tests for promptchain

#[path = "../helpers.rs"]
mod helpers;

mod agent;
mod chat_history;
mod pros_cons;
mod rag;
mod review_routing;
mod translate;

use promptchain::core::{AppConfig, Variables};

/// The demo configuration shipped with the crate
pub fn demo_config() -> AppConfig {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/chains.yaml");
    AppConfig::from_file(path).unwrap()
}

pub fn vars(pairs: &[(&str, &str)]) -> Variables {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
