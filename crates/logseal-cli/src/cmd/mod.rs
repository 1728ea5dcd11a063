pub mod chain;
pub mod show;
pub mod sign;
pub mod verify;

use logseal_core::{AggregatorConfig, ProjectConfig};

/// Aggregator settings for one command, with an optional algorithm override.
pub fn aggregator_config(config: &ProjectConfig, algorithm: Option<&str>) -> AggregatorConfig {
    let mut aggregator = config.aggregator();
    if let Some(algorithm) = algorithm {
        aggregator.tree.algorithm = algorithm.to_string();
    }
    aggregator
}
