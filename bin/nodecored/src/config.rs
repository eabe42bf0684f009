use crate::args::Args;
use nodecore_consensus_core::config::Config;
use nodecore_consensus_core::errors::{NodeError, NodeResult};

/// Builds the effective [`Config`]: defaults, overlaid by the config file
/// (if any) via `#[serde(default)]`, overlaid by whichever CLI flags were
/// actually given.
pub fn load_config(args: &Args) -> NodeResult<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| NodeError::Configuration(format!("reading config file {path}: {e}")))?;
            toml::from_str(&text).map_err(|e| NodeError::Configuration(format!("parsing config file {path}: {e}")))?
        }
        None => Config::default(),
    };

    if let Some(data_dir) = &args.data_dir {
        config.data_dir = Some(data_dir.clone());
    }
    if let Some(log_level) = &args.log_level {
        config.log_filters = log_level.clone();
    }
    if let Some(log_dir) = &args.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    if args.no_optimistic {
        config.optimistic_mode = false;
    }

    if config.data_dir.is_none() {
        return Err(NodeError::Configuration("data_dir must be set via --data-dir or the config file".to_string()));
    }

    Ok(config)
}
