use glittr_wallet::{ChainConfig, ChainType};

use crate::config::CliConfig;

pub fn list(config: &CliConfig) {
    for chain in ChainType::ALL {
        let preset = ChainConfig::preset(chain);
        let marker = if chain == config.chain.chain { "*" } else { " " };

        let mut notes = Vec::new();
        if preset.disabled {
            notes.push("disabled");
        }
        if preset.requires_api_key() {
            notes.push("api key required");
        }

        println!(
            "{marker} {:<16} {:<16} {:<8} {}",
            chain.as_str(),
            preset.label,
            preset.network,
            notes.join(", ")
        );
    }

    println!();
    println!("api: {}", config.chain.glittr_api);
    println!("electrum: {}", config.chain.electrum_api);
    if let Some(key) = config.chain.masked_api_key() {
        println!("api key: {key}");
    }

    match config.validate() {
        Ok(()) => println!("status: ready"),
        Err(error) => println!("status: {error:#}"),
    }
}
