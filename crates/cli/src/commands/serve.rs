//! `murmur serve` — Start the HTTP front-end.

use super::{CommandResult, build_engine, load_config};

pub async fn run(port_override: Option<u16>) -> CommandResult {
    let mut config = load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let engine = build_engine(&config).await?;

    println!("Murmur gateway");
    println!("   Open:    http://{}:{}/", config.gateway.host, config.gateway.port);
    println!("   Model:   {} ({})", config.model.name, engine.provider_name());
    println!("   Speech:  {}", engine.speech().backend());

    murmur_gateway::start(&config, engine).await?;

    Ok(())
}
