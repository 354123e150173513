//! Purge command - publishes cluster-wide purges for named caches

use clap::Args;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::InvalidationMessage;
use crate::infrastructure::bus::{BusBackend, RedisBusConfig, RedisInvalidationBus};
use crate::infrastructure::logging;
use crate::CACHE_NAMES;

#[derive(Args, Debug, Clone)]
pub struct PurgeArgs {
    /// Cache to purge; every known cache when omitted
    #[arg(long)]
    pub cache: Option<String>,
}

impl PurgeArgs {
    pub fn targets(&self) -> Vec<String> {
        match &self.cache {
            Some(name) => vec![name.clone()],
            None => CACHE_NAMES.iter().map(|name| name.to_string()).collect(),
        }
    }
}

/// Publish a purge for each target cache and wait until Redis accepted it
pub async fn run(args: PurgeArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging)?;

    if config.bus.backend != BusBackend::Redis {
        warn!(
            backend = ?config.bus.backend,
            "Only the redis bus reaches other processes; nothing to purge"
        );
        return Ok(());
    }

    let url = config
        .bus
        .redis_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("bus.redis_url is required for the redis backend"))?;
    let bus_config = RedisBusConfig::new(url).with_channel(config.bus.channel.clone());
    let bus = RedisInvalidationBus::connect(bus_config, config.node.resolved_id()).await?;

    for cache in args.targets() {
        bus.publish_now(InvalidationMessage::purge(cache.as_str())).await?;
        info!(cache = %cache, "Published cluster-wide purge");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_default_to_every_known_cache() {
        let args = PurgeArgs { cache: None };
        assert_eq!(
            args.targets(),
            vec!["roles", "user_access_tokens", "notification_registries"]
        );

        let args = PurgeArgs {
            cache: Some("roles".to_string()),
        };
        assert_eq!(args.targets(), vec!["roles"]);
    }
}
