// ABOUTME: Global status command: every instance the provider reports.

use vs::config::Config;
use vs::error::Result;
use vs::machine::StateObserver;
use vs::output::Output;
use vs::provider::ProviderGateway;

pub async fn status<G: ProviderGateway + ?Sized>(
    gateway: &G,
    config: &Config,
    output: Output,
) -> Result<()> {
    let instances = StateObserver::new(gateway, config.retry).list_all().await?;

    let unknown = instances
        .iter()
        .filter(|instance| instance.canonical_state.is_none())
        .count();
    if unknown > 0 {
        output.warning(&format!("{unknown} instance(s) report an unrecognized state"));
    }

    output.instances(&instances);
    Ok(())
}
