// ABOUTME: up, halt, destroy, and per-machine status.
// ABOUTME: Each handler runs one reconciliation and reports its outcome.

use vs::config::Config;
use vs::error::Result;
use vs::machine::{Outcome, Reconciler, StateObserver};
use vs::output::Output;
use vs::provider::ProviderGateway;
use vs::types::MachineName;

fn reconciler<'a, G: ProviderGateway + ?Sized>(
    gateway: &'a G,
    config: &Config,
) -> Reconciler<'a, G> {
    Reconciler::new(gateway, config.reconcile, config.retry)
}

fn report(outcome: &Outcome, output: &Output) {
    if outcome.is_noop() {
        tracing::debug!(machine = %outcome.machine.name, "nothing to do");
    }
    output.outcome(outcome);
}

/// Create or start the machine and wait until it is running.
pub async fn up<G: ProviderGateway + ?Sized>(
    gateway: &G,
    config: &Config,
    name: &MachineName,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!("Bringing up {name}..."));

    let spec = config.instance_spec(name);
    let outcome = reconciler(gateway, config).ensure_running(&spec).await?;

    report(&outcome, &output);
    Ok(())
}

/// Shut the machine down and wait until it is stopped.
pub async fn halt<G: ProviderGateway + ?Sized>(
    gateway: &G,
    config: &Config,
    name: &MachineName,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!("Halting {name}..."));

    let outcome = reconciler(gateway, config).ensure_stopped(name).await?;

    report(&outcome, &output);
    Ok(())
}

/// Terminate the machine and wait until the provider reports it gone.
pub async fn destroy<G: ProviderGateway + ?Sized>(
    gateway: &G,
    config: &Config,
    name: &MachineName,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!("Destroying {name}..."));

    let outcome = reconciler(gateway, config).destroy(name).await?;

    report(&outcome, &output);
    Ok(())
}

/// Print the machine as currently observed.
pub async fn machine_status<G: ProviderGateway + ?Sized>(
    gateway: &G,
    config: &Config,
    name: &MachineName,
    output: Output,
) -> Result<()> {
    let machine = StateObserver::new(gateway, config.retry)
        .observe(name)
        .await?;
    output.machine(&machine);
    Ok(())
}
