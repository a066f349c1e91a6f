// ABOUTME: ssh, scp, and console commands.
// ABOUTME: The machine is observed first so sessions always target its current address.

use vs::config::Config;
use vs::error::{Error, Result};
use vs::machine::{Machine, StateObserver};
use vs::output::Output;
use vs::provider::ProviderGateway;
use vs::remote::{RemoteTarget, run_interactive};
use vs::types::MachineName;

async fn observe<G: ProviderGateway + ?Sized>(
    gateway: &G,
    config: &Config,
    name: &MachineName,
) -> Result<Machine> {
    let machine = StateObserver::new(gateway, config.retry)
        .observe(name)
        .await?;
    Ok(machine)
}

pub async fn ssh<G: ProviderGateway + ?Sized>(
    gateway: &G,
    config: &Config,
    name: &MachineName,
    args: &[String],
) -> Result<()> {
    let machine = observe(gateway, config, name).await?;
    let target = RemoteTarget::new(&machine, &config.ssh)?;
    run_interactive("ssh", &target.ssh_args(args)).await
}

pub async fn scp<G: ProviderGateway + ?Sized>(
    gateway: &G,
    config: &Config,
    name: &MachineName,
    args: &[String],
) -> Result<()> {
    let machine = observe(gateway, config, name).await?;
    let target = RemoteTarget::new(&machine, &config.ssh)?;
    run_interactive("scp", &target.scp_args(args)).await
}

/// Request out-of-band console access and print it.
pub async fn console<G: ProviderGateway + ?Sized>(
    gateway: &G,
    config: &Config,
    name: &MachineName,
    output: Output,
) -> Result<()> {
    let machine = observe(gateway, config, name).await?;
    let id = match machine.instance_id {
        Some(ref id) if !machine.state.is_gone() => id,
        _ => {
            return Err(Error::NotReachable {
                name: machine.name,
                state: machine.state,
            });
        }
    };

    let console = gateway.request_console(id).await?;
    output.console(&console);
    Ok(())
}
