// ABOUTME: Command module aggregator for the vs CLI.
// ABOUTME: Lifecycle, status, and remote-access handlers run against a provider gateway.

mod lifecycle;
mod remote;
mod status;

pub use lifecycle::{destroy, halt, machine_status, up};
pub use remote::{console, scp, ssh};
pub use status::status;
