// ABOUTME: Validated domain types for machines and provider instances.
// ABOUTME: Machine names are DNS labels; instance ids are opaque provider strings.

mod instance_id;
mod machine_name;

pub use instance_id::InstanceId;
pub use machine_name::{MachineName, MachineNameError};
