//! Runtime Adapter: wraps the external OCI runtime CLI (`runc`).

mod adapter;
mod state;

pub use adapter::RuntimeAdapter;
pub use state::{ContainerState, ContainerStatus, RuntimeEvent};
