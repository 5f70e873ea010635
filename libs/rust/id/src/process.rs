//! Process-wide generator.
//!
//! A process owns exactly one node identity. The first install fixes it;
//! later installs with the same node return the same generator and a
//! different node is rejected.

use crate::{IdError, IdGenerator, NodeId};
use once_cell::sync::OnceCell;
use tracing::info;

static PROCESS_GENERATOR: OnceCell<IdGenerator> = OnceCell::new();

/// Installs the process generator for `node`, or returns the existing one.
///
/// # Errors
///
/// Returns [`IdError::IdentityConflict`] when a generator for another node
/// is already installed.
pub fn install(node: NodeId) -> Result<&'static IdGenerator, IdError> {
    let generator = PROCESS_GENERATOR.get_or_init(|| {
        info!(node_id = %node, "Installed process ID generator");
        IdGenerator::new(node)
    });

    if generator.node_id() == node {
        Ok(generator)
    } else {
        Err(IdError::IdentityConflict {
            installed: generator.node_id(),
            requested: node,
        })
    }
}

/// Derives the node from `addr` and installs the process generator.
///
/// # Errors
///
/// Returns the address error from [`NodeId::from_ipv4`], or
/// [`IdError::IdentityConflict`] as in [`install`].
pub fn install_from_ipv4(addr: &str) -> Result<&'static IdGenerator, IdError> {
    install(NodeId::from_ipv4(addr)?)
}

/// The installed process generator, if any.
#[must_use]
pub fn current() -> Option<&'static IdGenerator> {
    PROCESS_GENERATOR.get()
}
