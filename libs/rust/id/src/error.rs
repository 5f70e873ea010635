//! ID generation errors.

use crate::NodeId;
use thiserror::Error;

/// Errors raised while deriving or installing a node identity.
///
/// All of these are configuration errors: they surface at startup and are
/// never produced by ID generation itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// Input is not a syntactically valid IP address
    #[error("invalid ip address: {0}")]
    InvalidAddress(String),

    /// Input is a valid IPv6 address without an IPv4 mapping
    #[error("not an ipv4 address: {0}")]
    NotIpv4(String),

    /// The process already runs with a different node identity
    #[error("node identity already installed as {installed}, refusing {requested}")]
    IdentityConflict {
        /// Identity fixed by the first install
        installed: NodeId,
        /// Identity passed to the rejected install
        requested: NodeId,
    },
}
