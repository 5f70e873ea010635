//! Time-ordered unique identifiers.
//!
//! IDs fold a millisecond timestamp, a node identity derived from the
//! host's IPv4 address and a per-millisecond sequence into 64 bits, and
//! are rendered as fixed-width decimal strings.
//!
//! ```
//! use relay_id::{IdGenerator, IdSource, NodeId};
//!
//! let generator = IdGenerator::new(NodeId::from_ipv4("10.0.1.2")?);
//! let id = generator.generate_id();
//! assert_eq!(id.len(), 20);
//! # Ok::<(), relay_id::IdError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod generator;
pub mod node;
pub mod process;

pub use error::IdError;
pub use generator::{EPOCH_MS, ID_WIDTH, IdGenerator, IdParts, IdSource, STEP_BITS};
pub use node::{NODE_BITS, NodeId};
