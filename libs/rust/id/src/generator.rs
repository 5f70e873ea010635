//! Snowflake-style ID generation.
//!
//! Layout of a generated ID, most significant bit first:
//!
//! ```text
//! | unused (1) | ms since epoch (41) | node (16) | step (6) |
//! ```
//!
//! IDs are rendered as 20-digit zero-padded decimal strings, so their
//! lexicographic order matches their numeric order.

use crate::NodeId;
use crate::node::NODE_BITS;
use parking_lot::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Epoch of the timestamp component, in Unix milliseconds (2010-11-04T01:42:54.657Z).
pub const EPOCH_MS: u64 = 1_288_834_974_657;

/// Bits used for the per-millisecond sequence.
pub const STEP_BITS: u32 = 6;

/// Width of the rendered decimal ID.
pub const ID_WIDTH: usize = 20;

const STEP_MASK: u64 = (1 << STEP_BITS) - 1;
const NODE_SHIFT: u32 = STEP_BITS;
const TIME_SHIFT: u32 = NODE_BITS + STEP_BITS;

/// Anything that hands out unique identifiers.
pub trait IdSource: Send + Sync {
    /// Returns a new unique 20-character decimal ID.
    fn generate_id(&self) -> String;
}

/// Components of a generated ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParts {
    /// Milliseconds since [`EPOCH_MS`]
    pub timestamp_ms: u64,
    /// Node that produced the ID
    pub node: NodeId,
    /// Sequence within the millisecond
    pub step: u64,
}

impl IdParts {
    /// Splits a numeric ID into its components.
    #[must_use]
    pub fn decompose(id: u64) -> Self {
        let node_mask = (1u64 << NODE_BITS) - 1;
        let node = u16::try_from((id >> NODE_SHIFT) & node_mask).unwrap_or(u16::MAX);
        Self {
            timestamp_ms: id >> TIME_SHIFT,
            node: NodeId::new(node),
            step: id & STEP_MASK,
        }
    }

    /// Wall-clock time the ID was generated at, in Unix milliseconds.
    #[must_use]
    pub const fn unix_ms(&self) -> u64 {
        self.timestamp_ms + EPOCH_MS
    }
}

#[derive(Debug, Default)]
struct State {
    last_ms: u64,
    step: u64,
}

/// Thread-safe Snowflake generator bound to one node.
///
/// Time is read from a monotonic clock anchored to the wall clock at
/// construction, so IDs stay ordered if the system clock is stepped back.
#[derive(Debug)]
pub struct IdGenerator {
    node: NodeId,
    anchor: Instant,
    anchor_ms: u64,
    state: Mutex<State>,
}

impl IdGenerator {
    /// Creates a generator for `node`.
    #[must_use]
    pub fn new(node: NodeId) -> Self {
        let wall_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| duration_ms(d));

        Self {
            node,
            anchor: Instant::now(),
            anchor_ms: wall_ms.saturating_sub(EPOCH_MS),
            state: Mutex::new(State::default()),
        }
    }

    /// Node this generator stamps into every ID.
    #[must_use]
    pub const fn node_id(&self) -> NodeId {
        self.node
    }

    /// Returns the next ID as an integer.
    ///
    /// Strictly increasing across calls on the same generator. When the
    /// 64 steps of one millisecond are used up, waits for the next one.
    pub fn next_id(&self) -> u64 {
        let mut state = self.state.lock();

        // a reading behind the last timestamp counts as the same millisecond
        let mut now = self.elapsed_ms().max(state.last_ms);

        if now == state.last_ms {
            state.step = (state.step + 1) & STEP_MASK;
            if state.step == 0 {
                while now <= state.last_ms {
                    std::hint::spin_loop();
                    now = self.elapsed_ms();
                }
            }
        } else {
            state.step = 0;
        }

        state.last_ms = now;

        (now << TIME_SHIFT) | (u64::from(self.node.get()) << NODE_SHIFT) | state.step
    }

    fn elapsed_ms(&self) -> u64 {
        self.anchor_ms + duration_ms(self.anchor.elapsed())
    }
}

impl IdSource for IdGenerator {
    fn generate_id(&self) -> String {
        format!("{:0width$}", self.next_id(), width = ID_WIDTH)
    }
}

impl<T: IdSource + ?Sized> IdSource for &T {
    fn generate_id(&self) -> String {
        (**self).generate_id()
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
