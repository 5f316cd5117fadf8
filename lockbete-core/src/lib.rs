//! # lockbete-core
//!
//! Domain model for the Lockbete honeypot monitor: captured event types,
//! geo annotations, and the cursor types that drive the tailers.
//!
//! ### Key Submodules:
//! - `events`: command executions and authentication attempts as stored
//!   and as emitted on the wire
//! - `cursor`: monotonic poll cursors (integer id and composite sequence)

pub mod cursor;
pub mod events;

pub mod prelude {
    pub use crate::cursor::*;
    pub use crate::events::*;
}
