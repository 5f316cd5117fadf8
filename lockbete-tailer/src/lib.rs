//! # lockbete-tailer
//!
//! The Event Tailer: converts cursor-bounded poll loops over the append-only
//! event store into continuous push streams of newly-appeared rows.
//!
//! Three variants share one connection lifecycle:
//! - [`AuthTailer`]: exclusive integer-id cursor over auth attempts
//! - [`CommandTailer`]: composite (timestamp, id) cursor over command
//!   events, geo-enriched, with an initial backlog batch
//! - [`ReplayTailer`]: fixed virtual time windows walked over history at an
//!   accelerated rate
//!
//! Each streaming connection is one task owning its cursor exclusively;
//! cancellation flows through a [`StreamSession`] token, and every emission
//! races that token so nothing is written after close.

pub mod arbiter;
pub mod auth;
pub mod command;
pub mod replay;
pub mod session;

pub use arbiter::{ModeArbiter, StreamMode};
pub use auth::AuthTailer;
pub use command::CommandTailer;
pub use replay::ReplayTailer;
pub use session::{batch_channel, Emitter, StreamSession};
