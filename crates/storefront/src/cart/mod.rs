//! Cart subsystem.
//!
//! - [`state`]: the observable cart state container
//! - [`sync`]: backend-backed cart operations
//! - [`merge`]: the guest-to-server hand-off at login
//! - [`actions`]: the UI-facing facade choosing guest or synced path

pub mod actions;
pub mod merge;
pub mod state;
pub mod sync;

pub use actions::CartActions;
pub use merge::{LoginMerge, MergeOutcome, MergeStatus};
pub use state::{CartIdentity, CartState, CartStore, RequestTicket};
pub use sync::CartSync;
