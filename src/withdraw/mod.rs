//! Withdrawal subsystem
//!
//! State machine, pending-reservation registry, inbound events and
//! outbound message copy.
//!
//! # Architecture
//!
//! ```text
//! WithdrawEvent → WithdrawalCoordinator → PendingWithdrawalRegistry
//!                        │                       (one slot per user)
//!                        ├→ PayoutGateway        (serialized transfers)
//!                        ├→ UserStore            (atomic balance deltas)
//!                        └→ WithdrawalStore      (terminal-state ledger)
//! ```

pub mod coordinator;
pub mod events;
pub mod messages;
pub mod registry;

pub use coordinator::{CancelOutcome, RequestOutcome, SettleOutcome, WithdrawalCoordinator};
pub use events::{WithdrawAction, WithdrawEvent};
pub use registry::{PendingReservation, PendingWithdrawalRegistry};
