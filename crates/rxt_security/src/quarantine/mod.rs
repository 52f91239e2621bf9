//! Quarantine lifecycle.
//!
//! A quarantine strips a member's roles, assigns the restricted quarantine
//! role and applies a native timeout. The original roles are kept in a
//! [`RoleSnapshot`] and given back when the restore timer fires or an
//! administrator releases the member.

mod manager;
mod model;
mod scheduler;
mod store;

pub use manager::{
    QuarantineManager, QuarantineOutcome, ReconcileReport, RestoreOutcome, RestoreReport,
    RestoreTrigger, format_duration,
};
pub use model::{QuarantineEntry, RoleSnapshot, ViolationRecord, escalated_duration};
pub use scheduler::RestoreScheduler;
pub use store::{JsonQuarantineStore, MemoryQuarantineStore, QuarantineStore};
