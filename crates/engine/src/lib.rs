//! Submission pipeline for the conversational command layer.
//!
//! One submission runs a constrained sequence:
//! 1. **Classification** (`waypoint-core::classifier`) - ordered pattern
//!    families, first match wins
//! 2. **Resolution** (`waypoint-core::resolver`) - graded name lookup
//!    against the store snapshot
//! 3. **Execution** (`executor`) - idempotent mutations through the
//!    `EntityStore` trait
//! 4. **Suggestion** (`waypoint-core::suggestions`) - up to three
//!    proactive hints from the post-mutation snapshot
//!
//! Messages no pattern recognizes are handed to a `RemoteDelegate`
//! (`delegate`), whose side effects fan out on a broadcast bus (`bus`).
//! After every path the `SessionSynchronizer` (`sync`) reconciles the
//! optimistic transcript against the durable session log.
//!
//! The pattern layer never guesses: anything it cannot classify with
//! certainty goes to the delegate instead of mutating state.

pub mod bus;
pub mod delegate;
pub mod engine;
pub mod executor;
pub mod sync;

pub use bus::{BusEvent, NotificationBus};
pub use delegate::{CreatedEntity, DelegateReply, EchoDelegate, HttpDelegate, RemoteDelegate};
pub use engine::{ChatEngine, SubmissionReport};
pub use executor::{ActionExecutor, ExecutionOutcome};
pub use sync::SessionSynchronizer;
