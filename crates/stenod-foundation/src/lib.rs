//! Shared foundation for the stenod daemon: error taxonomy, clock
//! abstraction, application state machine, and the shutdown handler.

pub mod clock;
pub mod error;
pub mod shutdown;
pub mod state;

pub use clock::{real_clock, test_clock, Clock, RealClock, SharedClock, TestClock};
pub use error::{AppError, RecoveryStrategy};
pub use shutdown::{ShutdownGuard, ShutdownHandler};
pub use state::{AppState, StateManager};
