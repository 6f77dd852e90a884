//! Executor Implementations
//!
//! Concrete implementations of the `ActionExecutor` trait shipped with the
//! crate. Real deployments plug in their own executor that talks to the stack
//! service; the simulated one drives dry runs from the CLI.

pub mod simulated;

pub use simulated::SimulatedExecutor;
