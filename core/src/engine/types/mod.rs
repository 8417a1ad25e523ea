//! Type definitions for the engine
//!
//! - Runtime values (Val)
//! - Guest exceptions and host faults (ErrorInfo, Fault, ProtocolViolation)
//! - Signals, payloads and loop control (Signal, Payload, Flow)

pub mod control;
pub mod errors;
pub mod values;

// Re-export all types for convenient access
pub use control::{Flow, Payload, Signal};
pub use errors::{ErrorInfo, Fault, ProtocolViolation};
pub use values::{json_to_val, val_to_json, Val};
