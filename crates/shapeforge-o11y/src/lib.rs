//! Observability bootstrap for shapeforge tools.
//!
//! The engine crates only emit through `tracing` macros; embedding
//! applications that want output call [`logging::init`] once at startup.

pub mod logging;
pub mod panic;
