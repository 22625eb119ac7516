//! Reference capability providers for Reactor.
//!
//! Small in-process implementations of the `ToolProvider` trait, used by
//! integration-style tests and as templates for real capability servers.

pub mod calculator;
pub mod file_read;
pub mod path;

pub use calculator::CalculatorTool;
pub use file_read::FileReadTool;

use reactor_core::tool::CapabilityMap;
use std::sync::Arc;

/// Create a capability map with every built-in provider registered.
///
/// The file reader blocks credential-bearing system paths by default.
pub fn default_capabilities() -> CapabilityMap {
    let mut capabilities = CapabilityMap::new();
    capabilities.register(Arc::new(CalculatorTool));
    capabilities.register(Arc::new(FileReadTool::with_restrictions(
        Vec::new(),
        vec!["/etc".into(), "/root/.ssh".into()],
    )));
    capabilities
}
