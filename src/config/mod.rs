/// Configuration subsystem - Editor settings and preferences
///
/// This module handles loading .semicoderc files and applying them to the
/// editor and the renderer.

pub mod rc;

// Re-export public interface
pub use rc::{RcConfig, RcLoader};
