//! Compositor boundary: responsibility and boundaries
//!
//! This module and its submodules only translate typed commands into
//! compositor IPC calls (or record them in dry-run mode). They MUST NOT
//! decide which rules fire; that belongs to RuleEngine and ActionDispatcher.

mod dry_run;
mod wayfire;
mod r#trait;

pub use self::dry_run::{CompositorCall, DryRunCompositor};
pub use self::r#trait::{create_compositor, CompositorClient};
