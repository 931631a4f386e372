//! EventSource service: responsibility and boundaries
//!
//! This module and its submodules are responsible ONLY for subscribing to the
//! compositor's view lifecycle events and forwarding them as ViewEvent(s).
//! They MUST NOT filter by role or evaluate rules; the toplevel guard and all
//! matching happen in RuleEngine.

mod dry_run;
mod wayfire;
mod r#trait;

pub use self::r#trait::{create_event_source, EventSource};
