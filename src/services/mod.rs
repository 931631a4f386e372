pub mod compositor;
pub mod dispatcher;
pub mod event_source;
pub mod rule_engine;
pub mod scheduler;
pub mod wayfire_socket;

pub use compositor::{create_compositor, CompositorClient};
pub use event_source::create_event_source;
pub use rule_engine::{EngineOptions, RuleEngine};
