// Link previewer services
// Settings storage, timers and debouncing, the background coordinator, the
// iframe agent and the tokio runtime that wires the contexts together.

pub mod background;
pub mod debounce;
pub mod iframe_agent;
pub mod logging;
#[cfg(feature = "network")]
pub mod preconnect;
pub mod runtime;
pub mod scheduler;
pub mod settings_engine;
