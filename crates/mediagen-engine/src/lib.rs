pub mod orchestrator;
pub mod providers;
pub mod store;

pub use orchestrator::Orchestrator;
pub use providers::{default_registry, MediaProvider, ProviderRegistry};
pub use store::FileStore;
