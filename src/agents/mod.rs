pub mod loader;
pub mod profile;
pub mod registry;
pub mod trader;

pub use profile::AgentProfile;
pub use registry::{AgentRegistry, ResolutionPolicy, RunnableAgent};
pub use trader::{RunSummary, Services, TraderAgent};
