pub mod agent;
pub mod context;
pub mod diversity;
pub mod local_search;
pub mod population;
pub mod progress;
pub mod swap_log;

pub use agent::{Agent, AgentScope, AgentTree};
pub use context::{RunContext, INITIAL_POCKET_DEPTH};
pub use diversity::{Replacement, Slot};
pub use population::{Population, RunSummary};
pub use progress::{
    ChannelProgressCallback, ConsoleProgressCallback, ProgressCallback, ProgressMessage, SilentProgressCallback,
};
pub use swap_log::{DiscardSwapLog, JsonLinesSwapLog, MemorySwapLog, SolutionSnapshot, SwapLog, SwapRecord};
