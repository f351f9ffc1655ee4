pub mod background;
pub mod config;
pub mod state;
pub mod terminal;

pub use background::{BackgroundSupervisor, ProcessState, ProcessSummary, SupervisorError};
pub use config::Config;
pub use state::ControlState;
pub use terminal::{FocusedPane, LayoutState, TabInfo, TerminalBridge};
