//! Tools module

pub mod desktop;
pub mod hotkey;

// Re-export commonly used desktop types
pub use desktop::{
    DesktopActions,
    DesktopTool,
    CENTER,
    SCROLL_STEP,
};
