//! Process lifecycle: shutdown broadcast and signal handling.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_shutdown;
