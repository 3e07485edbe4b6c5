pub mod bot;
pub mod commands;
pub mod system;

pub use bot::Bot;
pub use system::SessionRegistry;
