pub mod chrome;
pub mod frame;

pub use chrome::{ChromeDriver, ConnectionMode};
pub use frame::FrameScope;
