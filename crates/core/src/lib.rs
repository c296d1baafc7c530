pub mod config;
pub mod error;
pub mod plan;
pub mod rule;
pub mod window;

pub use config::Config;
pub use error::*;
pub use plan::*;
pub use rule::*;
pub use window::DateWindow;
