// HTTP routes
pub mod health;
pub mod monitor;
pub mod submit;

pub use health::*;
pub use monitor::*;
pub use submit::*;
