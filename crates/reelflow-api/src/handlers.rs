//! Request handlers.

pub mod auth;
pub mod health;
pub mod monitor;
pub mod settings;
pub mod stream;
pub mod tasks;

pub use auth::*;
pub use health::*;
pub use monitor::*;
pub use settings::*;
pub use stream::*;
pub use tasks::*;
