pub mod models;
pub mod ports;

pub use models::*;
pub use ports::*;
