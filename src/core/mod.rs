pub mod data;
pub mod errors;
pub mod frame;

pub use data::*; // Re-export common data types
pub use errors::*;
pub use frame::Frame;
