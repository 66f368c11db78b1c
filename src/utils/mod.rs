pub mod prepare;

pub use prepare::{prepare_data, PreparedData};
