pub mod error;
pub mod existence_index;
