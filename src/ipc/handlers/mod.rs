pub mod core;
pub mod results;
pub mod upload;
