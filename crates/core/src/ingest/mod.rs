pub mod provider;
pub mod trades;
pub mod types;
pub mod universe;
