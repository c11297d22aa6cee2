pub mod contract;
pub mod market;
pub mod profile;
pub mod recommendation;
pub mod trade;
