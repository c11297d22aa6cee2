pub mod confidence;
pub mod enrich;
pub mod indicators;
pub mod market;
pub mod profile;
pub mod scoring;
pub mod selection;
pub mod stats;
