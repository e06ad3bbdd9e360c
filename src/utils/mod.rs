pub mod geo;
pub mod office_cache;
pub mod report;
