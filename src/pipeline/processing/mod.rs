// Pipeline processing: bronze -> silver cleaning and silver -> gold aggregation

pub mod aggregate;
pub mod clean;
