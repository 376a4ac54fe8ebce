pub mod ports;
pub mod generate_use_case;
pub mod clean_use_case;
pub mod aggregate_use_case;

pub use aggregate_use_case::AggregateUseCase;
pub use clean_use_case::CleanUseCase;
pub use generate_use_case::{GenerateUseCase, LayerOutput};
