pub mod export;
pub mod plan;
pub mod probe;
pub mod validate;
