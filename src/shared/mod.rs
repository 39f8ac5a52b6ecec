pub mod contracts;
pub mod definitions;
pub mod errors;
