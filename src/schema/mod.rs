//! Story data types consumed by the assembler and validator.

pub mod character;
pub mod marker;
pub mod outline;
pub mod scene;
pub mod story;
