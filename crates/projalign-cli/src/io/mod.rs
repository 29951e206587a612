pub mod export;
pub mod input;
