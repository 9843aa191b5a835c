pub mod confidence;
pub mod description;
pub mod filter;
pub mod fusion;
pub mod similarity;

mod error;

pub use error::{Error, Result};
