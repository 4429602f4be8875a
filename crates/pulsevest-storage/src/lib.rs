pub mod client;
pub mod error;
pub mod signing;

pub use client::{ResourceType, StorageClient};
pub use error::StorageError;
pub use signing::{sign_params, sign_params_with};
