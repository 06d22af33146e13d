pub mod client;
pub mod resilient;

pub use client::{HttpClient, HttpClientBuilder};
pub use resilient::ResilientClient;
