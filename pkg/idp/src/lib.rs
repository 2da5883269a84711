mod client;
mod error;
pub mod models;
pub use client::IdentityApi;
pub use client::IdentityServerClient;
pub use error::Error;

#[cfg(feature = "mock")]
pub use client::MockIdentityApi;
