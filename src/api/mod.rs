//! Remote API access
//!
//! [`transport`] moves bytes, [`gateway`] turns them into typed outcomes and
//! [`endpoints`] names each call the application makes.

pub mod endpoints;
pub mod gateway;
pub mod multipart;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use endpoints::FeedApi;
pub use gateway::{ApiGateway, ApiResponse, AuthMode, MutationSignal, RequestBody, RequestOptions};
pub use transport::{Method, Transport, UreqTransport};
