//! Supersede GitHub infrastructure adapter.
//!
//! Implements the [`refgraph::Forge`] port for GitHub by shelling out to the
//! `gh` CLI, which owns authentication and host selection.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Everything
//! GitHub-specific lives here: raw response parsing, rate-limit backoff,
//! REST/search/GraphQL pagination and the on-disk response cache. The
//! [`refgraph`] crate never sees any of it.
//!
//! ## Layering
//!
//! ```text
//! GithubClient (Forge)  pagination, cache, decoding
//!   └─ Backoff<T>       one rate-limit retry
//!        └─ Transport   GhCliTransport | ReplayTransport
//! ```

pub mod backoff;
pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod pagination;
pub mod replay;
pub mod response;
pub mod transport;

pub use backoff::{retry_policy, Backoff};
pub use cache::{CacheKey, CacheKeyParts, FileCache};
pub use client::GithubClient;
pub use clock::{Clock, SystemClock};
pub use config::ClientConfig;
pub use error::TransportError;
pub use pagination::{next_link, MAX_PAGES};
pub use replay::{RecordedExchange, ReplayTransport};
pub use response::{parse_raw_response, RawHttpResponse};
pub use transport::{ApiField, ApiRequest, GhCliTransport, Method, Transport};
