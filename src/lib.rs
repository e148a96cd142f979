//! # Xpoz SDK - Rust Implementation
//!
//! A typed client for the Xpoz social data service: Twitter/X, Instagram and
//! Reddit posts, users, comments and subreddits, served over MCP.
//!
//! ## Overview
//!
//! Every lookup is a remote tool call. The SDK takes care of the parts around
//! that call:
//!
//! - **Response decoding**: the service's compact indentation-based text
//!   format (and plain JSON) is decoded into ordered maps
//! - **Operation polling**: slow queries answer with an operation id; the SDK
//!   polls it to completion with a fixed interval and a timeout
//! - **Pagination**: paged results come back as immutable cursors that can
//!   fetch any other page, drain everything, or resolve a CSV export
//! - **Typed records**: snake_case structs with every server field optional
//!   and unknown fields preserved
//! - **Two calling styles**: async on tokio, or [`blocking`] for plain threads
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use xpoz::{ClientOptions, QueryOptions, XpozClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), xpoz::Error> {
//!     // API key from XPOZ_API_KEY unless given explicitly
//!     let options = ClientOptions::builder()
//!         .timeout(std::time::Duration::from_secs(600))
//!         .build()?;
//!
//!     let client = XpozClient::new(options)?;
//!     client.connect().await?;
//!
//!     let posts = client
//!         .twitter()
//!         .search_posts(
//!             "\"rust 2024 edition\"",
//!             &QueryOptions::new()
//!                 .fields(["id", "text", "like_count"])
//!                 .start_date("2025-01-01"),
//!         )
//!         .await?;
//!
//!     println!("{}", posts);
//!     for post in &posts.data {
//!         println!("{:?}: {:?}", post.id, post.text);
//!     }
//!
//!     client.close().await
//! }
//! ```
//!
//! ## Architecture
//!
//! - **client** / **blocking**: session lifecycle and namespace handles
//! - **namespaces**: one typed method per service tool
//! - **transport**: the tool-call capability and its MCP streamable-HTTP implementation
//! - **decoder**: text payload to [`Payload`]
//! - **polling**: pending-operation state machine
//! - **pagination**: page cursor with export
//! - **records**: per-platform record structs
//! - **field_mapping**: camelCase / snake_case conversion
//! - **config**, **types**, **error**: options, shared types and the error taxonomy

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

/// Async client owning one MCP session and handing out namespace handles.
mod client;

/// Environment variables, defaults and service constants.
pub mod config;

/// Error enum and `Result<T>` alias used across all public APIs.
mod error;

/// Paginated result cursor with navigation, drain and CSV export.
mod pagination;

/// Client options with a builder, pagination metadata and the `Payload` alias.
mod types;

#[cfg(test)]
mod test_support;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================

/// Blocking flavour of the client, namespaces and cursor.
pub mod blocking;

/// Decoder for the service's text payloads.
pub mod decoder;

/// camelCase / snake_case key conversion.
pub mod field_mapping;

/// Twitter, Instagram and Reddit endpoint families.
pub mod namespaces;

/// Pending-operation poller with async and blocking drivers.
pub mod polling;

/// Typed records for each platform.
pub mod records;

/// Tool-call transport trait and the MCP implementation.
pub mod transport;

// --- Client ---

pub use client::XpozClient;

// --- Errors ---

pub use error::{Error, Result};

// --- Options and shared types ---

pub use namespaces::{IdentifierType, QueryOptions};
pub use pagination::PaginatedResult;
pub use types::{ClientOptions, ClientOptionsBuilder, PaginationInfo, Payload};

// --- Records ---

pub use records::{
    InstagramComment, InstagramPost, InstagramUser, RedditComment, RedditPost,
    RedditPostWithComments, RedditSubreddit, RedditUser, SubredditWithPosts, Tweet, TwitterPost,
    TwitterUser,
};

// ============================================================================
// CONVENIENCE PRELUDE
// ============================================================================

/// Commonly used items. Import with `use xpoz::prelude::*;`.
pub mod prelude {
    pub use crate::{
        ClientOptions, Error, IdentifierType, PaginatedResult, QueryOptions, Result, XpozClient,
    };
    pub use crate::records::Record;
}
