//! Blocking client
//!
//! Same API as the async [`crate::XpozClient`], for callers without an async
//! runtime. The client owns a current-thread tokio runtime and blocks on the
//! async implementation for every call, so both flavours share one code path.
//! Polling in [`XpozClient::wait_for_operation`] parks the calling thread
//! between status checks.
//!
//! Do not use these types from inside an async runtime; blocking on a nested
//! runtime panics.
//!
//! ```rust,no_run
//! use xpoz::blocking::XpozClient;
//! use xpoz::{ClientOptions, QueryOptions};
//!
//! fn main() -> Result<(), xpoz::Error> {
//!     let client = XpozClient::new(ClientOptions::from_env()?)?;
//!
//!     let page = client.reddit().search_posts("borrow checker", &QueryOptions::new())?;
//!     for post in &page.data {
//!         println!("{:?}", post.title);
//!     }
//!     let all = page.drain_all()?;
//!     println!("{} posts in total", all.len());
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::client::XpozClient as AsyncClient;
use crate::namespaces::{self, IdentifierType, QueryOptions};
use crate::records::{
    InstagramComment, InstagramPost, InstagramUser, Record, RedditComment, RedditPost,
    RedditPostWithComments, RedditSubreddit, RedditUser, SubredditWithPosts, TwitterPost,
    TwitterUser,
};
use crate::transport::ToolTransport;
use crate::types::{ClientOptions, Payload};
use crate::{Error, Result};

fn runtime() -> Result<Arc<Runtime>> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map(Arc::new)
        .map_err(|e| Error::config(format!("Failed to start runtime: {}", e)))
}

/// Blocking client for the Xpoz social data service.
///
/// The session is opened in [`new`](Self::new) and closed on drop.
pub struct XpozClient {
    inner: AsyncClient,
    runtime: Arc<Runtime>,
}

impl fmt::Debug for XpozClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XpozClient").field("inner", &self.inner).finish()
    }
}

impl XpozClient {
    /// Create a client and open its session.
    ///
    /// # Errors
    ///
    /// Any error from building the transport or from `connect`.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let runtime = runtime()?;
        let inner = AsyncClient::new(options)?;
        runtime.block_on(inner.connect())?;
        Ok(Self { inner, runtime })
    }

    /// Create a client over any [`ToolTransport`] and open its session.
    pub fn with_transport(options: ClientOptions, transport: Arc<dyn ToolTransport>) -> Result<Self> {
        let runtime = runtime()?;
        let inner = AsyncClient::with_transport(options, transport);
        runtime.block_on(inner.connect())?;
        Ok(Self { inner, runtime })
    }

    pub fn options(&self) -> &ClientOptions {
        self.inner.options()
    }

    /// Close the session early. Dropping the client does the same.
    pub fn close(&self) -> Result<()> {
        self.runtime.block_on(self.inner.close())
    }

    pub fn twitter(&self) -> TwitterNamespace {
        TwitterNamespace {
            inner: self.inner.twitter(),
            runtime: Arc::clone(&self.runtime),
        }
    }

    pub fn instagram(&self) -> InstagramNamespace {
        InstagramNamespace {
            inner: self.inner.instagram(),
            runtime: Arc::clone(&self.runtime),
        }
    }

    pub fn reddit(&self) -> RedditNamespace {
        RedditNamespace {
            inner: self.inner.reddit(),
            runtime: Arc::clone(&self.runtime),
        }
    }

    /// Call a tool by name with raw camelCase arguments; a pending
    /// `operationId` is returned as-is
    pub fn call_tool(&self, name: &str, arguments: Payload) -> Result<Payload> {
        self.runtime.block_on(self.inner.call_tool(name, arguments))
    }

    /// Poll an operation to completion, sleeping this thread between checks
    pub fn wait_for_operation(&self, operation_id: &str) -> Result<Payload> {
        let transport = self.inner.transport();
        self.inner.poller().wait_blocking(
            |name, args| self.runtime.block_on(transport.call_tool(name, args)),
            operation_id,
        )
    }
}

impl Drop for XpozClient {
    fn drop(&mut self) {
        if let Err(e) = self.runtime.block_on(self.inner.close()) {
            log::warn!("Failed to close session on drop: {}", e);
        }
    }
}

/// Blocking view of a [`crate::PaginatedResult`].
///
/// Dereferences to the async cursor for `data`, `pagination` and the other
/// read-only accessors; navigation methods block.
#[derive(Clone)]
pub struct PaginatedResult<T> {
    inner: crate::PaginatedResult<T>,
    runtime: Arc<Runtime>,
}

impl<T> Deref for PaginatedResult<T> {
    type Target = crate::PaginatedResult<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for PaginatedResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl<T> fmt::Display for PaginatedResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl<T: Record> PaginatedResult<T> {
    fn wrap(inner: crate::PaginatedResult<T>, runtime: &Arc<Runtime>) -> Self {
        Self {
            inner,
            runtime: Arc::clone(runtime),
        }
    }

    /// See [`crate::PaginatedResult::next_page`]
    pub fn next_page(&self) -> Result<Self> {
        let page = self.runtime.block_on(self.inner.next_page())?;
        Ok(Self::wrap(page, &self.runtime))
    }

    /// See [`crate::PaginatedResult::get_page`]
    pub fn get_page(&self, page_number: i64) -> Result<Self> {
        let page = self.runtime.block_on(self.inner.get_page(page_number))?;
        Ok(Self::wrap(page, &self.runtime))
    }

    /// See [`crate::PaginatedResult::drain_all`]
    pub fn drain_all(&self) -> Result<Vec<T>> {
        self.runtime.block_on(self.inner.drain_all())
    }

    /// See [`crate::PaginatedResult::export_csv`]
    pub fn export_csv(&self) -> Result<String> {
        self.runtime.block_on(self.inner.export_csv())
    }

    pub fn into_inner(self) -> crate::PaginatedResult<T> {
        self.inner
    }
}

// Generates blocking wrappers: `list`/`one` methods return the async result
// unchanged, `page` methods wrap the cursor.
macro_rules! blocking_methods {
    ($(
        $kind:ident fn $name:ident(&self $(, $arg:ident: $ty:ty)*) -> $ret:ty;
    )*) => {
        $(
            blocking_methods!(@one $kind $name ($($arg: $ty),*) $ret);
        )*
    };
    (@one page $name:ident ($($arg:ident: $ty:ty),*) $ret:ty) => {
        #[doc = concat!("Blocking `", stringify!($name), "`")]
        pub fn $name(&self, $($arg: $ty),*) -> Result<PaginatedResult<$ret>> {
            let page = self.runtime.block_on(self.inner.$name($($arg),*))?;
            Ok(PaginatedResult::wrap(page, &self.runtime))
        }
    };
    (@one value $name:ident ($($arg:ident: $ty:ty),*) $ret:ty) => {
        #[doc = concat!("Blocking `", stringify!($name), "`")]
        pub fn $name(&self, $($arg: $ty),*) -> Result<$ret> {
            self.runtime.block_on(self.inner.$name($($arg),*))
        }
    };
}

/// Blocking Twitter/X tools
#[derive(Clone)]
pub struct TwitterNamespace {
    inner: namespaces::TwitterNamespace,
    runtime: Arc<Runtime>,
}

impl TwitterNamespace {
    /// Blocking `get_posts_by_ids`
    pub fn get_posts_by_ids<S: AsRef<str>>(
        &self,
        post_ids: &[S],
        options: &QueryOptions,
    ) -> Result<Vec<TwitterPost>> {
        self.runtime
            .block_on(self.inner.get_posts_by_ids(post_ids, options))
    }

    blocking_methods! {
        page fn get_posts_by_author(&self, identifier: &str, identifier_type: IdentifierType, options: &QueryOptions) -> TwitterPost;
        page fn search_posts(&self, query: &str, options: &QueryOptions) -> TwitterPost;
        page fn get_retweets(&self, post_id: &str, options: &QueryOptions) -> TwitterPost;
        page fn get_quotes(&self, post_id: &str, options: &QueryOptions) -> TwitterPost;
        page fn get_comments(&self, post_id: &str, options: &QueryOptions) -> TwitterPost;
        page fn get_post_interacting_users(&self, post_id: &str, interaction_type: &str, options: &QueryOptions) -> TwitterUser;
        value fn count_posts(&self, phrase: &str, options: &QueryOptions) -> i64;
        value fn get_user(&self, identifier: &str, identifier_type: IdentifierType, options: &QueryOptions) -> TwitterUser;
        value fn search_users(&self, name: &str, options: &QueryOptions) -> Vec<TwitterUser>;
        page fn get_user_connections(&self, username: &str, connection_type: &str, options: &QueryOptions) -> TwitterUser;
        page fn get_users_by_keywords(&self, query: &str, options: &QueryOptions) -> TwitterUser;
    }
}

/// Blocking Instagram tools
#[derive(Clone)]
pub struct InstagramNamespace {
    inner: namespaces::InstagramNamespace,
    runtime: Arc<Runtime>,
}

impl InstagramNamespace {
    /// Blocking `get_posts_by_ids`
    pub fn get_posts_by_ids<S: AsRef<str>>(
        &self,
        post_ids: &[S],
        options: &QueryOptions,
    ) -> Result<Vec<InstagramPost>> {
        self.runtime
            .block_on(self.inner.get_posts_by_ids(post_ids, options))
    }

    blocking_methods! {
        page fn get_posts_by_user(&self, identifier: &str, identifier_type: IdentifierType, options: &QueryOptions) -> InstagramPost;
        page fn search_posts(&self, query: &str, options: &QueryOptions) -> InstagramPost;
        page fn get_comments(&self, post_id: &str, options: &QueryOptions) -> InstagramComment;
        value fn get_user(&self, identifier: &str, identifier_type: IdentifierType, options: &QueryOptions) -> InstagramUser;
        value fn search_users(&self, name: &str, options: &QueryOptions) -> Vec<InstagramUser>;
        page fn get_user_connections(&self, username: &str, connection_type: &str, options: &QueryOptions) -> InstagramUser;
        page fn get_post_interacting_users(&self, post_id: &str, interaction_type: &str, options: &QueryOptions) -> InstagramUser;
        page fn get_users_by_keywords(&self, query: &str, options: &QueryOptions) -> InstagramUser;
    }
}

/// Blocking Reddit tools
#[derive(Clone)]
pub struct RedditNamespace {
    inner: namespaces::RedditNamespace,
    runtime: Arc<Runtime>,
}

impl RedditNamespace {
    blocking_methods! {
        page fn search_posts(&self, query: &str, options: &QueryOptions) -> RedditPost;
        value fn get_post_with_comments(&self, post_id: &str, options: &QueryOptions) -> RedditPostWithComments;
        page fn search_comments(&self, query: &str, options: &QueryOptions) -> RedditComment;
        value fn get_user(&self, username: &str, options: &QueryOptions) -> RedditUser;
        value fn search_users(&self, name: &str, options: &QueryOptions) -> Vec<RedditUser>;
        page fn get_users_by_keywords(&self, query: &str, options: &QueryOptions) -> RedditUser;
        value fn search_subreddits(&self, query: &str, options: &QueryOptions) -> Vec<RedditSubreddit>;
        value fn get_subreddit_with_posts(&self, subreddit_name: &str, options: &QueryOptions) -> SubredditWithPosts;
        page fn get_subreddits_by_keywords(&self, query: &str, options: &QueryOptions) -> RedditSubreddit;
    }
}
