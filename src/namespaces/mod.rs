//! Endpoint namespaces
//!
//! One handle per platform, each exposing the service's tools as typed
//! methods. Every method follows the same path:
//!
//! 1. build a flat camelCase argument map, leaving out absent options
//!    (the service treats an omitted argument differently from `null`)
//! 2. call the tool; if the answer is an operation id, poll it to completion
//! 3. shape the final payload into a record, a list, a count or a
//!    [`PaginatedResult`]
//!
//! Optional arguments for all methods are collected in [`QueryOptions`]. A
//! method only forwards the options its tool accepts; the rest are ignored.

pub mod instagram;
pub mod reddit;
pub mod twitter;

pub use instagram::InstagramNamespace;
pub use reddit::RedditNamespace;
pub use twitter::TwitterNamespace;

use serde_json::Value;
use std::sync::Arc;

use crate::field_mapping::map_fields_to_camel;
use crate::pagination::{PageSource, PaginatedResult};
use crate::polling::Poller;
use crate::records::{Record, parse_records};
use crate::transport::ToolTransport;
use crate::types::Payload;
use crate::{Error, Result};

/// How an account is identified in lookups by author or user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentifierType {
    #[default]
    Username,
    Id,
}

impl IdentifierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierType::Username => "username",
            IdentifierType::Id => "id",
        }
    }
}

/// Optional arguments shared by the endpoint methods
///
/// Field lists are given in snake_case (as named on the record structs) and
/// converted to the service's camelCase when sent.
///
/// ```rust
/// use xpoz::QueryOptions;
///
/// let options = QueryOptions::new()
///     .fields(["id", "text", "like_count"])
///     .start_date("2024-01-01")
///     .force_latest(true);
/// assert_eq!(options.start_date.as_deref(), Some("2024-01-01"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Record fields to return
    pub fields: Option<Vec<String>>,
    /// Inclusive lower bound, `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`
    pub end_date: Option<String>,
    /// Bypass the service cache
    pub force_latest: Option<bool>,
    pub language: Option<String>,
    pub author_username: Option<String>,
    pub author_id: Option<String>,
    pub subreddit: Option<String>,
    /// Reddit sort order (`relevance`, `hot`, `top`, `new`, `comments`)
    pub sort: Option<String>,
    /// Reddit time window (`hour`, `day`, `week`, `month`, `year`, `all`)
    pub time: Option<String>,
    pub limit: Option<i64>,
    /// Post fields for composite lookups
    pub post_fields: Option<Vec<String>>,
    /// Comment fields for a post-with-comments lookup
    pub comment_fields: Option<Vec<String>>,
    /// Subreddit fields for a subreddit-with-posts lookup
    pub subreddit_fields: Option<Vec<String>>,
}

fn owned_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(owned_list(fields));
        self
    }

    pub fn start_date(mut self, date: impl Into<String>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    pub fn end_date(mut self, date: impl Into<String>) -> Self {
        self.end_date = Some(date.into());
        self
    }

    pub fn force_latest(mut self, force: bool) -> Self {
        self.force_latest = Some(force);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn author_username(mut self, username: impl Into<String>) -> Self {
        self.author_username = Some(username.into());
        self
    }

    pub fn author_id(mut self, id: impl Into<String>) -> Self {
        self.author_id = Some(id.into());
        self
    }

    pub fn subreddit(mut self, subreddit: impl Into<String>) -> Self {
        self.subreddit = Some(subreddit.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn post_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post_fields = Some(owned_list(fields));
        self
    }

    pub fn comment_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comment_fields = Some(owned_list(fields));
        self
    }

    pub fn subreddit_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subreddit_fields = Some(owned_list(fields));
        self
    }
}

/// Flat argument map that drops absent values
#[derive(Debug, Default)]
pub(crate) struct Args(Payload);

impl Args {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub(crate) fn opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    /// A field list, converted to camelCase
    pub(crate) fn fields(self, key: &str, fields: Option<&[String]>) -> Self {
        self.opt(key, fields.map(map_fields_to_camel))
    }

    pub(crate) fn into_payload(self) -> Payload {
        self.0
    }
}

/// Reject blank required arguments before anything is sent
pub(crate) fn required<'a>(name: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{} must not be empty", name)));
    }
    Ok(value)
}

/// Transport plus polling settings, shared by every namespace handle
#[derive(Clone)]
pub(crate) struct Endpoint {
    transport: Arc<dyn ToolTransport>,
    poller: Poller,
}

impl Endpoint {
    pub(crate) fn new(transport: Arc<dyn ToolTransport>, poller: Poller) -> Self {
        Self { transport, poller }
    }

    pub(crate) async fn call(&self, tool: &str, args: Args) -> Result<Payload> {
        self.poller
            .call_and_wait(self.transport.as_ref(), tool, args.into_payload())
            .await
    }

    pub(crate) async fn list<T: Record>(&self, tool: &str, args: Args) -> Result<Vec<T>> {
        let raw = self.call(tool, args).await?;
        parse_records(raw.get("results"))
    }

    pub(crate) async fn single<T: Record>(&self, tool: &str, args: Args) -> Result<T> {
        let raw = self.call(tool, args).await?;
        single_record(tool, &raw)
    }

    pub(crate) async fn paginated<T: Record>(
        &self,
        tool: &str,
        args: Args,
    ) -> Result<PaginatedResult<T>> {
        let base_args = args.into_payload();
        let raw = self
            .poller
            .call_and_wait(self.transport.as_ref(), tool, base_args.clone())
            .await?;

        let source = Arc::new(PageSource {
            transport: Arc::clone(&self.transport),
            tool: tool.to_string(),
            base_args,
            poller: self.poller.clone(),
        });
        PaginatedResult::from_response(&raw, source)
    }
}

/// The first of `results` when it is a non-empty list, the whole payload when
/// there is no `results` key
pub(crate) fn single_record<T: Record>(tool: &str, raw: &Payload) -> Result<T> {
    match raw.get("results") {
        Some(Value::Array(items)) => match items.first() {
            Some(Value::Object(first)) => T::from_payload(first),
            Some(other) => Err(Error::protocol(format!(
                "{} returned a non-record result: {}",
                tool, other
            ))),
            None => Err(Error::not_found(format!("{} returned no results", tool))),
        },
        _ => T::from_payload(raw),
    }
}

/// Read a count from `results` (or `count`)
///
/// The count may be a bare number, a one-element list, or a list holding a
/// single-entry mapping such as `[{"count": 42}]`.
pub(crate) fn parse_count(tool: &str, raw: &Payload) -> Result<i64> {
    let value = raw.get("results").or_else(|| raw.get("count"));

    let scalar = match value {
        None | Some(Value::Null) => return Ok(0),
        Some(Value::Array(items)) => match items.first() {
            None => return Ok(0),
            Some(Value::Object(map)) => map.values().next(),
            Some(first) => Some(first),
        },
        Some(other) => Some(other),
    };

    let count = match scalar {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    count.ok_or_else(|| Error::protocol(format!("{} returned a non-numeric count: {:?}", tool, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::TwitterUser;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_args_omit_absent_values() {
        let options = QueryOptions::new().start_date("2024-01-01");
        let args = Args::new()
            .set("query", "rust")
            .opt("startDate", options.start_date.as_deref())
            .opt("endDate", options.end_date.as_deref())
            .opt("forceLatest", options.force_latest)
            .fields("fields", options.fields.as_deref())
            .into_payload();

        assert_eq!(Value::Object(args), json!({"query": "rust", "startDate": "2024-01-01"}));
    }

    #[test]
    fn test_args_convert_field_lists() {
        let options = QueryOptions::new().fields(["id", "like_count", "x_fetched_at"]);
        let args = Args::new()
            .fields("fields", options.fields.as_deref())
            .into_payload();
        assert_eq!(args["fields"], json!(["id", "likeCount", "xFetchedAt"]));
    }

    #[test]
    fn test_required_rejects_blank() {
        assert!(matches!(required("query", "  "), Err(Error::Validation(_))));
        assert_eq!(required("query", "rust").unwrap(), "rust");
    }

    #[test]
    fn test_single_record_takes_first_result() {
        let raw = payload(json!({"results": [{"id": "1", "username": "a"}, {"id": "2"}]}));
        let user: TwitterUser = single_record("getTwitterUser", &raw).unwrap();
        assert_eq!(user.username.as_deref(), Some("a"));
    }

    #[test]
    fn test_single_record_falls_back_to_payload() {
        let raw = payload(json!({"id": "9", "followersCount": 10}));
        let user: TwitterUser = single_record("getTwitterUser", &raw).unwrap();
        assert_eq!(user.id.as_deref(), Some("9"));
        assert_eq!(user.followers_count, Some(10));
    }

    #[test]
    fn test_single_record_empty_results_is_not_found() {
        let raw = payload(json!({"results": []}));
        let err = single_record::<TwitterUser>("getTwitterUser", &raw).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_parse_count_shapes() {
        let count = |v: Value| parse_count("countTweets", &payload(v));

        assert_eq!(count(json!({"results": 42})).unwrap(), 42);
        assert_eq!(count(json!({"count": 7})).unwrap(), 7);
        assert_eq!(count(json!({"results": [13]})).unwrap(), 13);
        assert_eq!(count(json!({"results": [{"count": 99}]})).unwrap(), 99);
        assert_eq!(count(json!({"results": ["1200"]})).unwrap(), 1200);
        assert_eq!(count(json!({})).unwrap(), 0);
        assert_eq!(count(json!({"results": []})).unwrap(), 0);
        assert!(matches!(count(json!({"results": "lots"})), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_identifier_type() {
        assert_eq!(IdentifierType::default().as_str(), "username");
        assert_eq!(IdentifierType::Id.as_str(), "id");
    }
}
