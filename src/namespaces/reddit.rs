//! Reddit endpoints
//!
//! Two lookups are composite: a post with its comments and a subreddit with
//! its posts. Their `results` is one nested object (or a one-element list of
//! it) rather than a flat record list:
//!
//! ```text
//! results:
//!   post:        { ...RedditPost }
//!   comments[N]: [ ...RedditComment ]
//! pagination:    { ...paging of the embedded list }
//! ```

use serde_json::Value;

use super::{Args, Endpoint, QueryOptions, required};
use crate::pagination::PaginatedResult;
use crate::records::{
    Record, RedditComment, RedditPost, RedditPostWithComments, RedditSubreddit, RedditUser,
    SubredditWithPosts, parse_records,
};
use crate::types::{PaginationInfo, Payload};
use crate::{Error, Result};

const SEARCH_POSTS: &str = "searchRedditPosts";
const GET_POST_WITH_COMMENTS: &str = "getRedditPostWithComments";
const SEARCH_COMMENTS: &str = "searchRedditComments";
const GET_USER: &str = "getRedditUser";
const SEARCH_USERS: &str = "searchRedditUsers";
const GET_USERS_BY_KEYWORDS: &str = "getRedditUsersByKeywords";
const SEARCH_SUBREDDITS: &str = "searchRedditSubreddits";
const GET_SUBREDDIT_WITH_POSTS: &str = "getRedditSubredditWithPosts";
const GET_SUBREDDITS_BY_KEYWORDS: &str = "getRedditSubredditsByKeywords";

/// Reddit tools, obtained from [`crate::XpozClient::reddit`]
#[derive(Clone)]
pub struct RedditNamespace {
    endpoint: Endpoint,
}

impl RedditNamespace {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// Post search. Accepts `fields`, `start_date`, `end_date`, `sort`,
    /// `time`, `subreddit` and `force_latest`.
    pub async fn search_posts(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<RedditPost>> {
        let args = Args::new()
            .set("query", required("query", query)?)
            .fields("fields", options.fields.as_deref())
            .opt("startDate", options.start_date.as_deref())
            .opt("endDate", options.end_date.as_deref())
            .opt("sort", options.sort.as_deref())
            .opt("time", options.time.as_deref())
            .opt("subreddit", options.subreddit.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint.paginated(SEARCH_POSTS, args).await
    }

    /// A post and its comments. Accepts `post_fields`, `comment_fields` and
    /// `force_latest`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the service returns no post.
    pub async fn get_post_with_comments(
        &self,
        post_id: &str,
        options: &QueryOptions,
    ) -> Result<RedditPostWithComments> {
        let args = Args::new()
            .set("postId", required("post_id", post_id)?)
            .fields("postFields", options.post_fields.as_deref())
            .fields("commentFields", options.comment_fields.as_deref())
            .opt("forceLatest", options.force_latest);
        let raw = self.endpoint.call(GET_POST_WITH_COMMENTS, args).await?;
        parse_post_with_comments(&raw)
    }

    /// Comment search. Accepts `fields`, `start_date`, `end_date` and `subreddit`.
    pub async fn search_comments(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<RedditComment>> {
        let args = Args::new()
            .set("query", required("query", query)?)
            .fields("fields", options.fields.as_deref())
            .opt("startDate", options.start_date.as_deref())
            .opt("endDate", options.end_date.as_deref())
            .opt("subreddit", options.subreddit.as_deref());
        self.endpoint.paginated(SEARCH_COMMENTS, args).await
    }

    /// One account. Accepts `fields`.
    pub async fn get_user(&self, username: &str, options: &QueryOptions) -> Result<RedditUser> {
        let args = Args::new()
            .set("username", required("username", username)?)
            .fields("fields", options.fields.as_deref());
        self.endpoint.single(GET_USER, args).await
    }

    /// Accounts whose name matches. Accepts `limit` and `fields`.
    pub async fn search_users(&self, name: &str, options: &QueryOptions) -> Result<Vec<RedditUser>> {
        let args = Args::new()
            .set("name", required("name", name)?)
            .opt("limit", options.limit)
            .fields("fields", options.fields.as_deref());
        self.endpoint.list(SEARCH_USERS, args).await
    }

    /// Accounts that posted about `query`. Accepts `fields`, `start_date`,
    /// `end_date`, `subreddit` and `force_latest`.
    pub async fn get_users_by_keywords(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<RedditUser>> {
        let args = Args::new()
            .set("query", required("query", query)?)
            .fields("fields", options.fields.as_deref())
            .opt("startDate", options.start_date.as_deref())
            .opt("endDate", options.end_date.as_deref())
            .opt("subreddit", options.subreddit.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint.paginated(GET_USERS_BY_KEYWORDS, args).await
    }

    /// Subreddits whose name or description matches. Accepts `limit` and `fields`.
    pub async fn search_subreddits(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Vec<RedditSubreddit>> {
        let args = Args::new()
            .set("query", required("query", query)?)
            .opt("limit", options.limit)
            .fields("fields", options.fields.as_deref());
        self.endpoint.list(SEARCH_SUBREDDITS, args).await
    }

    /// A subreddit and its posts. Accepts `subreddit_fields`, `post_fields`
    /// and `force_latest`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the service returns no subreddit.
    pub async fn get_subreddit_with_posts(
        &self,
        subreddit_name: &str,
        options: &QueryOptions,
    ) -> Result<SubredditWithPosts> {
        let args = Args::new()
            .set("subredditName", required("subreddit_name", subreddit_name)?)
            .fields("subredditFields", options.subreddit_fields.as_deref())
            .fields("postFields", options.post_fields.as_deref())
            .opt("forceLatest", options.force_latest);
        let raw = self.endpoint.call(GET_SUBREDDIT_WITH_POSTS, args).await?;
        parse_subreddit_with_posts(&raw)
    }

    /// Subreddits where `query` is discussed. Accepts `fields`, `start_date`,
    /// `end_date` and `force_latest`.
    pub async fn get_subreddits_by_keywords(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<RedditSubreddit>> {
        let args = Args::new()
            .set("query", required("query", query)?)
            .fields("fields", options.fields.as_deref())
            .opt("startDate", options.start_date.as_deref())
            .opt("endDate", options.end_date.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint.paginated(GET_SUBREDDITS_BY_KEYWORDS, args).await
    }
}

/// The head record and embedded list of a composite response
struct Composite<'a> {
    head: &'a Payload,
    list: Option<&'a Value>,
    pagination: PaginationInfo,
}

fn composite<'a>(tool: &str, raw: &'a Payload, head_key: &str, list_key: &str) -> Result<Composite<'a>> {
    let results = match raw.get("results") {
        Some(Value::Array(items)) => items.first().and_then(Value::as_object),
        Some(Value::Object(map)) => Some(map),
        _ => None,
    };
    let results = results
        .filter(|map| !map.is_empty())
        .ok_or_else(|| Error::not_found(format!("{} returned no results", tool)))?;

    // without a head key the results object is the head record itself
    let head = results
        .get(head_key)
        .and_then(Value::as_object)
        .unwrap_or(results);

    Ok(Composite {
        head,
        list: results.get(list_key),
        pagination: PaginationInfo::from_payload(raw),
    })
}

impl Composite<'_> {
    fn list_pagination(&self) -> Option<PaginationInfo> {
        (self.pagination.total_pages > 0).then(|| self.pagination.clone())
    }
}

fn parse_post_with_comments(raw: &Payload) -> Result<RedditPostWithComments> {
    let parts = composite(GET_POST_WITH_COMMENTS, raw, "post", "comments")?;
    Ok(RedditPostWithComments {
        post: RedditPost::from_payload(parts.head)?,
        comments: parse_records(parts.list)?,
        comments_pagination: parts.list_pagination(),
        comments_table_name: parts.pagination.table_name.clone(),
    })
}

fn parse_subreddit_with_posts(raw: &Payload) -> Result<SubredditWithPosts> {
    let parts = composite(GET_SUBREDDIT_WITH_POSTS, raw, "subreddit", "posts")?;
    Ok(SubredditWithPosts {
        subreddit: RedditSubreddit::from_payload(parts.head)?,
        posts: parse_records(parts.list)?,
        posts_pagination: parts.list_pagination(),
        posts_table_name: parts.pagination.table_name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::parse_response_text;
    use crate::polling::Poller;
    use crate::test_support::ScriptedTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn reddit(transport: &ScriptedTransport) -> RedditNamespace {
        RedditNamespace::new(Endpoint::new(Arc::new(transport.clone()), Poller::default()))
    }

    #[tokio::test]
    async fn test_post_with_comments_nested_object() {
        let transport = ScriptedTransport::new().reply(json!({
            "results": {
                "post": {"id": "abc", "title": "Why Rust?", "score": 420},
                "comments": [
                    {"id": "c1", "body": "memory safety", "depth": 0},
                    {"id": "c2", "body": "cargo", "depth": 1, "parentId": "c1"}
                ]
            },
            "pagination": {"tableName": "tbl_c", "totalPages": 4, "pageNumber": 1, "totalRows": 350}
        }));

        let thread = reddit(&transport)
            .get_post_with_comments(
                "abc",
                &QueryOptions::new().comment_fields(["id", "body", "parent_id"]),
            )
            .await
            .unwrap();

        assert_eq!(thread.post.title.as_deref(), Some("Why Rust?"));
        assert_eq!(thread.comments.len(), 2);
        assert_eq!(thread.comments[1].parent_id.as_deref(), Some("c1"));
        assert_eq!(thread.comments_pagination.as_ref().unwrap().total_pages, 4);
        assert_eq!(thread.comments_table_name.as_deref(), Some("tbl_c"));

        let (tool, args) = &transport.calls()[0];
        assert_eq!(tool, "getRedditPostWithComments");
        assert_eq!(args["commentFields"], json!(["id", "body", "parentId"]));
        assert!(!args.contains_key("postFields"));
    }

    #[test]
    fn test_post_with_comments_from_list_without_pagination() {
        let raw = json!({
            "results": [{"post": {"id": "p"}, "comments": []}]
        });
        let thread = parse_post_with_comments(raw.as_object().unwrap()).unwrap();

        assert_eq!(thread.post.id.as_deref(), Some("p"));
        assert!(thread.comments.is_empty());
        assert_eq!(thread.comments_pagination, None);
        assert_eq!(thread.comments_table_name, None);
    }

    #[test]
    fn test_post_with_comments_flat_post() {
        let raw = json!({"results": {"id": "flat", "title": "no post key"}});
        let thread = parse_post_with_comments(raw.as_object().unwrap()).unwrap();
        assert_eq!(thread.post.id.as_deref(), Some("flat"));
    }

    #[test]
    fn test_composite_without_results_is_not_found() {
        for raw in [json!({}), json!({"results": []}), json!({"results": {}})] {
            let err = parse_subreddit_with_posts(raw.as_object().unwrap()).unwrap_err();
            assert!(matches!(err, Error::NotFound(_)));
        }
    }

    #[test]
    fn test_subreddit_with_posts_from_text_format() {
        let text = "\
success: true
data:
  results:
    subreddit:
      id: t5_2s7lj
      displayName: rust
      subscribersCount: 312000
    posts[2]{id,title,score}:
      p1,\"Announcing Rust 1.80\",1500
      p2,\"async, explained\",240
  pagination:
    tableName: tbl_s
    totalRows: 2
    totalPages: 1
    pageNumber: 1
";
        let raw = parse_response_text(text);
        let listing = parse_subreddit_with_posts(&raw).unwrap();

        assert_eq!(listing.subreddit.display_name.as_deref(), Some("rust"));
        assert_eq!(listing.subreddit.subscribers_count, Some(312_000));
        assert_eq!(listing.posts.len(), 2);
        assert_eq!(listing.posts[1].title.as_deref(), Some("async, explained"));
        assert_eq!(listing.posts[0].score, Some(1500));
        assert_eq!(listing.posts_table_name.as_deref(), Some("tbl_s"));
    }

    #[tokio::test]
    async fn test_search_posts_forwards_reddit_options() {
        let transport = ScriptedTransport::new().reply(json!({"results": []}));
        let options = QueryOptions::new().sort("top").time("week").subreddit("rust");

        reddit(&transport).search_posts("tokio", &options).await.unwrap();

        let (tool, args) = &transport.calls()[0];
        assert_eq!(tool, "searchRedditPosts");
        assert_eq!(
            Value::Object(args.clone()),
            json!({"query": "tokio", "sort": "top", "time": "week", "subreddit": "rust"})
        );
    }
}
