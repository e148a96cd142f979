//! Twitter/X endpoints

use super::{Args, Endpoint, IdentifierType, QueryOptions, parse_count, required};
use crate::pagination::PaginatedResult;
use crate::records::{TwitterPost, TwitterUser};
use crate::Result;

/// Twitter/X tools, obtained from [`crate::XpozClient::twitter`]
#[derive(Clone)]
pub struct TwitterNamespace {
    endpoint: Endpoint,
}

impl TwitterNamespace {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// Posts by id. Accepts `fields` and `force_latest`.
    pub async fn get_posts_by_ids<S: AsRef<str>>(
        &self,
        post_ids: &[S],
        options: &QueryOptions,
    ) -> Result<Vec<TwitterPost>> {
        let ids: Vec<String> = post_ids.iter().map(|id| id.as_ref().to_string()).collect();
        let args = Args::new()
            .set("postIds", ids)
            .fields("fields", options.fields.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint.list("getTwitterPostsByIds", args).await
    }

    /// Posts written by one account. Accepts `fields`, `start_date`, `end_date`
    /// and `force_latest`.
    pub async fn get_posts_by_author(
        &self,
        identifier: &str,
        identifier_type: IdentifierType,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<TwitterPost>> {
        let args = Args::new()
            .set("identifier", required("identifier", identifier)?)
            .set("identifierType", identifier_type.as_str())
            .fields("fields", options.fields.as_deref())
            .opt("startDate", options.start_date.as_deref())
            .opt("endDate", options.end_date.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint.paginated("getTwitterPostsByAuthor", args).await
    }

    /// Full-text post search. Accepts `fields`, `start_date`, `end_date`,
    /// `author_username`, `author_id`, `language` and `force_latest`.
    pub async fn search_posts(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<TwitterPost>> {
        let args = Args::new()
            .set("query", required("query", query)?)
            .fields("fields", options.fields.as_deref())
            .opt("startDate", options.start_date.as_deref())
            .opt("endDate", options.end_date.as_deref())
            .opt("authorUsername", options.author_username.as_deref())
            .opt("authorId", options.author_id.as_deref())
            .opt("language", options.language.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint.paginated("getTwitterPostsByKeywords", args).await
    }

    /// Retweets of a post. Accepts `fields` and `start_date`.
    pub async fn get_retweets(
        &self,
        post_id: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<TwitterPost>> {
        let args = Args::new()
            .set("postId", required("post_id", post_id)?)
            .fields("fields", options.fields.as_deref())
            .opt("startDate", options.start_date.as_deref());
        self.endpoint.paginated("getTwitterPostRetweets", args).await
    }

    /// Quote posts of a post. Accepts `fields`, `start_date` and `force_latest`.
    pub async fn get_quotes(
        &self,
        post_id: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<TwitterPost>> {
        self.post_thread("getTwitterPostQuotes", post_id, options).await
    }

    /// Replies to a post. Accepts `fields`, `start_date` and `force_latest`.
    pub async fn get_comments(
        &self,
        post_id: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<TwitterPost>> {
        self.post_thread("getTwitterPostComments", post_id, options).await
    }

    /// Accounts that interacted with a post, e.g. `"commenters"`, `"quoters"`
    /// or `"retweeters"`. Accepts `fields` and `force_latest`.
    pub async fn get_post_interacting_users(
        &self,
        post_id: &str,
        interaction_type: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<TwitterUser>> {
        let args = Args::new()
            .set("postId", required("post_id", post_id)?)
            .set("interactionType", required("interaction_type", interaction_type)?)
            .fields("fields", options.fields.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint
            .paginated("getTwitterPostInteractingUsers", args)
            .await
    }

    /// Number of posts matching `phrase`. Accepts `start_date` and `end_date`.
    pub async fn count_posts(&self, phrase: &str, options: &QueryOptions) -> Result<i64> {
        let args = Args::new()
            .set("phrase", required("phrase", phrase)?)
            .opt("startDate", options.start_date.as_deref())
            .opt("endDate", options.end_date.as_deref());
        let raw = self.endpoint.call("countTweets", args).await?;
        parse_count("countTweets", &raw)
    }

    /// One account. Accepts `fields`.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotFound`] when the service returns an empty result list.
    pub async fn get_user(
        &self,
        identifier: &str,
        identifier_type: IdentifierType,
        options: &QueryOptions,
    ) -> Result<TwitterUser> {
        let args = Args::new()
            .set("identifier", required("identifier", identifier)?)
            .set("identifierType", identifier_type.as_str())
            .fields("fields", options.fields.as_deref());
        self.endpoint.single("getTwitterUser", args).await
    }

    /// Accounts whose name matches. Accepts `limit` and `fields`.
    pub async fn search_users(&self, name: &str, options: &QueryOptions) -> Result<Vec<TwitterUser>> {
        let args = Args::new()
            .set("name", required("name", name)?)
            .opt("limit", options.limit)
            .fields("fields", options.fields.as_deref());
        self.endpoint.list("searchTwitterUsers", args).await
    }

    /// `"followers"` or `"following"` of an account. Accepts `fields` and
    /// `force_latest`.
    pub async fn get_user_connections(
        &self,
        username: &str,
        connection_type: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<TwitterUser>> {
        let args = Args::new()
            .set("username", required("username", username)?)
            .set("connectionType", required("connection_type", connection_type)?)
            .fields("fields", options.fields.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint.paginated("getTwitterUserConnections", args).await
    }

    /// Accounts that posted about `query`. Accepts `fields`, `start_date`,
    /// `end_date`, `language` and `force_latest`.
    pub async fn get_users_by_keywords(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<TwitterUser>> {
        let args = Args::new()
            .set("query", required("query", query)?)
            .fields("fields", options.fields.as_deref())
            .opt("startDate", options.start_date.as_deref())
            .opt("endDate", options.end_date.as_deref())
            .opt("language", options.language.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint.paginated("getTwitterUsersByKeywords", args).await
    }

    // quotes and comments share one argument shape
    async fn post_thread(
        &self,
        tool: &str,
        post_id: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<TwitterPost>> {
        let args = Args::new()
            .set("postId", required("post_id", post_id)?)
            .fields("fields", options.fields.as_deref())
            .opt("startDate", options.start_date.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint.paginated(tool, args).await
    }
}
