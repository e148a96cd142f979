//! Instagram endpoints

use super::{Args, Endpoint, IdentifierType, QueryOptions, required};
use crate::pagination::PaginatedResult;
use crate::records::{InstagramComment, InstagramPost, InstagramUser};
use crate::Result;

/// Instagram tools, obtained from [`crate::XpozClient::instagram`]
#[derive(Clone)]
pub struct InstagramNamespace {
    endpoint: Endpoint,
}

impl InstagramNamespace {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// Posts by id. Accepts `fields` and `force_latest`.
    pub async fn get_posts_by_ids<S: AsRef<str>>(
        &self,
        post_ids: &[S],
        options: &QueryOptions,
    ) -> Result<Vec<InstagramPost>> {
        let ids: Vec<String> = post_ids.iter().map(|id| id.as_ref().to_string()).collect();
        let args = Args::new()
            .set("postIds", ids)
            .fields("fields", options.fields.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint.list("getInstagramPostsByIds", args).await
    }

    /// Posts by one account. Accepts `fields`, `start_date`, `end_date` and
    /// `force_latest`.
    pub async fn get_posts_by_user(
        &self,
        identifier: &str,
        identifier_type: IdentifierType,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<InstagramPost>> {
        let args = Args::new()
            .set("identifier", required("identifier", identifier)?)
            .set("identifierType", identifier_type.as_str())
            .fields("fields", options.fields.as_deref())
            .opt("startDate", options.start_date.as_deref())
            .opt("endDate", options.end_date.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint.paginated("getInstagramPostsByUser", args).await
    }

    /// Caption search. Accepts `fields`, `start_date`, `end_date` and
    /// `force_latest`.
    pub async fn search_posts(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<InstagramPost>> {
        let args = dated_query(query, options)?;
        self.endpoint.paginated("getInstagramPostsByKeywords", args).await
    }

    /// Comments on a post. Accepts `fields`, `start_date`, `end_date` and
    /// `force_latest`.
    pub async fn get_comments(
        &self,
        post_id: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<InstagramComment>> {
        let args = Args::new()
            .set("postId", required("post_id", post_id)?)
            .fields("fields", options.fields.as_deref())
            .opt("startDate", options.start_date.as_deref())
            .opt("endDate", options.end_date.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint
            .paginated("getInstagramCommentsByPostId", args)
            .await
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
    ) -> Result<InstagramUser> {
        let args = Args::new()
            .set("identifier", required("identifier", identifier)?)
            .set("identifierType", identifier_type.as_str())
            .fields("fields", options.fields.as_deref());
        self.endpoint.single("getInstagramUser", args).await
    }

    /// Accounts whose name matches. Accepts `limit` and `fields`.
    pub async fn search_users(
        &self,
        name: &str,
        options: &QueryOptions,
    ) -> Result<Vec<InstagramUser>> {
        let args = Args::new()
            .set("name", required("name", name)?)
            .opt("limit", options.limit)
            .fields("fields", options.fields.as_deref());
        self.endpoint.list("searchInstagramUsers", args).await
    }

    /// `"followers"` or `"following"` of an account. Accepts `fields` and
    /// `force_latest`.
    pub async fn get_user_connections(
        &self,
        username: &str,
        connection_type: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<InstagramUser>> {
        let args = Args::new()
            .set("username", required("username", username)?)
            .set("connectionType", required("connection_type", connection_type)?)
            .fields("fields", options.fields.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint
            .paginated("getInstagramUserConnections", args)
            .await
    }

    /// Accounts that interacted with a post, e.g. `"commenters"` or `"likers"`.
    /// Accepts `fields` and `force_latest`.
    pub async fn get_post_interacting_users(
        &self,
        post_id: &str,
        interaction_type: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<InstagramUser>> {
        let args = Args::new()
            .set("postId", required("post_id", post_id)?)
            .set("interactionType", required("interaction_type", interaction_type)?)
            .fields("fields", options.fields.as_deref())
            .opt("forceLatest", options.force_latest);
        self.endpoint
            .paginated("getInstagramPostInteractingUsers", args)
            .await
    }

    /// Accounts that posted about `query`. Accepts `fields`, `start_date`,
    /// `end_date` and `force_latest`.
    pub async fn get_users_by_keywords(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<InstagramUser>> {
        let args = dated_query(query, options)?;
        self.endpoint
            .paginated("getInstagramUsersByKeywords", args)
            .await
    }
}

fn dated_query(query: &str, options: &QueryOptions) -> Result<Args> {
    Ok(Args::new()
        .set("query", required("query", query)?)
        .fields("fields", options.fields.as_deref())
        .opt("startDate", options.start_date.as_deref())
        .opt("endDate", options.end_date.as_deref())
        .opt("forceLatest", options.force_latest))
}
