//! Typed records for the three platforms
//!
//! Every known field is optional: the service only returns the fields a caller
//! asked for. Fields the struct does not name are kept in `extra` so newer
//! server fields survive a round-trip through an older SDK.
//!
//! Values are read leniently. The text response format infers scalar types
//! from their spelling, so a numeric username arrives as a number and a
//! one-element list may arrive as a bare string; both are accepted.
//!
//! ```rust
//! use xpoz::records::{Record, TwitterPost};
//! use serde_json::json;
//!
//! let raw = json!({"id": 1789, "likeCount": "42", "viewSource": "web"});
//! let post = TwitterPost::from_payload(raw.as_object().unwrap()).unwrap();
//!
//! assert_eq!(post.id.as_deref(), Some("1789"));
//! assert_eq!(post.like_count, Some(42));
//! assert_eq!(post.extra["view_source"], "web");
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::field_mapping::map_keys_to_snake;
use crate::types::{PaginationInfo, Payload};
use crate::Result;

/// A record type the namespaces can build from a decoded mapping
pub trait Record: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Normalize keys to snake_case and deserialize
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the mapping cannot form a record.
    fn from_payload(raw: &Payload) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(map_keys_to_snake(raw)))?)
    }
}

/// Parse every mapping in a `results` list; other values are skipped
///
/// # Errors
///
/// Propagates the first record that fails to deserialize.
pub fn parse_records<T: Record>(results: Option<&Value>) -> Result<Vec<T>> {
    let Some(Value::Array(items)) = results else {
        return Ok(Vec::new());
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(map) => records.push(T::from_payload(map)?),
            other => log::debug!("skipping non-record result item: {}", other),
        }
    }
    Ok(records)
}

/// Conversion from whatever scalar shape the decoder produced
trait Lenient: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

impl Lenient for String {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl Lenient for i64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && f.fract() == 0.0)
                        .map(|f| f as i64)
                })
            }
            _ => None,
        }
    }
}

impl Lenient for f64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok().filter(|f: &f64| f.is_finite()),
            _ => None,
        }
    }
}

impl Lenient for bool {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_i64().map(|i| i != 0),
            _ => None,
        }
    }
}

impl Lenient for Value {
    fn from_value(value: Value) -> Option<Self> {
        (!value.is_null()).then_some(value)
    }
}

impl<T: Lenient> Lenient for Vec<T> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(items) => Some(items.into_iter().filter_map(T::from_value).collect()),
            single => T::from_value(single).map(|item| vec![item]),
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Lenient,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|raw| {
        let kept = T::from_value(raw.clone());
        if kept.is_none() && !raw.is_null() {
            log::debug!(
                "dropping value {} not convertible to {}",
                raw,
                std::any::type_name::<T>()
            );
        }
        kept
    }))
}

macro_rules! record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident: $ty:ty,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*

            /// Fields not named above, keyed in snake_case
            #[serde(flatten)]
            pub extra: Payload,
        }

        impl Record for $name {}
    };
}

// ---------------------------------------------------------------------------
// Twitter
// ---------------------------------------------------------------------------

record! {
    /// A post on Twitter/X
    pub struct TwitterPost {
        id: String,
        text: String,
        author_id: String,
        author_username: String,
        conversation_id: String,
        lang: String,
        source: String,
        status: String,
        deleted: bool,
        suspended: bool,
        possibly_sensitive: bool,
        is_retweet: bool,

        like_count: i64,
        retweet_count: i64,
        reply_count: i64,
        quote_count: i64,
        impression_count: i64,
        bookmark_count: i64,

        quoted_tweet_id: String,
        retweeted_tweet_id: String,
        reply_to_tweet_id: String,
        reply_to_user_id: String,
        reply_to_username: String,
        original_tweet_id: String,
        edited_tweets: Vec<String>,
        reply_settings: String,

        hashtags: Vec<String>,
        mentions: Vec<String>,
        media_urls: Vec<String>,
        grok_generated_content: Vec<Value>,
        urls: Vec<String>,

        country: String,
        region: String,
        city: String,

        has_birdwatch_notes: bool,
        birdwatch_notes_id: String,
        birdwatch_notes_text: String,
        birdwatch_notes_url: String,

        created_at: String,
        created_at_date: String,
        x_fetched_at: String,
    }
}

/// Twitter posts are tweets
pub type Tweet = TwitterPost;

record! {
    /// A Twitter/X account
    pub struct TwitterUser {
        id: String,
        /// Purely numeric handles arrive as numbers and are kept as text
        username: String,
        name: String,
        description: String,
        location: String,
        verified: bool,
        verified_type: String,
        protected: bool,
        status: String,

        followers_count: i64,
        following_count: i64,
        tweet_count: i64,
        listed_count: i64,
        likes_count: i64,
        media_count: i64,

        profile_image_url: String,
        profile_banner_url: String,
        profile_interstitial_type: String,

        pinned_tweet_id: String,
        source: String,
        is_verified: bool,
        account_based_in: String,
        location_accurate: bool,
        label: String,
        label_type: String,

        collected_following_count: i64,
        collected_followers_count: i64,
        collected_followers_coverage: f64,
        collected_following_coverage: f64,
        avg_tweets_per_day_last_month: f64,

        n_lang: i64,
        n_langs_filtered: i64,
        inauthentic_type: String,
        is_inauthentic: bool,
        is_inauthentic_prob_score: f64,
        is_inauthentic_calculated_at: String,

        verified_since_datetime: String,
        username_changes: Vec<String>,
        last_username_change_datetime: String,

        created_at: String,
        created_at_date: String,
        x_fetched_at: String,
        modified_at: String,
        x_modified_at: String,

        agg_relevance: f64,
        relevant_tweets_count: i64,
        relevant_tweets_impressions_sum: i64,
        relevant_tweets_likes_sum: i64,
        relevant_tweets_quotes_sum: i64,
        relevant_tweets_replies_sum: i64,
        relevant_tweets_retweets_sum: i64,
    }
}

// ---------------------------------------------------------------------------
// Instagram
// ---------------------------------------------------------------------------

record! {
    pub struct InstagramPost {
        id: String,
        post_type: String,
        user_id: String,
        username: String,
        full_name: String,
        caption: String,
        media_type: String,

        code_url: String,
        image_url: String,
        video_url: String,
        audio_only_url: String,
        profile_pic_url: String,
        video_subtitles_uri: String,

        subtitles: String,
        video_duration: f64,

        like_count: i64,
        comment_count: i64,
        reshare_count: i64,
        video_play_count: i64,

        location: String,

        created_at: String,
        created_at_timestamp: i64,
        created_at_date: String,
        last_fetch: String,
        last_fetch_datetime: String,
        x_last_updated: String,
    }
}

record! {
    pub struct InstagramUser {
        id: String,
        username: String,
        full_name: String,
        biography: String,
        is_private: bool,
        is_verified: bool,

        follower_count: i64,
        following_count: i64,
        media_count: i64,

        profile_pic_url: String,
        profile_pic_id: String,
        profile_url: String,
        external_url: String,
        has_anonymous_profile_picture: bool,

        last_fetch: String,
        last_fetch_datetime: String,
        x_last_updated: String,

        agg_relevance: f64,
        relevant_posts_count: i64,
        relevant_posts_likes_sum: i64,
        relevant_posts_comments_sum: i64,
        relevant_posts_reshares_sum: i64,
        relevant_posts_video_plays_sum: i64,
    }
}

record! {
    pub struct InstagramComment {
        id: String,
        text: String,
        parent_post_id: String,
        parent_post_user_id: String,
        /// Comment or reply
        #[serde(rename = "type")]
        kind: String,
        parent_comment_id: String,
        replied_to_comment_id: String,
        child_comment_count: i64,

        user_id: String,
        username: String,
        full_name: String,

        like_count: i64,
        status: String,
        is_spam: bool,
        has_translation: bool,

        created_at: String,
        created_at_timestamp: i64,
        created_at_date: String,
        last_fetch: String,
        last_fetch_datetime: String,
        x_last_updated: String,
    }
}

// ---------------------------------------------------------------------------
// Reddit
// ---------------------------------------------------------------------------

record! {
    pub struct RedditPost {
        id: String,
        title: String,
        selftext: String,
        url: String,
        permalink: String,
        post_url: String,
        thumbnail: String,

        author_id: String,
        author_username: String,

        subreddit_name: String,
        subreddit_id: String,

        score: i64,
        upvotes: i64,
        downvotes: i64,
        upvote_ratio: f64,
        comments_count: i64,
        crossposts_count: i64,

        is_self: bool,
        is_video: bool,
        is_original_content: bool,
        over18: bool,
        spoiler: bool,
        locked: bool,
        stickied: bool,
        archived: bool,

        link_flair_text: String,
        post_hint: String,
        domain: String,
        crosspost_parent: String,

        created_at: String,
        created_at_timestamp: i64,
        created_at_date: String,
        last_fetch: String,
        last_fetch_datetime: String,
        x_last_updated: String,
    }
}

record! {
    pub struct RedditUser {
        id: String,
        username: String,
        profile_url: String,
        profile_pic_url: String,
        snoovatar_img: String,

        link_karma: i64,
        comment_karma: i64,
        total_karma: i64,
        awardee_karma: i64,
        awarder_karma: i64,

        is_gold: bool,
        is_mod: bool,
        is_employee: bool,
        has_verified_email: bool,
        is_suspended: bool,
        verified: bool,
        is_blocked: bool,
        accept_followers: bool,
        has_subscribed: bool,
        hide_from_robots: bool,
        pref_show_snoovatar: bool,

        profile_description: String,
        profile_banner_url: String,
        profile_title: String,

        created_at: String,
        created_at_timestamp: i64,
        created_at_date: String,
        last_fetch: String,
        last_fetch_datetime: String,
        x_last_updated: String,

        agg_relevance: f64,
        relevant_posts_count: i64,
        relevant_posts_upvotes_sum: i64,
        relevant_posts_comments_count_sum: i64,
    }
}

record! {
    pub struct RedditComment {
        id: String,
        body: String,
        parent_post_id: String,
        parent_id: String,

        author_id: String,
        author_username: String,

        post_subreddit_name: String,
        post_subreddit_id: String,

        score: i64,
        upvotes: i64,
        downvotes: i64,
        controversiality: i64,

        depth: i64,
        is_submitter: bool,
        stickied: bool,
        collapsed: bool,
        edited: bool,
        distinguished: String,

        created_at: String,
        created_at_timestamp: i64,
        created_at_date: String,
        last_fetch: String,
        last_fetch_datetime: String,
        x_last_updated: String,
    }
}

record! {
    pub struct RedditSubreddit {
        id: String,
        display_name: String,
        title: String,
        public_description: String,
        description: String,

        subscribers_count: i64,
        active_user_count: i64,

        subreddit_type: String,
        over18: bool,
        lang: String,
        url: String,
        subreddit_url: String,

        icon_img: String,
        banner_img: String,
        header_img: String,
        community_icon: String,

        created_at: String,
        created_at_timestamp: i64,
        created_at_date: String,
        last_fetch: String,
        last_fetch_datetime: String,
        x_last_updated: String,

        agg_relevance: f64,
        relevant_posts_count: i64,
        relevant_posts_upvotes_sum: i64,
        relevant_posts_comments_count_sum: i64,
    }
}

/// A Reddit post together with its first page of comments
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RedditPostWithComments {
    pub post: RedditPost,
    pub comments: Vec<RedditComment>,
    /// Present when the comment list is itself paged
    pub comments_pagination: Option<PaginationInfo>,
    pub comments_table_name: Option<String>,
}

/// A subreddit together with its first page of posts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubredditWithPosts {
    pub subreddit: RedditSubreddit,
    pub posts: Vec<RedditPost>,
    pub posts_pagination: Option<PaginationInfo>,
    pub posts_table_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record<T: Record>(value: Value) -> T {
        T::from_payload(value.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_twitter_post_from_camel_case() {
        let post: TwitterPost = record(json!({
            "id": "1790000000000000001",
            "text": "hello",
            "authorUsername": "rustlang",
            "likeCount": 12,
            "isRetweet": false,
            "hashtags": ["rust", "async"]
        }));

        assert_eq!(post.id.as_deref(), Some("1790000000000000001"));
        assert_eq!(post.author_username.as_deref(), Some("rustlang"));
        assert_eq!(post.like_count, Some(12));
        assert_eq!(post.is_retweet, Some(false));
        assert_eq!(post.hashtags, Some(vec!["rust".to_string(), "async".to_string()]));
        assert_eq!(post.retweet_count, None);
        assert!(post.extra.is_empty());
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let user: TwitterUser = record(json!({
            "id": "42",
            "someNewMetric": 0.5,
            "nested": {"keepMe": true}
        }));

        assert_eq!(user.extra["some_new_metric"], 0.5);
        assert_eq!(user.extra["nested"], json!({"keepMe": true}));
    }

    #[test]
    fn test_numeric_username_becomes_text() {
        let user: TwitterUser = record(json!({"id": 7, "username": 1234567}));
        assert_eq!(user.id.as_deref(), Some("7"));
        assert_eq!(user.username.as_deref(), Some("1234567"));
    }

    #[test]
    fn test_lenient_scalars() {
        let post: RedditPost = record(json!({
            "score": "17",
            "upvoteRatio": "0.93",
            "over18": "false",
            "createdAtTimestamp": 1700000000.0,
            "commentsCount": null
        }));

        assert_eq!(post.score, Some(17));
        assert_eq!(post.upvote_ratio, Some(0.93));
        assert_eq!(post.over18, Some(false));
        assert_eq!(post.created_at_timestamp, Some(1_700_000_000));
        assert_eq!(post.comments_count, None);
    }

    #[test]
    fn test_unconvertible_value_is_dropped_not_fatal() {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init();

        let post: TwitterPost = record(json!({"id": "9", "likeCount": "1.2K", "retweetCount": 4}));

        assert_eq!(post.like_count, None);
        assert_eq!(post.retweet_count, Some(4));
        assert_eq!(post.id.as_deref(), Some("9"));
    }

    #[test]
    fn test_bare_string_for_list_field() {
        let post: TwitterPost = record(json!({"mentions": "ferris"}));
        assert_eq!(post.mentions, Some(vec!["ferris".to_string()]));
    }

    #[test]
    fn test_instagram_comment_type_field() {
        let comment: InstagramComment = record(json!({"id": "c1", "type": "reply", "childCommentCount": 3}));
        assert_eq!(comment.kind.as_deref(), Some("reply"));
        assert_eq!(comment.child_comment_count, Some(3));
        assert!(comment.extra.is_empty());
    }

    #[test]
    fn test_parse_records_skips_non_mappings() {
        let results = json!([{"id": "1"}, "stray", {"id": "2"}]);
        let posts: Vec<InstagramPost> = parse_records(Some(&results)).unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[1].id.as_deref(), Some("2"));
        assert!(parse_records::<InstagramPost>(None).unwrap().is_empty());
        assert!(parse_records::<InstagramPost>(Some(&json!("x"))).unwrap().is_empty());
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let sub: RedditSubreddit = record(json!({"displayName": "rust", "subscribersCount": 300000}));
        let out = serde_json::to_value(&sub).unwrap();
        assert_eq!(out, json!({"display_name": "rust", "subscribers_count": 300000}));
    }
}
