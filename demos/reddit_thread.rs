//! Reddit example
//!
//! Fetches a post with its comments, then a subreddit with its posts.
//! Usage: cargo run --example reddit_thread -- <post_id> [subreddit]

use xpoz::{ClientOptions, QueryOptions, XpozClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let post_id = args.next().unwrap_or_else(|| "1hrvp2k".to_string());
    let subreddit = args.next().unwrap_or_else(|| "rust".to_string());

    let client = XpozClient::new(ClientOptions::from_env()?)?;
    client.connect().await?;
    let reddit = client.reddit();

    let thread = reddit
        .get_post_with_comments(
            &post_id,
            &QueryOptions::new()
                .post_fields(["id", "title", "score", "author_username"])
                .comment_fields(["id", "body", "score", "author_username"]),
        )
        .await?;

    println!(
        "{} ({} points)",
        thread.post.title.as_deref().unwrap_or("<untitled>"),
        thread.post.score.unwrap_or(0)
    );
    for comment in &thread.comments {
        println!(
            "  [{}] {}: {}",
            comment.score.unwrap_or(0),
            comment.author_username.as_deref().unwrap_or("[deleted]"),
            comment.body.as_deref().unwrap_or("")
        );
    }
    if let Some(pagination) = &thread.comments_pagination {
        println!("  ... {} comments in total", pagination.total_rows);
    }

    let sub = reddit
        .get_subreddit_with_posts(
            &subreddit,
            &QueryOptions::new().post_fields(["id", "title", "score"]),
        )
        .await?;
    println!(
        "\nr/{}: {} posts fetched",
        sub.subreddit.display_name.as_deref().unwrap_or(&subreddit),
        sub.posts.len()
    );
    for post in &sub.posts {
        println!("  {}", post.title.as_deref().unwrap_or(""));
    }

    client.close().await?;
    Ok(())
}
