//! Twitter search example
//!
//! Searches posts, walks a couple of pages and counts matching posts.
//! Reads the API key from XPOZ_API_KEY.

use xpoz::{ClientOptions, IdentifierType, QueryOptions, XpozClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let options = ClientOptions::builder()
        .timeout(std::time::Duration::from_secs(600))
        .build()?;
    let client = XpozClient::new(options)?;
    client.connect().await?;

    let twitter = client.twitter();

    let query = QueryOptions::new()
        .fields(["id", "text", "author_username", "like_count", "created_at"])
        .start_date("2025-01-01")
        .language("en");

    println!("Searching posts...\n");
    let mut page = twitter.search_posts("\"rust 2024 edition\"", &query).await?;
    println!("{}", page);

    // first three pages at most
    for _ in 0..3 {
        for post in &page.data {
            println!(
                "@{} ({} likes): {}",
                post.author_username.as_deref().unwrap_or("?"),
                post.like_count.unwrap_or(0),
                post.text.as_deref().unwrap_or("").replace('\n', " ")
            );
        }
        if !page.has_next_page() {
            break;
        }
        page = page.next_page().await?;
    }

    let count = twitter
        .count_posts("rust", &QueryOptions::new().start_date("2025-01-01"))
        .await?;
    println!("\nPosts mentioning rust since 2025: {}", count);

    let user = twitter
        .get_user(
            "rustlang",
            IdentifierType::Username,
            &QueryOptions::new().fields(["id", "username", "followers_count"]),
        )
        .await?;
    println!(
        "@{} has {} followers",
        user.username.as_deref().unwrap_or("?"),
        user.followers_count.unwrap_or(0)
    );

    client.close().await?;
    Ok(())
}
