//! Blocking client example
//!
//! Runs an Instagram keyword search without an async runtime of its own,
//! drains every page and resolves the CSV export of the full result set.

use xpoz::blocking::XpozClient;
use xpoz::{ClientOptions, Error, QueryOptions};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // connects in the constructor, closes on drop
    let client = XpozClient::new(ClientOptions::from_env()?)?;
    let instagram = client.instagram();

    let result = instagram.search_posts(
        "latte art",
        &QueryOptions::new()
            .fields(["id", "username", "caption", "like_count"])
            .start_date("2025-06-01"),
    )?;
    println!("{}", result);

    let posts = result.drain_all()?;
    println!("Fetched {} posts", posts.len());

    let top = posts.iter().max_by_key(|post| post.like_count.unwrap_or(0));
    if let Some(post) = top {
        println!(
            "Most liked: @{} with {} likes",
            post.username.as_deref().unwrap_or("?"),
            post.like_count.unwrap_or(0)
        );
    }

    match result.export_csv() {
        Ok(url) => println!("CSV export: {}", url),
        Err(Error::ExportUnavailable) => println!("No CSV export for this query"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
