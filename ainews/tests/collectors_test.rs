use ainews::collectors::feeds::FeedSource;
use ainews::collectors::reddit::RedditCredentials;
use ainews::collectors::{Collector, FeedCollector, HackerNewsCollector, RedditCollector};
use ainews::retry::RetryPolicy;
use mockito::{Matcher, Server, ServerGuard};
use std::time::Duration;

fn quick_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_millis(5))
}

async fn mock_json(server: &mut ServerGuard, path: &str, body: &str) -> mockito::Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

// ---------------------------------------------------------------- Hacker News

#[tokio::test]
async fn hacker_news_filters_and_stops_at_limit() {
    let mut server = Server::new_async().await;

    mock_json(&mut server, "/topstories.json", "[1, 2, 3, 4, 5, 6]").await;
    mock_json(
        &mut server,
        "/item/1.json",
        r#"{"id": 1, "title": "OpenAI announces new reasoning model", "url": "https://example.com/1", "score": 300, "descendants": 120}"#,
    )
    .await;
    mock_json(
        &mut server,
        "/item/2.json",
        r#"{"id": 2, "title": "Show HN: My woodworking shop", "url": "https://example.com/2", "score": 50}"#,
    )
    .await;
    // Ask HN posts have no url
    mock_json(&mut server, "/item/3.json", r#"{"id": 3, "title": "Ask HN: Which LLM do you use?"}"#).await;
    mock_json(&mut server, "/item/4.json", "null").await;
    mock_json(
        &mut server,
        "/item/5.json",
        r#"{"id": 5, "title": "Running Llama on a phone", "url": "https://example.com/5", "score": 80, "descendants": 10}"#,
    )
    .await;
    mock_json(
        &mut server,
        "/item/6.json",
        r#"{"id": 6, "title": "Mistral raises again", "url": "https://example.com/6"}"#,
    )
    .await;

    let collector = HackerNewsCollector::new(server.url()).unwrap().with_pool(200, 3);
    let items = collector.collect(2).await.expect("collect");

    let ids: Vec<_> = items.iter().map(|i| i.original_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "5"]);

    let first = &items[0];
    assert_eq!(first.source, "HackerNews");
    assert_eq!(first.url, "https://example.com/1");
    assert_eq!(first.score, 300);
    assert_eq!(first.comments_count, 120);
    assert!(first.content_snippet.is_empty());
}

#[tokio::test]
async fn hacker_news_respects_pool_size() {
    let mut server = Server::new_async().await;

    mock_json(&mut server, "/topstories.json", "[1, 2]").await;
    mock_json(
        &mut server,
        "/item/1.json",
        r#"{"id": 1, "title": "Weather report", "url": "https://example.com/1"}"#,
    )
    .await;
    let second = server
        .mock("GET", "/item/2.json")
        .with_status(200)
        .with_body(r#"{"id": 2, "title": "GPT tricks", "url": "https://example.com/2"}"#)
        .expect(0)
        .create_async()
        .await;

    let collector = HackerNewsCollector::new(server.url()).unwrap().with_pool(1, 10);
    let items = collector.collect(10).await.expect("collect");

    assert!(items.is_empty());
    second.assert_async().await;
}

#[tokio::test]
async fn hacker_news_cutoff_follows_ranking_not_response_time() {
    let mut server = Server::new_async().await;

    mock_json(&mut server, "/topstories.json", "[1, 2, 3]").await;
    server
        .mock("GET", "/item/1.json")
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_millis(300));
            w.write_all(br#"{"id": 1, "title": "Slow GPT launch story", "url": "https://example.com/1"}"#)
        })
        .create_async()
        .await;
    mock_json(
        &mut server,
        "/item/2.json",
        r#"{"id": 2, "title": "LLM agents in production", "url": "https://example.com/2"}"#,
    )
    .await;
    mock_json(
        &mut server,
        "/item/3.json",
        r#"{"id": 3, "title": "Claude tool use tips", "url": "https://example.com/3"}"#,
    )
    .await;

    let collector = HackerNewsCollector::new(server.url()).unwrap().with_pool(200, 3);
    let items = collector.collect(2).await.expect("collect");

    let ids: Vec<_> = items.iter().map(|i| i.original_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn hacker_news_listing_failure_gives_empty_result() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/topstories.json")
        .with_status(503)
        .create_async()
        .await;

    let collector = HackerNewsCollector::new(server.url()).unwrap();
    let items = collector.collect(30).await.expect("listing failure is not an error");
    assert!(items.is_empty());
}

// --------------------------------------------------------------------- Reddit

fn listing(posts: &[(&str, &str, &str, &str, bool)]) -> String {
    let children: Vec<_> = posts
        .iter()
        .map(|(id, title, url, selftext, stickied)| {
            serde_json::json!({
                "kind": "t3",
                "data": {
                    "id": id,
                    "title": title,
                    "url": url,
                    "selftext": selftext,
                    "stickied": stickied,
                    "score": 42,
                    "num_comments": 7
                }
            })
        })
        .collect();
    serde_json::json!({ "kind": "Listing", "data": { "children": children } }).to_string()
}

#[tokio::test]
async fn reddit_skips_noise_survives_failures_and_dedups_last_wins() {
    let mut server = Server::new_async().await;

    let ml = listing(&[
        ("a1", "GPT-5 benchmark results", "https://example.com/x", "first take", false),
        ("a2", "New Llama fine-tune released", "https://example.com/y", "", false),
        ("a3", "Weekly LLM discussion thread", "https://reddit.com/sticky", "", true),
        ("a4", "Help: my GPU runs out of memory with LLM", "https://reddit.com/help", "", false),
    ]);
    mock_json(&mut server, "/r/MachineLearning/top.json", &ml).await;

    server
        .mock("GET", "/r/LocalLLaMA/top.json")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let sing = listing(&[(
        "b1",
        "GPT-5 benchmark discussion",
        "https://example.com/x",
        "second take with more detail",
        false,
    )]);
    mock_json(&mut server, "/r/singularity/top.json", &sing).await;

    let collector = RedditCollector::new(server.url())
        .unwrap()
        .with_communities(["MachineLearning", "LocalLLaMA", "singularity"]);
    let items = collector.collect(20).await.expect("collect");

    let urls: Vec<_> = items.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(urls, vec!["https://example.com/y", "https://example.com/x"]);

    let survivor = &items[1];
    assert_eq!(survivor.source, "Reddit/singularity");
    assert_eq!(survivor.original_id, "b1");
    assert_eq!(survivor.content_snippet, "second take with more detail");
    assert_eq!(survivor.score, 42);
    assert_eq!(survivor.comments_count, 7);
}

#[tokio::test]
async fn reddit_truncates_to_limit() {
    let mut server = Server::new_async().await;
    let posts = listing(&[
        ("1", "LLM one", "https://example.com/1", "", false),
        ("2", "LLM two", "https://example.com/2", "", false),
        ("3", "LLM three", "https://example.com/3", "", false),
    ]);
    mock_json(&mut server, "/r/LocalLLaMA/top.json", &posts).await;

    let collector = RedditCollector::new(server.url())
        .unwrap()
        .with_communities(["LocalLLaMA"]);
    let items = collector.collect(2).await.expect("collect");
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn reddit_uses_oauth_token_when_configured() {
    let mut server = Server::new_async().await;

    let token = server
        .mock("POST", "/api/v1/access_token")
        .match_body(Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token": "tok123", "token_type": "bearer", "expires_in": 86400}"#)
        .create_async()
        .await;

    let listing_mock = server
        .mock("GET", "/oauth/r/LocalLLaMA/top.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("t".into(), "day".into()),
            Matcher::UrlEncoded("limit".into(), "5".into()),
        ]))
        .match_header("authorization", "Bearer tok123")
        .with_status(200)
        .with_body(listing(&[("1", "Qwen release notes", "https://example.com/q", "", false)]))
        .create_async()
        .await;

    let collector = RedditCollector::new(server.url())
        .unwrap()
        .with_communities(["LocalLLaMA"])
        .with_credentials(
            RedditCredentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
            format!("{}/api/v1/access_token", server.url()),
            format!("{}/oauth", server.url()),
        );

    let items = collector.collect(10).await.expect("collect");
    assert_eq!(items.len(), 1);

    token.assert_async().await;
    listing_mock.assert_async().await;
}

// ---------------------------------------------------------------------- Feeds

const VALID_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Good outlet</title>
    <link>https://good.example</link>
    <description>AI news</description>
    <item>
      <title>Claude gets a new tool use mode</title>
      <link>https://good.example/1</link>
      <description>Anthropic shipped an update.</description>
    </item>
    <item>
      <title>Diffusion models get faster</title>
      <link>https://good.example/2</link>
      <description>A new sampler.</description>
    </item>
    <item>
      <title>OpenAI DevDay recap</title>
      <link>https://good.example/3</link>
    </item>
    <item>
      <title>Yet another LLM paper</title>
      <link>https://good.example/4</link>
    </item>
  </channel>
</rss>"#;

#[tokio::test]
async fn feeds_survive_two_broken_sources() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/broken-a.xml")
        .with_status(200)
        .with_body("this is not a feed at all")
        .create_async()
        .await;
    server
        .mock("GET", "/broken-b.xml")
        .with_status(200)
        .with_body("{ \"neither\": \"is this\" ")
        .create_async()
        .await;
    server
        .mock("GET", "/good.xml")
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(VALID_RSS)
        .create_async()
        .await;

    let collector = FeedCollector::new(vec![
        FeedSource::new("Broken A", format!("{}/broken-a.xml", server.url())),
        FeedSource::new("Good", format!("{}/good.xml", server.url())),
        FeedSource::new("Broken B", format!("{}/broken-b.xml", server.url())),
    ])
    .unwrap()
    .with_retry(quick_retry(1));

    let items = collector.collect(20).await.expect("partial failure is not an error");

    // per-feed cap of 3 entries
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| i.source == "RSS/Good"));
    assert!(items.iter().all(|i| i.score == 0 && i.comments_count == 0));
    assert_eq!(items[0].content_snippet, "Anthropic shipped an update.");
    assert_eq!(items[0].original_id, "https://good.example/1");
    assert_eq!(items[2].content_snippet, "");
}

#[tokio::test]
async fn feed_fetch_retries_server_errors_only() {
    let mut server = Server::new_async().await;

    let missing = server
        .mock("GET", "/missing.xml")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;
    let flaky = server
        .mock("GET", "/flaky.xml")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let collector = FeedCollector::new(vec![
        FeedSource::new("Missing", format!("{}/missing.xml", server.url())),
        FeedSource::new("Flaky", format!("{}/flaky.xml", server.url())),
    ])
    .unwrap()
    .with_retry(quick_retry(3));

    let items = collector.collect(20).await.expect("collect");
    assert!(items.is_empty());

    missing.assert_async().await;
    flaky.assert_async().await;
}
