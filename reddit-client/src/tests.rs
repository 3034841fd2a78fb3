use crate::{parse_feed, FeedClient, FeedSource};
use httpmock::prelude::*;
use std::time::{Duration, Instant};
use subwatch_core::FetchError;

const REDDIT_ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/">
  <category term="rust" label="r/rust"/>
  <id>/r/rust/new/.rss</id>
  <link rel="self" href="https://www.reddit.com/r/rust/new/.rss" type="application/atom+xml" />
  <link rel="alternate" href="https://www.reddit.com/r/rust/new" type="text/html" />
  <title>newest submissions : rust</title>
  <entry>
    <author><name>/u/alice</name><uri>https://www.reddit.com/user/alice</uri></author>
    <category term="rust" label="r/rust"/>
    <content type="html">&lt;p&gt;The app crashes on startup &amp;amp; exits&lt;/p&gt;</content>
    <id>t3_abc123</id>
    <media:thumbnail url="https://b.thumbs.redditmedia.com/x.jpg" />
    <link href="https://www.reddit.com/r/rust/comments/abc123/app_crash_on_startup/" />
    <published>2024-05-01T09:58:00+00:00</published>
    <title>App crash on startup</title>
  </entry>
  <entry>
    <author><name>/u/bob</name></author>
    <content type="html"><![CDATA[<p>Just sharing a crate</p>]]></content>
    <id>t3_def456</id>
    <link href="https://www.reddit.com/r/rust/comments/def456/new_crate/" />
    <title>New crate release</title>
  </entry>
</feed>"#;

const RSS_CHANNEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>r/rust mirror</title>
    <link>https://mirror.example.com/r/rust</link>
    <description>mirror</description>
    <item>
      <title>Linker error on nightly</title>
      <link>https://mirror.example.com/r/rust/1</link>
      <description>cargo build fails with a linker error</description>
    </item>
    <item>
      <title>Guid only</title>
      <guid isPermaLink="false">mirror-2</guid>
    </item>
    <item>
      <title>Neither link nor guid</title>
    </item>
  </channel>
</rss>"#;

fn test_client(server: &MockServer) -> FeedClient {
    FeedClient::new(&server.base_url(), "subwatch-test/1.0", Duration::ZERO)
        .expect("client builds")
}

#[test]
fn test_parse_reddit_atom() {
    let posts = parse_feed("rust", REDDIT_ATOM).unwrap();
    assert_eq!(posts.len(), 2);

    let first = &posts[0];
    assert_eq!(
        first.id,
        "https://www.reddit.com/r/rust/comments/abc123/app_crash_on_startup/"
    );
    assert_eq!(first.link, first.id);
    assert_eq!(first.subreddit, "rust");
    assert_eq!(first.title, "App crash on startup");
    assert!(first.body.contains("crashes on startup"));

    assert_eq!(posts[1].title, "New crate release");
    assert_eq!(posts[1].body, "<p>Just sharing a crate</p>");
}

#[test]
fn test_atom_entry_without_link_uses_id() {
    let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom">
      <entry><id>t3_only_id</id><title>No link</title><summary>fallback body</summary></entry>
      <entry><title>Nothing to key on</title></entry>
    </feed>"#;

    let posts = parse_feed("rust", doc).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, "t3_only_id");
    assert_eq!(posts[0].link, "t3_only_id");
    assert_eq!(posts[0].body, "fallback body");
}

#[test]
fn test_atom_prefers_alternate_link() {
    let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom">
      <entry>
        <link rel="replies" href="https://example.com/replies" />
        <link rel="alternate" href="https://example.com/post" />
        <title>Linked</title>
      </entry>
    </feed>"#;

    let posts = parse_feed("rust", doc).unwrap();
    assert_eq!(posts[0].id, "https://example.com/post");
}

#[test]
fn test_empty_atom_feed() {
    let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>quiet</title></feed>"#;
    assert!(parse_feed("rust", doc).unwrap().is_empty());
}

#[test]
fn test_parse_rss_channel() {
    let posts = parse_feed("rust", RSS_CHANNEL).unwrap();
    assert_eq!(posts.len(), 2);

    assert_eq!(posts[0].id, "https://mirror.example.com/r/rust/1");
    assert_eq!(posts[0].title, "Linker error on nightly");
    assert_eq!(posts[0].body, "cargo build fails with a linker error");

    assert_eq!(posts[1].id, "mirror-2");
    assert!(posts[1].body.is_empty());
}

#[test]
fn test_invalid_documents() {
    for doc in ["not a feed at all", "<html><body/></html>", "<feed><entry></feed>"] {
        let err = parse_feed("rust", doc).unwrap_err();
        assert!(
            matches!(err, FetchError::InvalidFeed { ref subreddit, .. } if subreddit == "rust"),
            "unexpected result for {:?}: {:?}",
            doc,
            err
        );
    }
}

#[test]
fn test_feed_url() {
    let client =
        FeedClient::new("https://www.reddit.com/", "subwatch-test/1.0", Duration::ZERO).unwrap();
    assert_eq!(
        client.feed_url("rust"),
        "https://www.reddit.com/r/rust/new/.rss"
    );
}

#[tokio::test]
async fn test_fetch_success() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/r/rust/new/.rss")
                .header("user-agent", "subwatch-test/1.0");
            then.status(200)
                .header("content-type", "application/atom+xml; charset=UTF-8")
                .body(REDDIT_ATOM);
        })
        .await;

    let posts = test_client(&server).fetch("rust").await.unwrap();

    mock.assert_async().await;
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].title, "App crash on startup");
}

#[tokio::test]
async fn test_fetch_status_mapping() {
    let server = MockServer::start_async().await;
    let cases: [(&str, u16); 4] = [
        ("missing", 404),
        ("private", 403),
        ("flaky", 503),
        ("teapot", 418),
    ];
    for (sub, status) in cases {
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/r/{}/new/.rss", sub));
                then.status(status);
            })
            .await;
    }

    let client = test_client(&server);

    assert_eq!(
        client.fetch("missing").await.unwrap_err(),
        FetchError::SubredditNotFound {
            subreddit: "missing".to_string()
        }
    );
    assert_eq!(
        client.fetch("private").await.unwrap_err(),
        FetchError::Forbidden {
            subreddit: "private".to_string()
        }
    );
    assert_eq!(
        client.fetch("flaky").await.unwrap_err(),
        FetchError::ServerError {
            subreddit: "flaky".to_string(),
            status_code: 503
        }
    );
    assert_eq!(
        client.fetch("teapot").await.unwrap_err(),
        FetchError::UnexpectedStatus {
            subreddit: "teapot".to_string(),
            status_code: 418
        }
    );
}

#[tokio::test]
async fn test_fetch_rate_limited() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/r/busy/new/.rss");
            then.status(429).header("retry-after", "120");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/r/quiet/new/.rss");
            then.status(429);
        })
        .await;

    let client = test_client(&server);

    assert_eq!(
        client.fetch("busy").await.unwrap_err(),
        FetchError::RateLimitExceeded {
            subreddit: "busy".to_string(),
            retry_after: 120
        }
    );
    assert_eq!(
        client.fetch("quiet").await.unwrap_err(),
        FetchError::RateLimitExceeded {
            subreddit: "quiet".to_string(),
            retry_after: 60
        }
    );
}

#[tokio::test]
async fn test_fetch_invalid_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/r/rust/new/.rss");
            then.status(200).body("<html><body>blocked</body></html>");
        })
        .await;

    let err = test_client(&server).fetch("rust").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidFeed { .. }));
}

#[tokio::test]
async fn test_fetch_timeout() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/r/slow/new/.rss");
            then.status(200)
                .delay(Duration::from_secs(2))
                .body(REDDIT_ATOM);
        })
        .await;

    let client = test_client(&server).with_timeout(Duration::from_millis(100));
    assert_eq!(
        client.fetch("slow").await.unwrap_err(),
        FetchError::RequestTimeout {
            subreddit: "slow".to_string()
        }
    );
}

#[tokio::test]
async fn test_fetch_connection_refused() {
    let client = FeedClient::new("http://127.0.0.1:1", "subwatch-test/1.0", Duration::ZERO)
        .unwrap()
        .with_timeout(Duration::from_secs(2));

    let err = client.fetch("rust").await.unwrap_err();
    assert!(matches!(err, FetchError::Network { .. }));
}

#[tokio::test]
async fn test_fetches_are_spaced_by_fetch_delay() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200).body(REDDIT_ATOM);
        })
        .await;

    let client =
        FeedClient::new(&server.base_url(), "subwatch-test/1.0", Duration::from_millis(300))
            .unwrap();

    let started = Instant::now();
    client.fetch("one").await.unwrap();
    client.fetch("two").await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(300));
    mock.assert_hits_async(2).await;
}
