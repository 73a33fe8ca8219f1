//! Integration tests for the fetch pipeline using wiremock.
//!
//! The listing, noembed and image hosts are all served by one mock server.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use earthporn::{Config, FetchError, Fetcher, NoembedApi, RedditApi, Resolution};
use reqwest::Client;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0fake-jpeg-body\xFF\xD9";

fn thread(id: &str, title: &str, image_url: &str, width: u32, height: u32) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "id": id,
            "title": title,
            "domain": "i.redd.it",
            "url": image_url,
            "stickied": false,
            "preview": {"images": [{"source": {
                "url": image_url,
                "width": width,
                "height": height
            }}]}
        }
    })
}

fn listing(children: Vec<Value>) -> Value {
    json!({"kind": "Listing", "data": {"children": children}})
}

fn fetcher(server: &MockServer, config: Config) -> Fetcher {
    let client = Client::new();
    Fetcher::with_apis(
        config,
        RedditApi::with_base_url(client.clone(), &server.uri()),
        NoembedApi::with_base_url(client, &server.uri()),
    )
    .unwrap()
}

fn config_for(dest: &Path, count: u32, keepcount: i64) -> Config {
    Config {
        count,
        dest: dest.to_string_lossy().into_owned(),
        keepcount,
        resolution: Resolution::new(1920, 1080),
        ..Default::default()
    }
}

async fn mount_listing(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/r/earthporn/hot.json"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_image(server: &MockServer, image_path: &str) {
    Mock::given(method("GET"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
        .mount(server)
        .await;
}

fn managed_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("DOWN-") && n.ends_with(".jpg"))
        .collect();
    names.sort();
    names
}

/// Stickied, image-less and too-small threads are skipped; selection stops at count.
#[tokio::test]
async fn test_select_skips_unusable_threads() {
    let server = MockServer::start().await;
    let base = server.uri();

    let mut sticky = thread("s1", "Monthly thread", &format!("{}/img/s1.jpg", base), 4000, 3000);
    sticky["data"]["stickied"] = json!(true);
    let no_preview = json!({"data": {"id": "n1", "title": "Text post", "domain": "self.EarthPorn"}});

    mount_listing(
        &server,
        listing(vec![
            sticky,
            no_preview,
            thread("t1", "Too small", &format!("{}/img/t1.jpg", base), 800, 600),
            thread("a1", "Glacier", &format!("{}/img/a1.jpg", base), 4000, 2250),
            thread("b2", "Desert", &format!("{}/img/b2.jpg", base), 1700, 1000),
            thread("c3", "Forest", &format!("{}/img/c3.jpg", base), 5000, 3000),
        ]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher(&server, config_for(dir.path(), 2, -1));

    let candidates = fetcher.fetch_candidates().await.unwrap();

    let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "b2"]);
    assert_eq!(candidates[0].url, format!("{}/img/a1.jpg", base));
    assert_eq!(candidates[0].resolution, Resolution::new(4000, 2250));
}

/// Flickr photo pages are resolved through noembed.
#[tokio::test]
async fn test_flickr_thread_resolved_through_noembed() {
    let server = MockServer::start().await;
    let base = server.uri();
    let page = "https://www.flickr.com/photos/someone/52345678901/";

    mount_listing(
        &server,
        listing(vec![json!({"data": {
            "id": "fl1",
            "title": "Flickr lake",
            "domain": "flickr.com",
            "url": page,
            "stickied": false
        }})]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/embed"))
        .and(query_param("url", page))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "media_url": format!("{}/img/flickr.jpg", base),
            "width": "3000",
            "height": "2000"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher(&server, config_for(dir.path(), 5, -1));

    let candidates = fetcher.fetch_candidates().await.unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].url, format!("{}/img/flickr.jpg", base));
    assert_eq!(candidates[0].resolution, Resolution::new(3000, 2000));
}

/// A full run downloads new images and leaves existing ones alone.
#[tokio::test]
async fn test_run_downloads_and_skips_existing() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_listing(
        &server,
        listing(vec![
            thread("a1", "Glacier Bay", &format!("{}/img/a1.jpg", base), 4000, 2250),
            thread("b2", "Desert", &format!("{}/img/b2.jpg", base), 4000, 2250),
        ]),
    )
    .await;
    mount_image(&server, "/img/a1.jpg").await;

    // Already on disk, must not be requested again.
    Mock::given(method("GET"))
        .and(path("/img/b2.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let existing = dir.path().join("DOWN-b2_Desert.jpg");
    fs::write(&existing, b"old").unwrap();

    let fetcher = fetcher(&server, config_for(dir.path(), 10, -1));
    let summary = fetcher.run().await.unwrap();

    assert_eq!(summary.saved.total(), 2);
    assert_eq!(summary.saved.downloaded(), 1);
    assert!(summary.saved.all_successful());
    assert!(summary.pruned.is_none());

    assert_eq!(
        fs::read(dir.path().join("DOWN-a1_Glacier_Bay.jpg")).unwrap(),
        JPEG
    );
    assert_eq!(fs::read(&existing).unwrap(), b"old");
    assert_eq!(
        managed_files(dir.path()),
        vec!["DOWN-a1_Glacier_Bay.jpg", "DOWN-b2_Desert.jpg"]
    );
}

/// The destination directory is created when missing.
#[tokio::test]
async fn test_run_creates_destination() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_listing(
        &server,
        listing(vec![thread("a1", "Glacier", &format!("{}/img/a1.jpg", base), 4000, 2250)]),
    )
    .await;
    mount_image(&server, "/img/a1.jpg").await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("nested").join("walls");
    let fetcher = fetcher(&server, config_for(&dest, 1, -1));

    fetcher.run().await.unwrap();

    assert_eq!(managed_files(&dest), vec!["DOWN-a1_Glacier.jpg"]);
}

/// One broken image does not stop the others.
#[tokio::test]
async fn test_failed_image_is_recorded() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_listing(
        &server,
        listing(vec![
            thread("a1", "Gone", &format!("{}/img/missing.jpg", base), 4000, 2250),
            thread("b2", "Desert", &format!("{}/img/b2.jpg", base), 4000, 2250),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/img/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_image(&server, "/img/b2.jpg").await;

    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher(&server, config_for(dir.path(), 10, -1));
    let summary = fetcher.run().await.unwrap();

    assert_eq!(summary.saved.downloaded(), 1);
    assert_eq!(summary.saved.failed.len(), 1);
    assert_eq!(summary.saved.failed[0].0, "Gone");
    assert_eq!(managed_files(dir.path()), vec!["DOWN-b2_Desert.jpg"]);
}

/// A listing error aborts the run.
#[tokio::test]
async fn test_listing_error_aborts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/earthporn/hot.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher(&server, config_for(dir.path(), 10, -1));

    let result = fetcher.run().await;
    assert!(matches!(result, Err(FetchError::Http { .. })), "{:?}", result);
}

/// Malformed listing JSON is reported as a parse error.
#[tokio::test]
async fn test_malformed_listing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/earthporn/hot.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher(&server, config_for(dir.path(), 10, -1));

    assert!(matches!(
        fetcher.fetch_candidates().await,
        Err(FetchError::ParseError(_))
    ));
}

/// After a run only the newest `keepcount` images remain.
#[tokio::test]
async fn test_run_prunes_old_images() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_listing(
        &server,
        listing(vec![
            thread("a1", "Glacier", &format!("{}/img/a1.jpg", base), 4000, 2250),
            thread("b2", "Desert", &format!("{}/img/b2.jpg", base), 4000, 2250),
        ]),
    )
    .await;
    mount_image(&server, "/img/a1.jpg").await;
    mount_image(&server, "/img/b2.jpg").await;

    let dir = tempfile::tempdir().unwrap();
    for (i, name) in ["DOWN-old1.jpg", "DOWN-old2.jpg", "DOWN-old3.jpg", "DOWN-old4.jpg"]
        .iter()
        .enumerate()
    {
        let path = dir.path().join(name);
        fs::write(&path, b"old").unwrap();
        let file = fs::File::options().append(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(3600 * (i as u64 + 1)))
            .unwrap();
    }
    fs::write(dir.path().join("my-photo.jpg"), b"mine").unwrap();

    let fetcher = fetcher(&server, config_for(dir.path(), 2, 3));
    let summary = fetcher.run().await.unwrap();

    let pruned = summary.pruned.expect("pruning should run");
    assert_eq!(pruned.deleted.len(), 3);
    assert!(pruned.failed.is_empty());
    assert_eq!(
        managed_files(dir.path()),
        vec!["DOWN-a1_Glacier.jpg", "DOWN-b2_Desert.jpg", "DOWN-old1.jpg"]
    );
    assert!(dir.path().join("my-photo.jpg").exists());
}

/// A JSON error body served with 200 is not mistaken for an empty listing.
#[tokio::test]
async fn test_error_body_fails_the_run() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/earthporn/hot.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Forbidden", "error": 403})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher(&server, config_for(dir.path(), 10, -1));

    let result = fetcher.run().await;
    assert!(matches!(result, Err(FetchError::ParseError(_))), "{:?}", result);
}

/// A stalled image download gives up after the configured timeout.
#[tokio::test]
async fn test_stalled_image_times_out() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_listing(
        &server,
        listing(vec![
            thread("a1", "Stalled", &format!("{}/img/slow.jpg", base), 4000, 2250),
            thread("b2", "Desert", &format!("{}/img/b2.jpg", base), 4000, 2250),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/img/slow.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(JPEG)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    mount_image(&server, "/img/b2.jpg").await;

    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        timeout_secs: 1,
        ..config_for(dir.path(), 10, -1)
    };
    let summary = fetcher(&server, config).run().await.unwrap();

    assert_eq!(summary.saved.failed.len(), 1);
    assert_eq!(summary.saved.failed[0].0, "Stalled");
    assert_eq!(managed_files(dir.path()), vec!["DOWN-b2_Desert.jpg"]);
}
