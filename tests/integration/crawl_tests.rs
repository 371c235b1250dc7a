//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small storefront and run full crawls
//! against it, including resuming from a checkpoint.

use shelf_crawler::checkpoint::{Checkpoint, CheckpointStore};
use shelf_crawler::config::{
    Config, CrawlerConfig, FetcherConfig, Locators, OutputConfig, OutputFormat,
};
use shelf_crawler::frontier::Frontier;
use shelf_crawler::state::PageState;
use shelf_crawler::Coordinator;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted at `seed_url` writing into `dir`
fn create_test_config(seed_url: &str, dir: &Path, format: OutputFormat) -> Config {
    let products = match format {
        OutputFormat::Csv => "products.csv",
        OutputFormat::Sqlite => "products.db",
    };

    Config {
        crawler: CrawlerConfig {
            seed_url: seed_url.to_string(),
            max_workers: 2,
            increment_threshold: 1,
            max_retries: 1,
            max_scroll_rounds: 5,
        },
        fetcher: FetcherConfig {
            user_agent: "TestBot/1.0".to_string(),
            timeout_secs: 5,
        },
        locators: Locators::default(),
        output: OutputConfig {
            checkpoint_path: dir.join("ckpt.json").display().to_string(),
            products_path: dir.join(products).display().to_string(),
            format,
            images_dir: dir.join("images").display().to_string(),
        },
    }
}

fn png_bytes() -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .expect("Failed to encode PNG");
    buffer.into_inner()
}

fn detail_page(name: &str, image: &str, price_markup: &str) -> String {
    format!(
        r#"<html><body><article class="product-detail">
            <img class="product-image" src="/img/{}">
            <h1>{}</h1>
            <span class="product-weight">1 kg</span>
            {}
            <div class="product-description"><p>Fresh from the farm</p></div>
        </article></body></html>"#,
        image, name, price_markup
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

/// Mounts a storefront with two listings, two good products, one product
/// with an unreadable price, one dead link and one foreign link
async fn mount_storefront(server: &MockServer) {
    mount_html(
        server,
        "/",
        r#"<html><body>
            <ol class="breadcrumb"><li>Home</li><li>Fruits</li></ol>
            <a href="/apple">Apple</a>
            <a href="/pear?utm_source=newsletter">Pear</a>
            <a href="/broken">Broken</a>
            <a href="/fruits/">All fruits</a>
            <a href="https://elsewhere.example/x">Elsewhere</a>
            <a href="mailto:shop@example.com">Mail us</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_html(
        server,
        "/fruits/",
        r#"<html><body>
            <a href="/apple">Apple again</a>
            <a href="/dates">Dates</a>
            <a href="/">Home</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_html(
        server,
        "/apple",
        detail_page(
            "Red Apple",
            "apple.png",
            r#"<div class="discounted-price"><span>120</span></div><div class="price"><span>150</span></div>"#,
        ),
    )
    .await;

    mount_html(
        server,
        "/pear",
        detail_page(
            "Green Pear",
            "pear.png",
            r#"<div class="price"><span>85</span></div>"#,
        ),
    )
    .await;

    mount_html(
        server,
        "/broken",
        detail_page(
            "Mystery Box",
            "box.png",
            r#"<div class="price"><span>ask in store</span></div>"#,
        ),
    )
    .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/img/.+\.png$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(png_bytes())
                .insert_header("content-type", "image/png"),
        )
        .mount(server)
        .await;
}

fn csv_lines(path: &str) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("Failed to read products CSV")
        .split("\r\n")
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_full_crawl_extracts_products() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;
    let dir = TempDir::new().unwrap();
    let seed = format!("{}/", server.uri());
    let config = create_test_config(&seed, dir.path(), OutputFormat::Csv);
    let products_path = config.output.products_path.clone();

    let summary = Coordinator::new(config, false, Some("hash-1".to_string()))
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert!(!summary.resumed);
    assert!(!summary.interrupted);
    assert_eq!(summary.products, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.queued, 0);
    assert_eq!(summary.peak_workers, 2);
    assert_eq!(summary.outcomes.get(&PageState::LoadFailed), Some(&1));
    assert_eq!(summary.outcomes.get(&PageState::Requeued), Some(&1));

    let mut lines = csv_lines(&products_path);
    assert_eq!(lines[0], "image,name,weight,category,price,short_description");
    lines.remove(0);
    lines.sort();
    assert_eq!(
        lines,
        vec![
            "green-pear.png,Green Pear,1 kg,Home > Fruits,85,Fresh from the farm",
            "red-apple.png,Red Apple,1 kg,Home > Fruits,120,Fresh from the farm",
        ]
    );

    assert!(dir.path().join("images/red-apple.png").exists());
    assert!(dir.path().join("images/green-pear.png").exists());

    let checkpoint = CheckpointStore::new(dir.path().join("ckpt.json"))
        .try_load()
        .expect("Checkpoint unreadable")
        .expect("Checkpoint missing");
    assert_eq!(checkpoint.config_hash.as_deref(), Some("hash-1"));
    assert_eq!(checkpoint.frontier.products_count, 2);
    assert!(checkpoint.frontier.queued.is_empty());
    assert_eq!(checkpoint.frontier.skipped, vec![format!("{}/broken", server.uri())]);
    assert!(checkpoint
        .frontier
        .processed
        .contains(&format!("{}/pear", server.uri())));
    assert!(!checkpoint
        .frontier
        .processed
        .iter()
        .any(|url| url.contains("elsewhere.example")));
}

#[tokio::test]
async fn test_rerun_after_completion_writes_nothing() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;
    let dir = TempDir::new().unwrap();
    let seed = format!("{}/", server.uri());

    let config = create_test_config(&seed, dir.path(), OutputFormat::Csv);
    let products_path = config.output.products_path.clone();
    Coordinator::new(config.clone(), false, None)
        .unwrap()
        .run()
        .await
        .unwrap();
    let first_run = csv_lines(&products_path);

    let summary = Coordinator::new(config, false, None)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(summary.resumed);
    assert_eq!(summary.cycles, 0);
    assert_eq!(summary.products, 2);
    assert_eq!(csv_lines(&products_path), first_run);
}

#[tokio::test]
async fn test_fresh_discards_previous_progress() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;
    let dir = TempDir::new().unwrap();
    let seed = format!("{}/", server.uri());

    let config = create_test_config(&seed, dir.path(), OutputFormat::Csv);
    let products_path = config.output.products_path.clone();
    Coordinator::new(config.clone(), false, None)
        .unwrap()
        .run()
        .await
        .unwrap();

    let summary = Coordinator::new(config, true, None)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(!summary.resumed);
    assert_eq!(summary.products, 2);

    let lines = csv_lines(&products_path);
    assert_eq!(lines.len(), 3, "header plus two products: {:?}", lines);
}

#[tokio::test]
async fn test_resume_from_interrupted_checkpoint() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;
    let dir = TempDir::new().unwrap();
    let seed = format!("{}/", server.uri());
    let config = create_test_config(&seed, dir.path(), OutputFormat::Csv);

    // State as left by a crawl stopped right after extracting the apple
    let mut frontier = Frontier::new(&seed, 1).unwrap();
    frontier.mark_processed(&seed);
    frontier.enqueue(&format!("{}/pear", server.uri()));
    frontier.attribute_category("Home > Fruits", &format!("{}/pear", server.uri()));
    frontier.record_product(&format!("{}/apple", server.uri()));
    CheckpointStore::new(&config.output.checkpoint_path)
        .save(&Checkpoint::new(frontier.snapshot(), None))
        .unwrap();
    std::fs::write(
        &config.output.products_path,
        "image,name,weight,category,price,short_description\r\n\
         red-apple.png,Red Apple,1 kg,Home > Fruits,120,Fresh from the farm\r\n",
    )
    .unwrap();

    let products_path = config.output.products_path.clone();
    let summary = Coordinator::new(config, false, None)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(summary.resumed);
    assert_eq!(summary.products, 2);
    assert_eq!(summary.outcomes.get(&PageState::Done), Some(&1));

    let lines = csv_lines(&products_path);
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[2],
        "green-pear.png,Green Pear,1 kg,Home > Fruits,85,Fresh from the farm"
    );
}

#[tokio::test]
async fn test_corrupt_checkpoint_starts_fresh() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;
    let dir = TempDir::new().unwrap();
    let seed = format!("{}/", server.uri());
    let config = create_test_config(&seed, dir.path(), OutputFormat::Csv);
    std::fs::write(&config.output.checkpoint_path, b"{\"processed\": [").unwrap();

    let summary = Coordinator::new(config, false, None)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(!summary.resumed);
    assert_eq!(summary.products, 2);
}

#[tokio::test]
async fn test_crawl_into_sqlite() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;
    let dir = TempDir::new().unwrap();
    let seed = format!("{}/", server.uri());
    let config = create_test_config(&seed, dir.path(), OutputFormat::Sqlite);
    let db_path = config.output.products_path.clone();

    let summary = Coordinator::new(config, false, None)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(summary.products, 2);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let mut statement = conn
        .prepare("SELECT name, price FROM products ORDER BY name")
        .unwrap();
    let rows: Vec<(String, i64)> = statement
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(
        rows,
        vec![
            ("Green Pear".to_string(), 85),
            ("Red Apple".to_string(), 120)
        ]
    );
}
