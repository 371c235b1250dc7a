use crate::images::{ImageError, ImageMaterializer};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tokio::sync::Mutex;

/// Saves product images as `<slug>.png` files in one directory
#[derive(Debug)]
pub struct ImageStore {
    client: Client,
    dir: PathBuf,
    /// File names handed out during this run, including in-flight downloads
    reserved: Mutex<HashSet<String>>,
}

impl ImageStore {
    /// Creates the store, creating `dir` if needed
    pub fn new(client: Client, dir: impl Into<PathBuf>) -> Result<Self, ImageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ImageError::Io {
            path: dir.clone(),
            source,
        })?;

        Ok(Self {
            client,
            dir,
            reserved: Mutex::new(HashSet::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Picks the first free file name for `slug`: `slug.png`, `slug-1.png`, ...
    async fn reserve(&self, slug: &str) -> String {
        let mut reserved = self.reserved.lock().await;
        let mut suffix = 0u32;
        loop {
            let candidate = if suffix == 0 {
                format!("{}.png", slug)
            } else {
                format!("{}-{}.png", slug, suffix)
            };

            if !reserved.contains(&candidate) && !self.dir.join(&candidate).exists() {
                reserved.insert(candidate.clone());
                return candidate;
            }
            suffix += 1;
        }
    }

    async fn release(&self, file_name: &str) {
        self.reserved.lock().await.remove(file_name);
    }

    async fn download(&self, source_url: &str) -> Result<Vec<u8>, ImageError> {
        let download_error = |message: String| ImageError::Download {
            url: source_url.to_string(),
            message,
        };

        let response = self
            .client
            .get(source_url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_error(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_error(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn write_png(&self, bytes: Vec<u8>, path: PathBuf) -> Result<(), ImageError> {
        tokio::task::spawn_blocking(move || -> Result<(), ImageError> {
            let decoded = image::load_from_memory(&bytes)?;
            decoded.save_with_format(&path, image::ImageFormat::Png)?;
            Ok(())
        })
        .await
        .map_err(|e| ImageError::Task(e.to_string()))?
    }
}

#[async_trait]
impl ImageMaterializer for ImageStore {
    async fn materialize(
        &self,
        source_url: &str,
        suggested_name: &str,
    ) -> Result<String, ImageError> {
        let file_name = self.reserve(&slugify(suggested_name)).await;
        if !is_plain_file_name(&file_name) {
            self.release(&file_name).await;
            return Err(ImageError::UnsafeName(file_name));
        }

        let result = match self.download(source_url).await {
            Ok(bytes) => self.write_png(bytes, self.dir.join(&file_name)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::debug!("Saved image {} as {}", source_url, file_name);
                Ok(file_name)
            }
            Err(e) => {
                self.release(&file_name).await;
                Err(e)
            }
        }
    }
}

/// Derives a file-name slug from a product name
///
/// Only letters, digits, `-`, `_` and `.` survive; everything else
/// separates words. Leading dots are stripped, so the slug is always a
/// plain file name.
///
/// ```
/// use shelf_crawler::images::slugify;
///
/// assert_eq!(slugify("Green Tea (Loose Leaf)"), "green-tea-loose-leaf");
/// assert_eq!(slugify("Milk 1/2 L"), "milk-1-2-l");
/// ```
pub fn slugify(name: &str) -> String {
    let spaced: String = name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() => c,
            '-' | '_' | '.' => c,
            _ => ' ',
        })
        .collect();

    let slug = spaced.split_whitespace().collect::<Vec<_>>().join("-");
    let slug = slug.trim_start_matches(['.', '-']);
    if slug.is_empty() {
        "image".to_string()
    } else {
        slug.to_string()
    }
}

/// True if `file_name` names a file directly inside the store directory
fn is_plain_file_name(file_name: &str) -> bool {
    let mut components = Path::new(file_name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetcherConfig;
    use crate::source::build_http_client;
    use std::io::Cursor;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes() -> Vec<u8> {
        let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn store(dir: &TempDir) -> ImageStore {
        let client = build_http_client(&FetcherConfig::default()).unwrap();
        ImageStore::new(client, dir.path().join("images")).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Apple"), "apple");
        assert_eq!(slugify("  Rice   (Basmati)  1kg "), "rice-basmati-1kg");
        assert_eq!(slugify("Scale ±5g \"Pro\""), "scale-5g-pro");
        assert_eq!(slugify("()"), "image");
    }

    #[test]
    fn test_slugify_strips_path_separators() {
        assert_eq!(slugify("Milk 1/2 L"), "milk-1-2-l");
        assert_eq!(slugify("C:\\Windows\\tea"), "c-windows-tea");
        assert_eq!(slugify("../escaped"), "escaped");
        assert_eq!(slugify(".."), "image");
        assert_eq!(slugify("Vitamin C 2.5g"), "vitamin-c-2.5g");
    }

    #[test]
    fn test_plain_file_name() {
        assert!(is_plain_file_name("apple.png"));
        assert!(!is_plain_file_name("../apple.png"));
        assert!(!is_plain_file_name("a/b.png"));
        assert!(!is_plain_file_name("/abs.png"));
        assert!(!is_plain_file_name("..png/x"));
    }

    #[tokio::test]
    async fn test_hostile_names_stay_inside_images_dir() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(png_bytes())
                    .insert_header("content-type", "image/png"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let url = format!("{}/img/x.png", server.uri());

        let milk = store.materialize(&url, "Milk 1/2 L").await.unwrap();
        let escaped = store.materialize(&url, "../escaped").await.unwrap();

        assert_eq!(milk, "milk-1-2-l.png");
        assert_eq!(escaped, "escaped.png");
        assert!(store.dir().join(&milk).exists());
        assert!(store.dir().join(&escaped).exists());
        assert!(!dir.path().join("escaped.png").exists());
    }

    #[tokio::test]
    async fn test_reserve_adds_suffixes() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(store.dir().join("apple.png"), b"existing").unwrap();

        assert_eq!(store.reserve("apple").await, "apple-1.png");
        assert_eq!(store.reserve("apple").await, "apple-2.png");
        assert_eq!(store.reserve("pear").await, "pear.png");
    }

    #[tokio::test]
    async fn test_materialize_downloads_and_transcodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/apple.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(png_bytes())
                    .insert_header("content-type", "image/png"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let url = format!("{}/img/apple.png", server.uri());

        let first = store.materialize(&url, "Red Apple").await.unwrap();
        let second = store.materialize(&url, "Red Apple").await.unwrap();

        assert_eq!(first, "red-apple.png");
        assert_eq!(second, "red-apple-1.png");
        let saved = image::open(store.dir().join(&first)).unwrap();
        assert_eq!(saved.width(), 2);
    }

    #[tokio::test]
    async fn test_failed_download_releases_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let url = format!("{}/img/missing.png", server.uri());

        let result = store.materialize(&url, "Pear").await;
        assert!(matches!(result, Err(ImageError::Download { .. })));
        assert_eq!(store.reserve("pear").await, "pear.png");
    }

    #[tokio::test]
    async fn test_undecodable_image_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not an image".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let result = store
            .materialize(&format!("{}/img/bad.png", server.uri()), "Bad")
            .await;
        assert!(matches!(result, Err(ImageError::Decode(_))));
    }
}
