use std::{
    collections::HashMap,
    fs,
    path::Path,
};

use async_trait::async_trait;
use tempfile::TempDir;

use expression::{
    App, ClassScore, EmotionClassifier, ExpressionErr, ImageFetcher, Result, ServerConfig, Url,
    http::{Method, Request, Status},
    views,
};

const JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

/// Serves canned bodies keyed by URL, anything else is a 404.
#[derive(Default)]
struct StubFetcher {
    images: HashMap<String, Vec<u8>>,
}

impl StubFetcher {
    fn with(url: &str, body: &[u8]) -> Self {
        let mut images = HashMap::new();
        images.insert(url.to_string(), body.to_vec());
        Self { images }
    }
}

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn head(&self, url: &Url) -> Result<u16> {
        Ok(if self.images.contains_key(&url.to_string()) { 200 } else { 404 })
    }

    async fn get(&self, url: &Url, limit: usize) -> Result<Vec<u8>> {
        let body = self.images.get(&url.to_string()).ok_or_else(|| ExpressionErr::Fetch {
            url: url.to_string(),
            msg: "status 404".into(),
        })?;
        Ok(body.iter().copied().take(limit).collect())
    }
}

/// Answers every image with the same scores.
struct StubClassifier {
    scores: Vec<ClassScore>,
}

impl StubClassifier {
    fn new(scores: &[(usize, f32)]) -> Self {
        Self {
            scores: scores
                .iter()
                .map(|&(class, score)| ClassScore { class, score })
                .collect(),
        }
    }
}

#[async_trait]
impl EmotionClassifier for StubClassifier {
    async fn classify(&self, image: &Path) -> Result<Option<Vec<ClassScore>>> {
        assert!(image.exists(), "{} was not written", image.display());
        Ok((!self.scores.is_empty()).then(|| self.scores.clone()))
    }
}

struct Site {
    app: App,
    static_root: TempDir,
    media_root: TempDir,
}

fn site(fetcher: StubFetcher, classifier: StubClassifier) -> Site {
    let static_root = TempDir::new().unwrap();
    let media_root = TempDir::new().unwrap();

    let config = ServerConfig {
        static_root: static_root.path().to_path_buf(),
        media_root: media_root.path().to_path_buf(),
        max_image_bytes: 64,
        ..ServerConfig::default()
    };

    Site {
        app: App::new(config, Box::new(fetcher), Box::new(classifier)),
        static_root,
        media_root,
    }
}

fn add_example(site: &Site, name: &str) {
    let dir = site.static_root.path().join(views::EXAMPLES_DIR);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{name}.jpg")), JPEG).unwrap();
}

async fn upload(site: &Site, url: &str) -> String {
    let resp = site
        .app
        .handle(&Request::form_post("/upload/", &[("url", url)]))
        .await;
    assert_eq!(resp.status, Status::Ok);
    resp.text()
}

#[tokio::test]
async fn home_and_about_pages() {
    let site = site(StubFetcher::default(), StubClassifier::new(&[]));

    let home = site.app.handle(&Request::new(Method::Get, "/")).await;
    assert_eq!(home.status, Status::Ok);
    assert!(home.text().contains(r#"<form action="/upload/" method="post">"#));
    assert!(!home.text().contains("errorlist"));

    let about = site.app.handle(&Request::new(Method::Get, "/about/")).await;
    assert_eq!(about.status, Status::Ok);
    assert!(about.text().contains("<h1>About</h1>"));
}

#[tokio::test]
async fn example_is_classified() {
    let site = site(
        StubFetcher::default(),
        StubClassifier::new(&[(3, 0.8), (6, 0.15), (4, 0.05)]),
    );
    add_example(&site, "happy");

    let resp = site.app.handle(&Request::new(Method::Get, "/example/Happy/")).await;
    let page = resp.text();

    assert_eq!(resp.status, Status::Ok);
    assert!(page.contains("<h1>Most likely: Happy</h1>"));
    assert!(page.contains("/static/expression/image/happy.jpg"));
    assert!(page.contains("example image"));

    let happy = page.find("<td>Happy</td><td>80.00%</td>").unwrap();
    let neutral = page.find("<td>Neutral</td><td>15.00%</td>").unwrap();
    let sad = page.find("<td>Sad</td><td>5.00%</td>").unwrap();
    assert!(happy < neutral && neutral < sad);
}

#[tokio::test]
async fn missing_example_is_reported() {
    let site = site(StubFetcher::default(), StubClassifier::new(&[(3, 1.0)]));

    for target in ["/example/angry/", "/example/no%20such/"] {
        let resp = site.app.handle(&Request::new(Method::Get, target)).await;
        assert_eq!(resp.status, Status::Ok);
        assert!(resp.text().contains(views::EXAMPLE_NOT_FOUND), "{target}");
    }
}

#[tokio::test]
async fn example_without_faces() {
    let site = site(StubFetcher::default(), StubClassifier::new(&[]));
    add_example(&site, "sad");

    let resp = site.app.handle(&Request::new(Method::Get, "/example/sad/")).await;
    assert!(resp.text().contains(views::NO_FACES));
}

#[tokio::test]
async fn upload_rejects_bad_input() {
    let big = [JPEG, &[0u8; 64][..]].concat();
    let fetcher = StubFetcher {
        images: HashMap::from([
            ("http://img.test/notes.txt".to_string(), b"just some text".to_vec()),
            ("http://img.test/big.jpg".to_string(), big),
        ]),
    };
    let site = site(fetcher, StubClassifier::new(&[(3, 1.0)]));

    for (url, message) in [
        ("", "This field is required."),
        ("not a url", "Enter a valid URL."),
        ("http://img.test/missing.jpg", views::IMAGE_NOT_FOUND),
        ("http://img.test/notes.txt", views::NOT_AN_IMAGE),
        ("http://img.test/big.jpg", "Image is too large (&gt;4mb)"),
    ] {
        let page = upload(&site, url).await;
        assert!(page.contains("errorlist"), "{url}");
        assert!(page.contains(message), "{url}: {page}");
    }

    assert!(!site.media_root.path().join("images").exists());
}

#[tokio::test]
async fn upload_keeps_the_submitted_url() {
    let site = site(StubFetcher::default(), StubClassifier::new(&[(3, 1.0)]));

    let page = upload(&site, "http://img.test/missing.jpg?size=\"big\"").await;
    assert!(page.contains(r#"value="http://img.test/missing.jpg?size=&quot;big&quot;""#));
}

#[tokio::test]
async fn upload_is_classified_and_kept() {
    let site = site(
        StubFetcher::with("http://img.test/face.jpg", JPEG),
        StubClassifier::new(&[(5, 0.7), (2, 0.3)]),
    );

    let page = upload(&site, "http://img.test/face.jpg").await;
    assert!(page.contains("<h1>Most likely: Surprise</h1>"));
    assert!(page.contains("uploaded image"));
    assert!(page.contains("<td>Fear</td><td>30.00%</td>"));

    let start = page.find("/media/images/").unwrap();
    let end = start + page[start..].find('"').unwrap();
    let image_url = &page[start..end];

    let served = site.app.handle(&Request::new(Method::Get, image_url)).await;
    assert_eq!(served.status, Status::Ok);
    assert_eq!(served.content_type, "image/jpeg");
    assert_eq!(served.body, JPEG);

    let tmp = site.media_root.path().join("tmp_img");
    assert_eq!(fs::read_dir(tmp).unwrap().count(), 0);
}

#[tokio::test]
async fn upload_without_faces_is_not_kept() {
    let site = site(
        StubFetcher::with("http://img.test/wall.jpg", JPEG),
        StubClassifier::new(&[]),
    );

    let page = upload(&site, "http://img.test/wall.jpg").await;
    assert!(page.contains(views::NO_FACES));
    assert!(!site.media_root.path().join("images").exists());
}

#[tokio::test]
async fn unknown_paths_and_methods() {
    let site = site(StubFetcher::default(), StubClassifier::new(&[]));

    let resp = site.app.handle(&Request::new(Method::Get, "/nowhere/")).await;
    assert_eq!(resp.status, Status::NotFound);

    let resp = site.app.handle(&Request::new(Method::Post, "/about/")).await;
    assert_eq!(resp.status, Status::MethodNotAllowed);
    assert!(resp.headers.iter().any(|(name, _)| name == "Allow"));

    let resp = site
        .app
        .handle(&Request::new(Method::Other("DELETE".into()), "/upload/"))
        .await;
    assert_eq!(resp.status, Status::MethodNotAllowed);
}

#[tokio::test]
async fn static_files_stay_below_their_root() {
    let site = site(StubFetcher::default(), StubClassifier::new(&[]));
    let css = site.static_root.path().join("expression/css");
    fs::create_dir_all(&css).unwrap();
    fs::write(css.join("site.css"), "body {}").unwrap();

    let resp = site
        .app
        .handle(&Request::new(Method::Get, "/static/expression/css/site.css"))
        .await;
    assert_eq!(resp.status, Status::Ok);
    assert_eq!(resp.content_type, "text/css; charset=utf-8");
    assert_eq!(resp.text(), "body {}");

    for target in [
        "/static/../Cargo.toml",
        "/static/%2E%2E/Cargo.toml",
        "/static/expression",
        "/static/",
    ] {
        let resp = site.app.handle(&Request::new(Method::Get, target)).await;
        assert_eq!(resp.status, Status::NotFound, "{target}");
    }
}

/// Fails the test if an image is ever classified.
struct NeverCalled;

#[async_trait]
impl EmotionClassifier for NeverCalled {
    async fn classify(&self, image: &Path) -> Result<Option<Vec<ClassScore>>> {
        panic!("{} should not be classified", image.display())
    }
}

#[tokio::test]
async fn head_on_an_example_skips_the_classifier() {
    let static_root = TempDir::new().unwrap();
    let config = ServerConfig {
        static_root: static_root.path().to_path_buf(),
        ..ServerConfig::default()
    };
    let app = App::new(config, Box::new(StubFetcher::default()), Box::new(NeverCalled));

    let dir = static_root.path().join(views::EXAMPLES_DIR);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("happy.jpg"), JPEG).unwrap();

    let resp = app.handle(&Request::new(Method::Head, "/example/happy/")).await;
    assert_eq!(resp.status, Status::Ok);
    assert!(resp.body.is_empty());
}
