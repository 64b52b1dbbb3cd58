use std::{io, path::Path};

use log::{error, info, warn};
use tokio::fs;

use crate::{
    classifier::EmotionClassifier,
    config::ServerConfig,
    emotion::{ClassScore, Score, rank_scores},
    error::Result,
    fetch::ImageFetcher,
    forms::UploadImageFromUrlForm,
    http::{Method, Request, Response, Status},
    store::{MediaStore, content_type, resolve_below},
    templates,
    validation::{
        ImageKind, image_exists, retrieve_image, split_url, valid_image_mimetype, valid_image_size,
    },
};

pub const EXAMPLE_NOT_FOUND: &str = "Example image was not found!";
pub const IMAGE_NOT_FOUND: &str = "Image not found at specified url.";
pub const NOT_AN_IMAGE: &str = "Downloaded file not a valid image.";
pub const IMAGE_TOO_LARGE: &str = "Image is too large (>4mb)";
pub const NO_FACES: &str = "No faces were found in the image. Please try another!";

/// Directory, below the static root, holding the bundled example images.
pub const EXAMPLES_DIR: &str = "expression/image";

/// Everything a request handler needs, shared by all connections.
pub struct App {
    config: ServerConfig,
    fetcher: Box<dyn ImageFetcher>,
    classifier: Box<dyn EmotionClassifier>,
    store: MediaStore,
}

impl App {
    /// Creates the application.
    ///
    /// # Arguments
    /// * `config` - Server settings, the static and media roots are read from here.
    /// * `fetcher` - Downloads images submitted through the upload form.
    /// * `classifier` - Scores the faces found in an image.
    pub fn new(
        config: ServerConfig,
        fetcher: Box<dyn ImageFetcher>,
        classifier: Box<dyn EmotionClassifier>,
    ) -> Self {
        let store = MediaStore::new(config.media_root.clone());
        Self {
            config,
            fetcher,
            classifier,
            store,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Routes a request to its view, internal failures become a 500 page.
    pub async fn handle(&self, req: &Request) -> Response {
        match self.route(req).await {
            Ok(resp) => {
                info!(status = resp.status.code(); "{} {}", req.method, req.path);
                resp
            }
            Err(e) => {
                error!("{} {} failed: {e}", req.method, req.path);
                Response::html(Status::InternalServerError, templates::server_error())
            }
        }
    }

    async fn route(&self, req: &Request) -> Result<Response> {
        let path = req.path.as_str();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let readable = matches!(req.method, Method::Get | Method::Head);

        match (segments.as_slice(), readable) {
            ([], true) => Ok(self.home_page()),
            (["about"], true) => Ok(self.about_view()),
            (["example", _], true) if req.method == Method::Head => {
                Ok(Response::html(Status::Ok, String::new()))
            }
            (["example", name], true) => self.example_view(name).await,
            (["upload"], true) => Ok(self.home_page()),
            (["upload"], false) if req.method == Method::Post => self.upload_view(req).await,
            (["static", rest @ ..], true) => {
                self.serve_file(&self.config.static_root, &rest.join("/")).await
            }
            (["media", rest @ ..], true) => {
                self.serve_file(&self.config.media_root, &rest.join("/")).await
            }
            ([] | ["about"] | ["example", _] | ["upload"] | ["static", ..] | ["media", ..], _) => Ok(
                Response::html(Status::MethodNotAllowed, templates::method_not_allowed())
                    .with_header("Allow", "GET, HEAD, POST"),
            ),
            _ => Ok(Response::html(Status::NotFound, templates::not_found(path))),
        }
    }

    fn home_page(&self) -> Response {
        let form = UploadImageFromUrlForm::default();
        Response::html(Status::Ok, templates::media_upload(&form.url, &form.errors))
    }

    fn about_view(&self) -> Response {
        Response::html(Status::Ok, templates::about())
    }

    fn image_bad(&self, message: &str) -> Response {
        Response::html(Status::Ok, templates::image_bad(message))
    }

    /// Classifies one of the bundled example images ("happy", "sad" or "surprised").
    async fn example_view(&self, name: &str) -> Result<Response> {
        let name = name.to_lowercase();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Ok(self.image_bad(EXAMPLE_NOT_FOUND));
        }

        let url = format!("/static/{EXAMPLES_DIR}/{name}.jpg");
        let path = self.config.static_root.join(EXAMPLES_DIR).join(format!("{name}.jpg"));
        if !fs::try_exists(&path).await? {
            warn!("example image {} is missing", path.display());
            return Ok(self.image_bad(EXAMPLE_NOT_FOUND));
        }

        let Some(raw) = self.classifier.classify(&path).await? else {
            return Ok(self.image_bad(NO_FACES));
        };

        let scores = rank_scores(&raw)?;
        Ok(Response::html(
            Status::Ok,
            templates::single_image(&url, true, &scores),
        ))
    }

    fn form_invalid(&self, mut form: UploadImageFromUrlForm, message: &str) -> Response {
        info!("upload rejected: {message}");
        form.invalidate(message);
        Response::html(Status::Ok, templates::media_upload(&form.url, &form.errors))
    }

    /// Downloads, validates and classifies the image at the posted url.
    async fn upload_view(&self, req: &Request) -> Result<Response> {
        let mut form = UploadImageFromUrlForm::bind(req);
        let Some(url) = form.clean() else {
            return Ok(Response::html(
                Status::Ok,
                templates::media_upload(&form.url, &form.errors),
            ));
        };

        let Some((domain, path)) = split_url(&form.url) else {
            return Ok(self.form_invalid(form, crate::forms::INVALID_URL));
        };

        if !image_exists(self.fetcher.as_ref(), &domain, &path).await {
            return Ok(self.form_invalid(form, IMAGE_NOT_FOUND));
        }

        let max_bytes = self.config.max_image_bytes;
        let bytes = match retrieve_image(self.fetcher.as_ref(), &url.to_string(), max_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("downloading {url} failed: {e}");
                return Ok(self.form_invalid(form, IMAGE_NOT_FOUND));
            }
        };

        if !valid_image_mimetype(&bytes) {
            return Ok(self.form_invalid(form, NOT_AN_IMAGE));
        }
        let (fits, size) = valid_image_size(&bytes, max_bytes);
        if !fits {
            warn!(size = size; "image over the {max_bytes} byte limit");
            return Ok(self.form_invalid(form, IMAGE_TOO_LARGE));
        }

        let kind = ImageKind::sniff(&bytes).unwrap_or(ImageKind::Jpeg);
        let temp = self.store.save_temp(&bytes, kind.extension()).await?;

        let outcome = self.classify_upload(&temp).await;
        self.store.remove(&temp).await?;

        match outcome? {
            None => Ok(self.image_bad(NO_FACES)),
            Some((image_url, scores)) => Ok(Response::html(
                Status::Ok,
                templates::single_image(&image_url, false, &scores),
            )),
        }
    }

    async fn classify_upload(&self, temp: &Path) -> Result<Option<(String, Vec<Score>)>> {
        let Some(raw) = self.classifier.classify(temp).await? else {
            return Ok(None);
        };
        self.add_image_models(temp, &raw).await.map(Some)
    }

    /// Keeps a classified image and ranks its scores.
    ///
    /// # Returns
    /// The URL of the kept image and the ranked scores.
    async fn add_image_models(&self, temp: &Path, raw: &[ClassScore]) -> Result<(String, Vec<Score>)> {
        let scores = rank_scores(raw)?;
        let image_url = self.store.persist(temp).await?;
        Ok((image_url, scores))
    }

    async fn serve_file(&self, root: &Path, relative: &str) -> Result<Response> {
        let not_found = || Response::html(Status::NotFound, templates::not_found(relative));

        let Some(path) = resolve_below(root, relative) else {
            return Ok(not_found());
        };

        match fs::read(&path).await {
            Ok(bytes) => Ok(Response::bytes(Status::Ok, content_type(&path), bytes)),
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::IsADirectory) => {
                Ok(not_found())
            }
            Err(e) => Err(e.into()),
        }
    }
}
