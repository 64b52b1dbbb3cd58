use crate::{fetch::Url, http::Request};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_URL: &str = "Enter a valid URL.";
pub const HTTP_ONLY: &str = "Only http:// image addresses are supported.";

/// The form asking for the address of an image to classify.
#[derive(Debug, Clone, Default)]
pub struct UploadImageFromUrlForm {
    /// The submitted value, echoed back when the form is re-rendered.
    pub url: String,
    pub errors: Vec<String>,
}

impl UploadImageFromUrlForm {
    /// Binds the form to the fields posted in `req`.
    pub fn bind(req: &Request) -> Self {
        let url = req
            .form()
            .into_iter()
            .find(|(name, _)| name == "url")
            .map(|(_, value)| value.trim().to_string())
            .unwrap_or_default();

        Self {
            url,
            errors: Vec::new(),
        }
    }

    /// Field level validation.
    ///
    /// # Returns
    /// The parsed URL, or `None` with `errors` filled in.
    pub fn clean(&mut self) -> Option<Url> {
        if self.url.is_empty() {
            self.errors.push(REQUIRED.into());
            return None;
        }

        match Url::parse(&self.url) {
            Some(url) if url.scheme == "http" => Some(url),
            Some(_) => {
                self.errors.push(HTTP_ONLY.into());
                None
            }
            None => {
                self.errors.push(INVALID_URL.into());
                None
            }
        }
    }

    /// Marks the form invalid with a message about the url field.
    pub fn invalidate(&mut self, message: &str) {
        self.errors = vec![message.to_string()];
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
