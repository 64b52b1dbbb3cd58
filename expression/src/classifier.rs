use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{
    emotion::ClassScore,
    error::{ExpressionErr, Result},
};

/// The pretrained emotion classifier.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    /// Classifies the face found in the image at `image`.
    ///
    /// # Returns
    /// The per class probabilities, or `None` if no face was found.
    async fn classify(&self, image: &Path) -> Result<Option<Vec<ClassScore>>>;
}

/// Runs an external program per image.
///
/// The program gets the image path as its last argument and must print a JSON
/// array of `{"class": <index>, "score": <probability>}` objects on stdout, an
/// empty array meaning no face was found.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandClassifier {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl EmotionClassifier for CommandClassifier {
    async fn classify(&self, image: &Path) -> Result<Option<Vec<ClassScore>>> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(image)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ExpressionErr::Classifier(format!("cannot run {}: {e}", self.program.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExpressionErr::Classifier(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let scores: Vec<ClassScore> = serde_json::from_slice(&output.stdout)?;
        log::debug!(classes = scores.len(); "classified {}", image.display());

        Ok((!scores.is_empty()).then_some(scores))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn script(body: &str) -> CommandClassifier {
        // `sh -c <body> sh <image>` runs `body` with the image as `$1`.
        CommandClassifier::new("sh", vec!["-c".into(), body.into(), "sh".into()])
    }

    #[tokio::test]
    async fn parses_scores_from_stdout() {
        let classifier = script(r#"echo "[{\"class\": 3, \"score\": 0.9}, {\"class\": 4, \"score\": 0.1}]""#);
        let scores = classifier.classify(Path::new("face.jpg")).await.unwrap().unwrap();

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].class, 3);
        assert_eq!(scores[1].score, 0.1);
    }

    #[tokio::test]
    async fn image_path_is_the_last_argument() {
        let classifier = script(r#"[ "$1" = "in/face.jpg" ] && echo '[]'"#);
        assert!(classifier.classify(Path::new("in/face.jpg")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failures_are_reported() {
        let err = script("echo broken >&2; exit 2")
            .classify(Path::new("face.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExpressionErr::Classifier(ref msg) if msg.contains("broken")));

        let err = script("echo not json").classify(Path::new("face.jpg")).await.unwrap_err();
        assert!(matches!(err, ExpressionErr::Json(_)));

        let missing = CommandClassifier::new("/nonexistent/fec-classify", Vec::new());
        let err = missing.classify(Path::new("face.jpg")).await.unwrap_err();
        assert!(matches!(err, ExpressionErr::Classifier(_)));
    }
}
