//! HTML pages of the site.

use crate::emotion::Score;

/// Escapes text for use inside HTML content and quoted attributes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title} | Facial Expression Recognition</title>
  <link rel="stylesheet" href="/static/expression/css/site.css">
</head>
<body>
  <nav>
    <a href="/">Home</a>
    <a href="/example/happy/">Happy</a>
    <a href="/example/sad/">Sad</a>
    <a href="/example/surprised/">Surprised</a>
    <a href="/about/">About</a>
  </nav>
  <main>
{body}
  </main>
</body>
</html>
"#,
        title = escape(title),
    )
}

/// The upload form, with the submitted value and its errors when re-rendered.
pub fn media_upload(url: &str, errors: &[String]) -> String {
    let errors = if errors.is_empty() {
        String::new()
    } else {
        let items: String = errors
            .iter()
            .map(|e| format!("      <li>{}</li>\n", escape(e)))
            .collect();
        format!("    <ul class=\"errorlist\">\n{items}    </ul>\n")
    };

    let body = format!(
        r#"    <h1>What is this face feeling?</h1>
    <p>Paste the address of an image with a face in it, or try one of the examples.</p>
    <form action="/upload/" method="post">
{errors}      <label for="id_url">Image URL:</label>
      <input type="url" name="url" id="id_url" value="{url}" required>
      <button type="submit">Classify</button>
    </form>"#,
        url = escape(url),
    );

    layout("Upload", &body)
}

pub fn about() -> String {
    let body = r#"    <h1>About</h1>
    <p>This site finds a face in an image and estimates how likely it is to show
    each of seven emotions: angry, disgust, fear, happy, sad, surprise and neutral.</p>
    <p>The estimates come from a classifier trained on labelled grey-scale face images.</p>"#;

    layout("About", body)
}

/// The classification result of a single image.
///
/// # Arguments
/// * `url` - Where the classified image is served from.
/// * `is_static` - Whether the image is one of the bundled examples.
/// * `scores` - Emotion confidences, most likely first.
pub fn single_image(url: &str, is_static: bool, scores: &[Score]) -> String {
    let rows: String = scores
        .iter()
        .map(|s| {
            format!(
                "        <tr><td>{}</td><td>{:.2}%</td></tr>\n",
                s.emotion.label(),
                s.percent
            )
        })
        .collect();

    let heading = match scores.first() {
        Some(best) => format!("Most likely: {}", best.emotion),
        None => "No emotion scores".to_string(),
    };
    let source = if is_static { "example" } else { "uploaded" };

    let body = format!(
        r#"    <h1>{heading}</h1>
    <figure>
      <img src="{url}" alt="{source} image">
      <figcaption>{source} image</figcaption>
    </figure>
    <table class="scores">
      <thead><tr><th>Emotion</th><th>Confidence</th></tr></thead>
      <tbody>
{rows}      </tbody>
    </table>
    <p><a href="/">Try another image</a></p>"#,
        url = escape(url),
    );

    layout("Result", &body)
}

/// Shown when an image could not be classified.
pub fn image_bad(message: &str) -> String {
    let body = format!(
        r#"    <h1>Sorry!</h1>
    <p class="error">{}</p>
    <p><a href="/">Try another image</a></p>"#,
        escape(message)
    );

    layout("Bad image", &body)
}

pub fn not_found(path: &str) -> String {
    let body = format!(
        "    <h1>Not found</h1>\n    <p>Nothing lives at <code>{}</code>.</p>",
        escape(path)
    );
    layout("Not found", &body)
}

pub fn method_not_allowed() -> String {
    layout("Not allowed", "    <h1>Method not allowed</h1>")
}

pub fn bad_request(message: &str) -> String {
    let body = format!("    <h1>Bad request</h1>\n    <p>{}</p>", escape(message));
    layout("Bad request", &body)
}

pub fn server_error() -> String {
    layout(
        "Error",
        "    <h1>Something went wrong</h1>\n    <p>Please try again later.</p>",
    )
}
