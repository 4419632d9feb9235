use axum::body::Body;
use axum::extract::Path;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use rust_embed::RustEmbed;

/// Stylesheet and any other fixed assets, compiled into the binary.
#[derive(RustEmbed)]
#[folder = "static/"]
pub struct Assets;

/// Serve one embedded asset by path, 404 when absent.
pub async fn static_handler(Path(path): Path<String>) -> Response {
    match Assets::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            Response::builder()
                .header(header::CONTENT_TYPE, mime.as_ref())
                .body(Body::from(content.data.to_vec()))
                .unwrap()
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_is_embedded() {
        assert!(Assets::get("style.css").is_some());
        assert!(Assets::get("nope.css").is_none());
    }
}
