//! Embedded chat page.
//!
//! The files under `frontend/` are compiled into the binary with
//! `include_str!`, so `murmur serve` needs nothing on disk but its config.

use axum::{
    Router,
    http::header,
    response::{Html, IntoResponse},
    routing::get,
};

const INDEX_HTML: &str = include_str!("../../../frontend/index.html");

/// Static assets: (route, content type, body).
const ASSETS: &[(&str, &str, &str)] = &[
    (
        "/static/style.css",
        "text/css; charset=utf-8",
        include_str!("../../../frontend/style.css"),
    ),
    (
        "/static/app.js",
        "application/javascript; charset=utf-8",
        include_str!("../../../frontend/app.js"),
    ),
];

/// Build a router that serves the embedded page and its assets.
pub fn frontend_router() -> Router {
    let router = Router::new().route("/", get(|| async { Html(INDEX_HTML) }));

    ASSETS
        .iter()
        .fold(router, |router, &(path, content_type, body)| {
            router.route(
                path,
                get(move || async move {
                    (
                        [
                            (header::CONTENT_TYPE, content_type),
                            (header::CACHE_CONTROL, "no-cache"),
                        ],
                        body,
                    )
                        .into_response()
                }),
            )
        })
}
