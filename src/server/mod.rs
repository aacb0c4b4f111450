//! The HTTP adapter: queries in, rendered search results out.
//!
//! The adapter only reads snapshots. Refreshing is the scheduler's job, so
//! a slow environment can never stall a request.

pub mod render;

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::inventory::EnvironmentSet;
use crate::search;

const USAGE: &str = "Search packages across inventoried environments.\n\
    \n\
    Parameters:\n\
    \x20 query    comma separated terms, each `name` or `name=version`;\n\
    \x20          names and versions match by containment\n\
    \x20 format   one of `json`, `xml`, `html`; defaults to `json` or the\n\
    \x20          Accept header's preference\n\
    \x20 help     show this text\n\
    \n\
    An environment is returned only when every term matched.\n";

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub environments: Arc<EnvironmentSet>,
}

/// Response format, negotiated per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Xml,
    Html,
}

impl Format {
    fn from_name(name: &str) -> Option<Format> {
        match name {
            "json" => Some(Format::Json),
            "xml" => Some(Format::Xml),
            "html" => Some(Format::Html),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    query: Option<String>,
    format: Option<String>,
    help: Option<String>,
}

/// Build the application router. `/` and `/api/search` answer searches,
/// `/api` describes the interface.
pub fn router(environments: Arc<EnvironmentSet>) -> Router {
    Router::new()
        .route("/", get(handle_search))
        .route("/api", get(handle_api))
        .route("/api/search", get(handle_search))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { environments })
}

async fn handle_api() -> &'static str {
    USAGE
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> Response {
    let format = negotiate(params.format.as_deref(), &headers);
    if params.help.is_some() {
        return USAGE.into_response();
    }
    let Some(format) = format else {
        return (StatusCode::BAD_REQUEST, "unknown format").into_response();
    };

    let query = params.query.unwrap_or_default();
    let terms = search::parse_query(&query);
    let results = search::search_environments(&state.environments, &terms);
    match format {
        Format::Json => axum::Json(render::json_body(&results, &query)).into_response(),
        Format::Xml => (
            [(header::CONTENT_TYPE, "text/xml")],
            render::xml_body(&results, &query),
        )
            .into_response(),
        Format::Html => Html(render::html_body(&results, &query)).into_response(),
    }
}

/// Pick the response format: an explicit `format` parameter wins, then the
/// first recognized mime type in the Accept headers, then json. An explicit
/// parameter naming an unknown format is an error, not a fallback.
fn negotiate(requested: Option<&str>, headers: &HeaderMap) -> Option<Format> {
    if let Some(name) = requested {
        return Format::from_name(name);
    }
    for accept in headers.get_all(header::ACCEPT) {
        let Ok(value) = accept.to_str() else { continue };
        for mimetype in value.split(',') {
            let essence = mimetype.split(';').next().unwrap_or_default().trim();
            match essence {
                "text/html" => return Some(Format::Html),
                "application/json" => return Some(Format::Json),
                "application/xml" => return Some(Format::Xml),
                _ => {}
            }
        }
    }
    Some(Format::Json)
}
