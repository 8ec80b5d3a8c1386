//! HTTP response handlers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::embed::serve::reload_script;
use crate::logger::error_chain;
use crate::utils::html::escape;
use crate::utils::mime::{self, types};

/// Respond with the reload client, or its stub when hot reload is off.
pub fn respond_reload_script(request: Request, hot_reload: bool) -> Result<()> {
    send_body(
        request,
        200,
        types::JAVASCRIPT,
        reload_script(hot_reload).into_bytes(),
    )
}

/// Respond with a rendered template.
pub fn respond_html(request: Request, body: String) -> Result<()> {
    send_body(request, 200, types::HTML, body.into_bytes())
}

/// Respond with a render failure (500).
pub fn respond_render_error(request: Request, error: &dyn std::error::Error) -> Result<()> {
    let chain = error_chain(error);
    let msg = escape(&chain);
    let body = format!("<html><body><h1>Render Error</h1><pre>{msg}</pre></body></html>");
    send_body(request, 500, types::HTML, body.into_bytes())
}

/// Respond with a file from disk.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    let body = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    send_body(request, 200, content_type, body)
}

pub fn respond_not_found(request: Request) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 404, types::PLAIN);
    }
    send_body(request, 404, types::PLAIN, b"404 Not Found".to_vec())
}

/// Respond with 400 when a socket request lacks the handshake headers.
pub fn respond_bad_request(request: Request) -> Result<()> {
    send_body(request, 400, types::PLAIN, b"400 Bad Request".to_vec())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(
        request,
        503,
        types::PLAIN,
        b"503 Service Unavailable".to_vec(),
    )
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response =
        Response::empty(StatusCode(status)).with_header(make_header("Content-Type", content_type)?);
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type)?)
        .with_header(make_header("Cache-Control", "no-store")?);
    request.respond(response)?;
    Ok(())
}

pub(super) fn make_header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key, value).map_err(|()| anyhow::anyhow!("invalid header `{key}: {value}`"))
}
