//! Development server with live reload support.
//!
//! ```text
//! /hotreload/reload.js   -> reload client (or stub)
//! /hotreload/ws          -> WebSocket, one writer thread per browser
//! /, /{name}.html        -> rendered template
//! {static_route}/...     -> file under static_root
//! ```

mod lifecycle;
mod path;
mod response;
mod socket;

pub use lifecycle::{ShutdownSignal, bind_with_retry, install_shutdown_handler};

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use tiny_http::{Request, Server};

use crate::actor::ReloadEngine;
use crate::embed::serve::{RELOAD_SCRIPT_ROUTE, RELOAD_SOCKET_ROUTE};
use crate::logger::Logger;
use crate::template::RenderError;
use crate::{debug, log};

/// Worker threads for ordinary requests.
const REQUEST_THREADS: usize = 4;

/// Template rendered for `/`.
const INDEX_TEMPLATE: &str = "index.html";

/// Where a request URL goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    ReloadScript,
    Socket,
    /// Template name
    Render(String),
    /// Path relative to the static root
    Static(String),
    NotFound,
}

/// Map a request URL to a route. Query strings and fragments are ignored.
pub fn route(url: &str, static_route: &str) -> Route {
    let path = url.split(['?', '#']).next().unwrap_or(url);

    match path {
        RELOAD_SCRIPT_ROUTE => return Route::ReloadScript,
        RELOAD_SOCKET_ROUTE => return Route::Socket,
        "" | "/" => return Route::Render(INDEX_TEMPLATE.to_string()),
        _ => {}
    }

    if let Some(rest) = strip_route(path, static_route) {
        return Route::Static(rest.to_string());
    }

    let Ok(name) = percent_decode_str(path.trim_start_matches('/')).decode_utf8() else {
        return Route::NotFound;
    };
    if name.ends_with(".html") && !name.contains('/') {
        return Route::Render(name.into_owned());
    }

    // a root static route takes whatever templates do not
    if static_route == "/" {
        return Route::Static(path.trim_start_matches('/').to_string());
    }

    Route::NotFound
}

/// `/assets/css/a.css` under `/assets` -> `css/a.css`
fn strip_route<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix == "/" {
        return None;
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.strip_prefix('/')
}

/// Bound server ready to accept requests.
pub struct DevServer {
    server: Arc<Server>,
    addr: SocketAddr,
    engine: Arc<ReloadEngine>,
    static_root: PathBuf,
    logger: Arc<dyn Logger>,
}

impl DevServer {
    /// Bind the HTTP server without starting the request loop.
    pub fn bind(
        interface: IpAddr,
        port: u16,
        engine: Arc<ReloadEngine>,
        logger: Arc<dyn Logger>,
    ) -> Result<Self> {
        let (server, addr) = bind_with_retry(interface, port, &*logger)?;
        let static_root = PathBuf::from(engine.config().static_root());

        log!(logger; "serve"; "http://{}", addr);
        debug!(logger; "serve"; "static files: {} -> {}", engine.config().static_route(), static_root.display());

        Ok(Self {
            server: Arc::new(server),
            addr,
            engine,
            static_root,
            logger,
        })
    }

    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared handle for `unblock`, e.g. from a signal handler.
    pub fn server(&self) -> Arc<Server> {
        Arc::clone(&self.server)
    }

    /// Run the request loop until the server is unblocked.
    pub fn run(self, shutdown: Option<ShutdownSignal>) -> Result<()> {
        // Use thread pool to handle requests concurrently
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(REQUEST_THREADS)
            .thread_name(|i| format!("http-{i}"))
            .build()
            .context("failed to create request pool")?;

        let handler = Arc::new(Handler {
            engine: self.engine,
            static_root: self.static_root,
            logger: self.logger,
        });

        for request in self.server.incoming_requests() {
            if shutdown.as_ref().is_some_and(ShutdownSignal::is_requested) {
                response::respond_unavailable(request).ok();
                continue;
            }

            let handler = Arc::clone(&handler);
            pool.spawn(move || {
                if let Err(e) = handler.handle(request) {
                    log!(handler.logger; "serve"; "request error: {:#}", e);
                }
            });
        }

        Ok(())
    }
}

/// State shared by request workers.
struct Handler {
    engine: Arc<ReloadEngine>,
    static_root: PathBuf,
    logger: Arc<dyn Logger>,
}

impl Handler {
    fn handle(&self, request: Request) -> Result<()> {
        let config = self.engine.config();
        debug!(self.logger; "serve"; "{} {}", request.method(), request.url());

        match route(request.url(), config.static_route()) {
            Route::ReloadScript => {
                response::respond_reload_script(request, self.engine.is_hot_reload_enabled())
            }
            Route::Socket => socket::accept(request, &self.engine, Arc::clone(&self.logger)),
            Route::Render(name) => match self.engine.render(&name, &Value::Object(Map::new())) {
                Ok(body) => response::respond_html(request, body),
                Err(RenderError::NotFound(_)) => response::respond_not_found(request),
                Err(e) => {
                    log!(self.logger; "error"; "{}", crate::logger::error_chain(&e));
                    response::respond_render_error(request, &e)
                }
            },
            Route::Static(rel) => match path::resolve_path(&rel, &self.static_root) {
                Some(file) => response::respond_file(request, &file),
                None => response::respond_not_found(request),
            },
            Route::NotFound => response::respond_not_found(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{Read as _, Write as _};
    use std::net::{Ipv4Addr, TcpStream};
    use std::path::Path;
    use std::thread;
    use std::time::{Duration, Instant};

    use tempfile::TempDir;

    use super::*;
    use crate::ReloadSettings;
    use crate::logger::NullLogger;

    pub(super) const WAIT: Duration = Duration::from_secs(5);

    pub(super) fn append(path: &Path, content: &str) {
        let mut file = fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    pub(super) fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        done()
    }

    /// Engine plus dev server on an ephemeral port.
    pub(super) struct Served {
        _temp: TempDir,
        pub(super) css: PathBuf,
        rt: tokio::runtime::Runtime,
        pub(super) engine: Arc<ReloadEngine>,
        pub(super) addr: SocketAddr,
        http: Arc<Server>,
        serving: thread::JoinHandle<Result<()>>,
    }

    impl Served {
        pub(super) fn start() -> Self {
            let temp = TempDir::new().unwrap();
            let templates = temp.path().join("templates");
            let statics = temp.path().join("static");
            fs::create_dir_all(&templates).unwrap();
            fs::create_dir_all(&statics).unwrap();
            fs::write(
                templates.join("index.html"),
                "<html><head></head><body>{{ .title }}</body></html>",
            )
            .unwrap();
            fs::write(templates.join("broken.html"), "{{ template \"gone.html\" . }}").unwrap();
            let css = statics.join("app.css");
            fs::write(&css, "body {}").unwrap();

            let settings = ReloadSettings::new(format!("{}/*.html", templates.display()))
                .with_static_root(statics.display().to_string());
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();
            let engine = Arc::new(
                rt.block_on(ReloadEngine::start_with_logger(&settings, Arc::new(NullLogger)))
                    .unwrap(),
            );

            let server = DevServer::bind(
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                0,
                Arc::clone(&engine),
                Arc::new(NullLogger),
            )
            .unwrap();
            let addr = server.addr();
            let http = server.server();
            let serving = thread::spawn(move || server.run(None));

            Self {
                _temp: temp,
                css,
                rt,
                engine,
                addr,
                http,
                serving,
            }
        }

        /// Raw `GET`, returning the whole response.
        pub(super) fn get(&self, path: &str) -> String {
            let mut stream = TcpStream::connect(self.addr).unwrap();
            write!(stream, "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
                .unwrap();
            let mut reply = String::new();
            stream.read_to_string(&mut reply).unwrap();
            reply
        }

        pub(super) fn stop(self) {
            self.http.unblock();
            self.serving.join().unwrap().unwrap();
            self.rt.block_on(self.engine.stop());
        }
    }

    #[test]
    fn test_pages_render_without_data() {
        let served = Served::start();

        let reply = served.get("/");
        assert!(reply.starts_with("HTTP/1.1 200"), "{reply}");
        assert!(reply.contains("<body></body>"), "{reply}");
        assert!(reply.contains(RELOAD_SCRIPT_ROUTE));

        assert!(served.get("/nope.html").starts_with("HTTP/1.1 404"));
        served.stop();
    }

    #[test]
    fn test_render_error_page() {
        let served = Served::start();

        let reply = served.get("/broken.html");
        assert!(reply.starts_with("HTTP/1.1 500"), "{reply}");
        assert!(reply.contains("<h1>Render Error</h1>"));
        assert!(reply.contains("gone.html"));

        served.stop();
    }

    fn r(url: &str) -> Route {
        route(url, "/assets")
    }

    #[test]
    fn test_reload_routes() {
        assert_eq!(r("/hotreload/reload.js"), Route::ReloadScript);
        assert_eq!(r("/hotreload/reload.js?t=1"), Route::ReloadScript);
        assert_eq!(r("/hotreload/ws"), Route::Socket);
        assert_eq!(r("/hotreload/other"), Route::NotFound);
    }

    #[test]
    fn test_template_routes() {
        assert_eq!(r("/"), Route::Render("index.html".into()));
        assert_eq!(r("/about.html"), Route::Render("about.html".into()));
        assert_eq!(r("/my%20page.html#top"), Route::Render("my page.html".into()));
        // names are flat
        assert_eq!(r("/blog/post.html"), Route::NotFound);
        assert_eq!(r("/about"), Route::NotFound);
    }

    #[test]
    fn test_static_routes() {
        assert_eq!(r("/assets/css/app.css"), Route::Static("css/app.css".into()));
        assert_eq!(r("/assets"), Route::Static(String::new()));
        assert_eq!(r("/assetsx/app.css"), Route::NotFound);
        assert_eq!(r("/assets/page.html"), Route::Static("page.html".into()));
    }

    #[test]
    fn test_root_static_route_never_shadows_templates() {
        assert_eq!(route("/", "/"), Route::Render("index.html".into()));
        assert_eq!(route("/about.html", "/"), Route::Render("about.html".into()));
        assert_eq!(route("/css/app.css", "/"), Route::Static("css/app.css".into()));
    }
}
