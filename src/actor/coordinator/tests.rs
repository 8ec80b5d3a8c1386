use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::time::timeout;

use super::*;
use crate::logger::NullLogger;
use crate::reload::UpdateMessage;

const WAIT: Duration = Duration::from_secs(5);

struct Site {
    _temp: TempDir,
    templates: PathBuf,
    statics: PathBuf,
}

impl Site {
    fn new() -> Self {
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
        fs::write(statics.join("app.css"), "body {}").unwrap();
        Self {
            _temp: temp,
            templates,
            statics,
        }
    }

    fn settings(&self) -> ReloadSettings {
        ReloadSettings::new(format!("{}/*.html", self.templates.display()))
            .with_static_root(self.statics.display().to_string())
    }

    async fn start(&self) -> ReloadEngine {
        ReloadEngine::start_with_logger(&self.settings(), Arc::new(NullLogger))
            .await
            .unwrap()
    }
}

fn append(path: &Path, content: &str) {
    let mut file = fs::OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

fn page(engine: &ReloadEngine) -> String {
    engine.render("index.html", &json!({"title": "T"})).unwrap()
}

/// Receive until a message for `path` arrives.
async fn recv_for(sub: &mut Subscription, path: &Path) -> UpdateMessage {
    let expected = path.display().to_string();
    timeout(WAIT, async {
        loop {
            let msg = sub.recv().await.expect("subscription closed");
            if msg.path == expected {
                return msg;
            }
        }
    })
    .await
    .expect("no update message")
}

#[tokio::test]
async fn test_initial_render_has_reload_script() {
    let site = Site::new();
    let engine = site.start().await;

    assert_eq!(
        page(&engine),
        r#"<html><head><script src="/hotreload/reload.js"></script></head><body>T</body></html>"#
    );
    assert_eq!(engine.template_names(), ["index.html"]);
    assert!(engine.is_hot_reload_enabled());
    assert!(engine.is_auto_reload_enabled());
    engine.stop().await;
}

#[tokio::test]
async fn test_template_write_reaches_consumer_and_render() {
    let site = Site::new();
    let engine = site.start().await;
    let (mut sub, _handle) = engine.subscribe().unwrap();

    let path = site.templates.join("index.html");
    append(&path, "<footer>v2</footer>");

    let msg = recv_for(&mut sub, &path).await;
    assert!(msg.auto_reload);
    assert!(page(&engine).ends_with("<footer>v2</footer>"));

    engine.stop().await;
}

#[tokio::test]
async fn test_static_write_reaches_every_consumer() {
    let site = Site::new();
    let engine = site.start().await;
    let (mut a, _ha) = engine.subscribe().unwrap();
    let (mut b, _hb) = engine.subscribe().unwrap();
    assert_eq!(engine.consumer_count(), 2);

    let css = site.statics.join("app.css");
    append(&css, "p {}");

    recv_for(&mut a, &css).await;
    recv_for(&mut b, &css).await;
    engine.stop().await;
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_templates() {
    let site = Site::new();
    let engine = site.start().await;
    let (mut sub, _handle) = engine.subscribe().unwrap();
    let before = page(&engine);

    let path = site.templates.join("index.html");
    append(&path, "{{ range .items }}");

    // the change is still announced
    recv_for(&mut sub, &path).await;
    assert_eq!(page(&engine), before);

    engine.stop().await;
}

#[tokio::test]
async fn test_auto_reload_flag_is_carried() {
    let site = Site::new();
    let settings = site.settings().with_auto_reload(false).with_hot_reload(false);
    let engine = ReloadEngine::start_with_logger(&settings, Arc::new(NullLogger))
        .await
        .unwrap();
    assert!(!engine.is_hot_reload_enabled());

    let (mut sub, _handle) = engine.subscribe().unwrap();
    let css = site.statics.join("app.css");
    append(&css, "a {}");

    assert!(!recv_for(&mut sub, &css).await.auto_reload);
    engine.stop().await;
}

#[tokio::test]
async fn test_released_consumer_stops_receiving() {
    let site = Site::new();
    let engine = site.start().await;
    let (mut kept, _kept_handle) = engine.subscribe().unwrap();
    let (mut gone, handle) = engine.subscribe().unwrap();

    handle.release();
    assert_eq!(engine.consumer_count(), 1);
    assert_eq!(gone.recv().await, None);

    let css = site.statics.join("app.css");
    append(&css, "x");
    recv_for(&mut kept, &css).await;

    engine.stop().await;
}

#[tokio::test]
async fn test_stop_closes_consumers_and_is_idempotent() {
    let site = Site::new();
    let engine = site.start().await;
    let (mut sub, handle) = engine.subscribe().unwrap();

    engine.stop().await;
    assert!(!engine.is_running());
    assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), None);
    assert!(matches!(engine.subscribe(), Err(HubError::Closed)));

    // release after stop and a second stop are both no-ops
    handle.release();
    engine.stop().await;

    // rendering keeps working on the last set
    assert!(page(&engine).contains("T"));
}

#[tokio::test]
async fn test_start_errors() {
    let site = Site::new();

    let err = ReloadEngine::start_with_logger(&ReloadSettings::default(), Arc::new(NullLogger))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::Config(ConfigError::MissingTemplateGlob)));

    fs::write(site.templates.join("broken.html"), "{{ if .x }}").unwrap();
    let err = ReloadEngine::start_with_logger(&site.settings(), Arc::new(NullLogger))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::Compile(CompileError::Parse { .. })));
    fs::remove_file(site.templates.join("broken.html")).unwrap();

    let settings = site.settings().with_static_root(format!("{}/missing", site.statics.display()));
    let err = ReloadEngine::start_with_logger(&settings, Arc::new(NullLogger))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::Watch(WatchError::Register { .. })));
}
