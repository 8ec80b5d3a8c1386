//! WebSocket endpoint: one writer thread per connected browser.

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use tiny_http::{Request, Response, StatusCode};
use tungstenite::WebSocket;
use tungstenite::handshake::derive_accept_key;
use tungstenite::protocol::{Message, Role};

use super::response::{make_header, respond_bad_request, respond_unavailable};
use crate::actor::ReloadEngine;
use crate::logger::Logger;
use crate::debug;

/// Upgrade `request` and stream update messages to it until the
/// subscription ends or a write fails.
pub fn accept(request: Request, engine: &ReloadEngine, logger: Arc<dyn Logger>) -> Result<()> {
    let Some(key) = header_value(&request, "Sec-WebSocket-Key") else {
        return respond_bad_request(request);
    };

    let (mut subscription, handle) = match engine.subscribe() {
        Ok(pair) => pair,
        Err(e) => {
            debug!(logger; "ws"; "refusing client: {}", e);
            return respond_unavailable(request);
        }
    };

    let response = Response::new_empty(StatusCode(101))
        .with_header(make_header("Upgrade", "websocket")?)
        .with_header(make_header("Connection", "Upgrade")?)
        .with_header(make_header(
            "Sec-WebSocket-Accept",
            &derive_accept_key(key.as_bytes()),
        )?);
    let stream = request.upgrade("websocket", response);
    let mut ws = WebSocket::from_raw_socket(stream, Role::Server, None);

    let key = subscription.key();
    debug!(logger; "ws"; "{} connected", key);

    // blocking_recv must stay off the runtime threads
    thread::Builder::new()
        .name(format!("ws-{key}"))
        .spawn(move || {
            while let Some(msg) = subscription.blocking_recv() {
                if let Err(e) = ws.send(Message::Text(msg.to_json().into())) {
                    debug!(logger; "ws"; "{} disconnected: {}", key, e);
                    break;
                }
            }
            handle.release();
            if let Err(e) = ws.close(None).and_then(|()| ws.flush()) {
                debug!(logger; "ws"; "{} close: {}", key, e);
            }
            debug!(logger; "ws"; "{} closed", key);
        })
        .context("failed to spawn socket writer")?;

    Ok(())
}

fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.to_string())
}

#[cfg(test)]
mod tests {
    use std::net::TcpStream;
    use std::time::{Duration, Instant};

    use tungstenite::stream::MaybeTlsStream;

    use super::*;
    use crate::reload::UpdateMessage;
    use crate::serve::tests::{Served, WAIT, append, wait_until};

    type Client = WebSocket<MaybeTlsStream<TcpStream>>;

    /// Read frames until an update for `file` arrives.
    fn read_update(client: &mut Client, file: &str) -> UpdateMessage {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            match client.read() {
                Ok(Message::Text(text)) => {
                    let msg = UpdateMessage::from_json(text.as_str()).unwrap();
                    if msg.path.ends_with(file) {
                        return msg;
                    }
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) => {}
                Err(e) => panic!("socket failed: {e}"),
            }
        }
        panic!("no update for {file}");
    }

    #[test]
    fn test_writer_streams_updates_and_releases_on_failure() {
        let served = Served::start();
        let engine = Arc::clone(&served.engine);

        let (mut client, response) =
            tungstenite::connect(format!("ws://{}/hotreload/ws", served.addr)).unwrap();
        assert_eq!(response.status().as_u16(), 101);
        if let MaybeTlsStream::Plain(stream) = client.get_ref() {
            stream.set_read_timeout(Some(Duration::from_millis(100))).unwrap();
        }
        assert!(wait_until(|| engine.consumer_count() == 1));

        append(&served.css, "a {}");
        let msg = read_update(&mut client, "app.css");
        assert!(msg.auto_reload);

        // the writer notices the dead peer on a later send
        drop(client);
        let released = wait_until(|| {
            append(&served.css, "p {}");
            thread::sleep(Duration::from_millis(80));
            engine.consumer_count() == 0
        });
        assert!(released, "subscription outlived its socket");

        served.stop();
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let served = Served::start();

        let reply = served.get("/hotreload/ws");
        assert!(reply.starts_with("HTTP/1.1 400"), "{reply}");
        assert_eq!(served.engine.consumer_count(), 0);

        served.stop();
    }
}
