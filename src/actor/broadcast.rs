//! Broadcast Actor
//!
//! Drains the update queue into the hub. When every queue sender is gone
//! (the fs worker stopped), remaining messages are still delivered, then
//! the hub is shut down so consumers see their channels close.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::debug;
use crate::logger::Logger;
use crate::reload::{BroadcastHub, UpdateMessage};

pub struct BroadcastActor {
    rx: mpsc::Receiver<UpdateMessage>,
    hub: Arc<BroadcastHub>,
    logger: Arc<dyn Logger>,
}

impl BroadcastActor {
    pub fn new(
        rx: mpsc::Receiver<UpdateMessage>,
        hub: Arc<BroadcastHub>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self { rx, hub, logger }
    }

    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            let delivered = self.hub.publish(&msg).await;
            debug!(self.logger; "hub"; "{} -> {} consumers", msg.path, delivered);
        }

        let closed = self.hub.shutdown();
        debug!(self.logger; "hub"; "publish worker stopped ({} consumers closed)", closed);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::logger::NullLogger;
    use crate::reload::{ConsumerRegistry, HubError};

    #[tokio::test]
    async fn test_drains_queue_then_shuts_hub() {
        let hub = Arc::new(BroadcastHub::new(
            Arc::new(ConsumerRegistry::new()),
            8,
            Duration::from_millis(100),
            Arc::new(NullLogger),
        ));
        let (mut sub, _handle) = hub.subscribe().unwrap();

        let (tx, rx) = mpsc::channel(8);
        tx.send(UpdateMessage::new("./static/a.css", true)).await.unwrap();
        tx.send(UpdateMessage::new("./static/b.css", true)).await.unwrap();
        drop(tx);

        BroadcastActor::new(rx, Arc::clone(&hub), Arc::new(NullLogger))
            .run()
            .await;

        assert_eq!(sub.recv().await.unwrap().path, "./static/a.css");
        assert_eq!(sub.recv().await.unwrap().path, "./static/b.css");
        assert_eq!(sub.recv().await, None);
        assert!(matches!(hub.subscribe(), Err(HubError::Closed)));
    }
}
