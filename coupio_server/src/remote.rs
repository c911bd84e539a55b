use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

use coupio_core::events::{Notice, Reply, Request, ServerMessage};
use coupio_core::{CallError, Connection};

/// The engine-facing handle for one remote client: requests and notices go
/// out through the client's session channel, replies come back through a
/// dedicated queue owned by this handle.
pub struct RemoteConnection {
    outbound: UnboundedSender<ServerMessage>,
    replies: Mutex<UnboundedReceiver<Reply>>,
}

impl RemoteConnection {
    pub fn new(
        outbound: UnboundedSender<ServerMessage>,
        replies: UnboundedReceiver<Reply>,
    ) -> Self {
        RemoteConnection {
            outbound,
            replies: Mutex::new(replies),
        }
    }
}

#[async_trait]
impl Connection for RemoteConnection {
    async fn call(&self, request: Request, timeout: Duration) -> Result<Reply, CallError> {
        let mut replies = self.replies.lock().await;
        // answers to windows that have already closed are void
        while replies.try_recv().is_ok() {}

        self.outbound
            .send(ServerMessage::Request(request))
            .map_err(|_| CallError::Closed)?;

        match tokio::time::timeout(timeout, replies.recv()).await {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(CallError::Closed),
            Err(_) => Err(CallError::Timeout),
        }
    }

    fn notify(&self, notice: &Notice) {
        let _ = self.outbound.send(ServerMessage::Notice(notice.clone()));
    }
}
