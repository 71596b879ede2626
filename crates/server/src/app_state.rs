use std::path::PathBuf;

use server_api::ApiContext;
use shared::protocol::ServerEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) events: broadcast::Sender<ServerEvent>,
    pub(crate) static_dir: PathBuf,
}

impl AppState {
    pub(crate) fn publish(&self, events: Vec<ServerEvent>) {
        for event in events {
            // No subscribers is fine; events are best effort.
            let _ = self.events.send(event);
        }
    }
}
