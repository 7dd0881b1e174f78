//! Client registry: live connections and their outbound channels.
//!
//! Each admitted connection gets a fresh `ClientId` and is stored with its
//! verified identity and the sender half of its outbound queue. The socket
//! task owns the receiver; dropping the registry entry closes nothing on
//! its own, it only stops further deliveries.

use std::collections::HashMap;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::frame::ServerFrame;
use crate::services::auth::Identity;
use crate::services::rooms::ClientId;

#[derive(Debug, Clone)]
pub struct ConnectedClient {
    pub identity: Identity,
    pub tx: mpsc::Sender<ServerFrame>,
}

#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, ConnectedClient>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under a new id.
    pub fn register(&mut self, identity: Identity, tx: mpsc::Sender<ServerFrame>) -> ClientId {
        let client_id = Uuid::new_v4();
        self.clients.insert(client_id, ConnectedClient { identity, tx });
        client_id
    }

    pub fn unregister(&mut self, client_id: ClientId) -> Option<ConnectedClient> {
        self.clients.remove(&client_id)
    }

    #[must_use]
    pub fn get(&self, client_id: ClientId) -> Option<&ConnectedClient> {
        self.clients.get(&client_id)
    }

    #[must_use]
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.clients.contains_key(&client_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClientId, &ConnectedClient)> {
        self.clients.iter()
    }
}
