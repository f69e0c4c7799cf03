//! Process-wide map of bound sessions, keyed by system_id. The SMPP
//! listener registers and unregisters; HTTP handlers look sessions up to
//! inject deliveries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::error;

use crate::session::Session;

/// Registry of live sessions. A new bind under an existing name replaces
/// the entry; the replaced session stays alive until its own connection
/// closes.
#[derive(Default)]
pub struct Registry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, session: Arc<Session>) {
        let mut sessions = self.sessions.lock().expect("registry poisoned");
        sessions.insert(name.to_owned(), session);
    }

    /// Removes the entry only if it still points at `session`: a bind that
    /// replaced us must not be unregistered by our own cleanup.
    pub fn unregister(&self, name: &str, session: &Arc<Session>) {
        let mut sessions = self.sessions.lock().expect("registry poisoned");
        if let Some(current) = sessions.get(name) {
            if Arc::ptr_eq(current, session) {
                sessions.remove(name);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Session>> {
        let sessions = self.sessions.lock().expect("registry poisoned");
        sessions.get(name).cloned()
    }

    /// Closes every session. Entries are left in place: each close makes
    /// the session's Listen loop exit, which unregisters it.
    pub async fn stop(&self) {
        tracing::info!("gracefully stopping");

        let sessions: Vec<(String, Arc<Session>)> = {
            let sessions = self.sessions.lock().expect("registry poisoned");
            sessions
                .iter()
                .map(|(name, session)| (name.clone(), Arc::clone(session)))
                .collect()
        };

        for (name, session) in sessions {
            if let Err(e) = session.close().await {
                error!("could not close the session {name}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection;

    async fn dummy_session(name: &str) -> Arc<Session> {
        // A session needs a write half; a loopback socket pair provides one.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, _server) = tokio::join!(
            tokio::net::TcpStream::connect(addr),
            listener.accept()
        );
        let (_reader, writer) = connection::split(client.unwrap());
        Arc::new(Session::new(writer, name))
    }

    #[tokio::test]
    async fn register_lookup_unregister() {
        let registry = Registry::new();
        let session = dummy_session("kannel").await;

        registry.register("kannel", Arc::clone(&session));
        assert!(registry.get("kannel").is_some());
        assert!(registry.get("other").is_none());

        registry.unregister("kannel", &session);
        assert!(registry.get("kannel").is_none());
    }

    #[tokio::test]
    async fn rebind_replaces_and_cleanup_keeps_replacement() {
        let registry = Registry::new();
        let first = dummy_session("kannel").await;
        let second = dummy_session("kannel").await;

        registry.register("kannel", Arc::clone(&first));
        registry.register("kannel", Arc::clone(&second));

        // The first session's cleanup must not drop the newer bind.
        registry.unregister("kannel", &first);
        let current = registry.get("kannel").expect("replacement still registered");
        assert!(Arc::ptr_eq(&current, &second));
    }
}
