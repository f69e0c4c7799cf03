//! SMPP listener: accepts TCP connections, performs the bind handshake,
//! then hands the connection to a [`Session`] and its dispatch loop.

use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::connection;
use crate::datatypes::{Bind, BindResponse, CommandStatus};
use crate::frame::Frame;
use crate::registry::Registry;
use crate::session::Session;

/// The SMSC-side SMPP v3.4 server.
pub struct SmppServer {
    listener: TcpListener,
    registry: Arc<Registry>,
    credentials: Credentials,
}

/// Bind-time expectations. Empty username or password disables that check.
#[derive(Clone)]
struct Credentials {
    system_id: String,
    username: String,
    password: String,
}

impl SmppServer {
    /// Binds the listening socket. Failing to bind is fatal for the
    /// process, so the error is surfaced instead of retried.
    pub async fn bind(config: &Config, registry: Arc<Registry>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.smpp_addr).await?;
        info!("listening SMPP on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            registry,
            credentials: Credentials {
                system_id: config.system_id.clone(),
                username: config.username.clone(),
                password: config.password.clone(),
            },
        })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop; runs until the task is aborted.
    pub async fn run(self) {
        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("smpp accept: {e}");
                    continue;
                }
            };

            let registry = Arc::clone(&self.registry);
            let credentials = self.credentials.clone();
            tokio::spawn(async move {
                handle_connection(socket, registry, credentials).await;
                info!(%peer, "connection finished");
            });
        }
    }
}

async fn handle_connection(socket: TcpStream, registry: Arc<Registry>, credentials: Credentials) {
    enable_keepalive(&socket);
    let (mut reader, writer) = connection::split(socket);

    // The very first PDU must be a bind; anything else closes the socket.
    let bind = match reader.read_frame().await {
        Ok(Some(Frame::Bind(bind))) => bind,
        Ok(Some(other)) => {
            error!("authentication: unexpected {}, want bind", other.command_name());
            return;
        }
        Ok(None) => {
            info!("session closed before bind");
            return;
        }
        Err(e) => {
            error!("pdu decode: {e}");
            return;
        }
    };

    let session = Arc::new(Session::new(writer, &bind.system_id));

    if let Err(status) = authenticate(&bind, &credentials) {
        error!(system_id = %bind.system_id, "authentication: {status}");
        let resp = BindResponse::error(bind.kind, bind.sequence_number, status);
        let _ = session.write(&Frame::BindResp(resp)).await;
        return;
    }

    let resp = BindResponse::ok(bind.kind, bind.sequence_number, &credentials.system_id);
    if let Err(e) = session.write(&Frame::BindResp(resp)).await {
        error!(system_id = %bind.system_id, "bind response: {e}");
        return;
    }
    session.set_active();

    let name = bind.system_id.clone();
    registry.register(&name, Arc::clone(&session));
    info!(session = %name, "session opened");

    Arc::clone(&session).listen(reader).await;

    registry.unregister(&name, &session);
}

/// Credential checks per the bind contract: system_id and password must be
/// present, and each must match its configured expectation when one is
/// set. Failures are reported to the ESME in the bind response status.
fn authenticate(bind: &Bind, credentials: &Credentials) -> Result<(), CommandStatus> {
    if bind.system_id.is_empty() {
        return Err(CommandStatus::InvalidSystemId);
    }
    let Some(password) = bind.password.as_deref() else {
        return Err(CommandStatus::InvalidPassword);
    };

    if !credentials.username.is_empty() && bind.system_id != credentials.username {
        return Err(CommandStatus::InvalidSystemId);
    }
    if !credentials.password.is_empty() && password != credentials.password {
        return Err(CommandStatus::InvalidPassword);
    }

    Ok(())
}

fn enable_keepalive(socket: &TcpStream) {
    let sock = socket2::SockRef::from(socket);
    if let Err(e) = sock.set_tcp_keepalive(&socket2::TcpKeepalive::new()) {
        warn!("tcp keepalive: {e}");
    }
}
