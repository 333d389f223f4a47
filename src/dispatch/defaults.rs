//! Receivers installed on every connection.

use super::Dispatcher;
use crate::protocol::{exception_name, Recv, RecvId};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Versions reported by the engine when the connection opened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub application_name: String,
    pub application_version: (u32, u32),
    pub application_build: (u32, u32),
    pub protocol_version: (u32, u32),
    pub protocol_build: (u32, u32),
}

/// Connection-wide state maintained by the default receivers.
#[derive(Debug, Default)]
pub struct SessionState {
    server_info: RwLock<Option<ServerInfo>>,
    quit: AtomicBool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server_info(&self) -> Option<ServerInfo> {
        self.server_info.read().clone()
    }

    /// Whether the engine announced that it is shutting down.
    pub fn has_quit(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }
}

/// Install the `Exception`, `Open` and `Quit` receivers.
pub fn install_default_receivers(dispatcher: &mut Dispatcher, session: Arc<SessionState>) {
    dispatcher.add_receiver(RecvId::Exception, |message| {
        if let Recv::Exception(exception) = &message.body {
            warn!(
                "exception {}({}), send id {}, index {}",
                exception_name(exception.exception).unwrap_or("<unknown>"),
                exception.exception,
                exception.send_id,
                exception.index
            );
        }
        Ok(true)
    });

    let open_session = Arc::clone(&session);
    dispatcher.add_receiver(RecvId::Open, move |message| {
        if let Recv::Open(open) = &message.body {
            info!(
                "Open: App {} v{}.{} build {}.{} protocol: v{}.{} build {}.{}",
                open.application_name,
                open.application_version.0,
                open.application_version.1,
                open.application_build.0,
                open.application_build.1,
                open.protocol_version.0,
                open.protocol_version.1,
                open.protocol_build.0,
                open.protocol_build.1
            );
            *open_session.server_info.write() = Some(ServerInfo {
                application_name: open.application_name.clone(),
                application_version: open.application_version,
                application_build: open.application_build,
                protocol_version: open.protocol_version,
                protocol_build: open.protocol_build,
            });
        }
        Ok(true)
    });

    dispatcher.add_receiver(RecvId::Quit, move |_| {
        info!("engine is shutting down");
        session.quit.store(true, Ordering::SeqCst);
        Ok(true)
    });
}
