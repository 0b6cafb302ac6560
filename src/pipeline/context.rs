//! Everything the players of one host loop share.

use super::config::PlayerConfig;
use super::events::PlayerEvents;
use super::player::Player;
use crate::codec::MediaBackend;
use crate::mailbox::{MailboxContext, WakeSource};
use crate::registry::StreamRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// One host loop's mailbox, worker registry, media backend and defaults.
pub struct HostContext {
    mailbox: Arc<MailboxContext>,
    registry: Arc<StreamRegistry>,
    backend: Arc<dyn MediaBackend>,
    config: PlayerConfig,
}

impl HostContext {
    /// Create a context that wakes its host loop through `wake`.
    pub fn new(wake: Arc<dyn WakeSource>, backend: Arc<dyn MediaBackend>) -> Self {
        Self::with_config(wake, backend, PlayerConfig::default())
    }

    /// Create a context whose players start from `config`.
    pub fn with_config(
        wake: Arc<dyn WakeSource>,
        backend: Arc<dyn MediaBackend>,
        config: PlayerConfig,
    ) -> Self {
        Self {
            mailbox: MailboxContext::new(wake),
            registry: Arc::new(StreamRegistry::new()),
            backend,
            config,
        }
    }

    /// A new idle player delivering its signals to `events`.
    pub fn player<E>(&self, events: E) -> Player
    where
        E: PlayerEvents + 'static,
    {
        Player::new(
            &self.mailbox,
            self.registry.clone(),
            self.backend.clone(),
            self.config.clone(),
            events,
        )
    }

    /// The mailbox players signal through.
    pub fn mailbox(&self) -> &Arc<MailboxContext> {
        &self.mailbox
    }

    /// The registry of live workers.
    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    /// Default player configuration.
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Join every worker. Call after destroying every player.
    pub fn shutdown(&self) {
        info!(workers = self.registry.len(), "joining stream workers");
        self.registry.wait_all();
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}
