/// Application context
///
/// Wires the gateway, session manager and task store together over one
/// persisted session. The session state is created first, the gateway is
/// given a [`SessionHandle`] onto it, and the managers share the gateway.
///
/// # Example
///
/// ```no_run
/// use taskdeck_client::{app::AppContext, config::ClientConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = ClientConfig::from_env()?;
/// let app = AppContext::from_config(config)?;
///
/// app.session.restore().await;
/// if app.session.is_authenticated() {
///     app.tasks.refresh().await;
/// }
/// # Ok(())
/// # }
/// ```

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::gateway::Gateway;
use crate::session::{SessionHandle, SessionManager};
use crate::tasks::TaskStore;
use std::sync::Arc;
use taskdeck_shared::storage::{FileStore, KeyValueStore, SessionStore};

/// Shared application context
///
/// Uses Arc internally for cheap cloning.
#[derive(Clone, Debug)]
pub struct AppContext {
    /// Client configuration
    pub config: Arc<ClientConfig>,

    /// Outbound HTTP client
    pub gateway: Gateway,

    /// Current user and credential
    pub session: SessionManager,

    /// Current page of tasks
    pub tasks: TaskStore,
}

impl AppContext {
    /// Creates the context over an arbitrary storage backend
    pub fn new(config: ClientConfig, backend: Arc<dyn KeyValueStore>) -> ClientResult<Self> {
        let handle = SessionHandle::new(SessionStore::new(backend));
        let gateway = Gateway::new(&config, handle.clone())?;
        let session = SessionManager::new(handle, gateway.clone());
        let tasks = TaskStore::new(gateway.clone());

        Ok(Self {
            config: Arc::new(config),
            gateway,
            session,
            tasks,
        })
    }

    /// Creates the context with the session persisted to the configured file
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        let backend = Arc::new(FileStore::new(&config.storage.session_file));
        Self::new(config, backend)
    }
}
