use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

use tramite_client::{ApprovalsApi, InMemoryBackend, ProfileStorage, RestClient, SessionStore};
use tramite_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig};
use tramite_core::User;
use tramite_sync::AuthFlow;

/// Everything a command needs: the effective config, the (restored) session,
/// and the backend seam - real REST client by default, the in-process
/// backend under `--offline` (ephemeral, for smoke runs).
pub struct AppContext {
    pub config: AppConfig,
    pub session: SessionStore,
    pub api: Arc<dyn ApprovalsApi>,
    pub offline: bool,
}

impl AppContext {
    pub fn init(
        config_path: Option<PathBuf>,
        overrides: ConfigOverrides,
        offline: bool,
    ) -> anyhow::Result<Self> {
        let config = AppConfig::load(LoadOptions {
            config_path,
            require_file: false,
            overrides,
        })
        .context("configuration did not load")?;

        init_tracing(&config.logging);

        let storage = ProfileStorage::new(config.storage.dir.clone());
        let session = SessionStore::new(storage);
        session.restore();

        let api: Arc<dyn ApprovalsApi> = if offline {
            Arc::new(InMemoryBackend::new())
        } else {
            Arc::new(
                RestClient::new(&config.api, session.clone())
                    .context("backend client did not initialize")?,
            )
        };

        Ok(Self { config, session, api, offline })
    }

    pub fn auth_flow(&self) -> AuthFlow {
        AuthFlow::new(self.api.clone(), self.session.clone())
    }

    /// The authenticated user, or the message to print instead.
    pub fn require_user(&self) -> Result<User, String> {
        self.session
            .current_user()
            .ok_or_else(|| "no active session; run `tramite login` first".to_owned())
    }

    /// The authenticated user with a chosen role; an unset role blocks every
    /// workflow action until the role-selection step has run.
    pub fn require_workflow_user(&self) -> Result<User, String> {
        let user = self.require_user()?;
        if !user.role.is_set() {
            return Err(
                "your role is not set yet; run `tramite role <requester|approver>`".to_owned()
            );
        }
        Ok(user)
    }
}

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    // A second init (tests, repeated embedding) keeps the first subscriber.
    let _ = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
