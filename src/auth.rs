//! API key selection and the one-time authorization step
//!
//! Before the first dialogue request the binary asks a [`KeySelector`]
//! whether a key is available, and if not, asks it to obtain one. The
//! config-backed selector prompts on stdin and remembers the key in
//! `config.toml`, editing the file with `toml_edit` so existing content and
//! comments survive.

use crate::relay::{RelayKind, RelayLog};
use crate::{Result, SrishtiConfig, SrishtiError};
use futures::future::BoxFuture;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock as StdRwLock};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Relay text after a successful authorization
pub const AUTHENTICATED_NOTICE: &str =
    "Neural link authenticated. Initializing Dual-Brain protocols.";

/// Something able to report and obtain an API key
pub trait KeySelector: Send + Sync {
    fn has_selected_key(&self) -> BoxFuture<'_, Result<bool>>;

    fn open_select_key(&self) -> BoxFuture<'_, Result<()>>;
}

/// What to do when authorization fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPolicy {
    /// Log and continue; requests will surface the failure later
    #[default]
    Lenient,
    /// Fail startup
    Strict,
}

impl AuthPolicy {
    pub fn from_config(config: &SrishtiConfig) -> Self {
        if config.strict_auth {
            AuthPolicy::Strict
        } else {
            AuthPolicy::Lenient
        }
    }
}

/// Result of `authorize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    /// Selection failed under the lenient policy
    Unverified,
}

/// Run the authorization step once
pub async fn authorize(
    selector: &dyn KeySelector,
    policy: AuthPolicy,
    relay: &RwLock<RelayLog>,
) -> Result<AuthOutcome> {
    let selected = async {
        if !selector.has_selected_key().await? {
            selector.open_select_key().await?;
        }
        Ok::<(), SrishtiError>(())
    }
    .await;

    match selected {
        Ok(()) => {
            relay
                .write()
                .await
                .push(RelayKind::Security, AUTHENTICATED_NOTICE);
            info!("API key selected");
            Ok(AuthOutcome::Authenticated)
        }
        Err(e) => match policy {
            AuthPolicy::Lenient => {
                warn!("Key selection failed, continuing without verification: {}", e);
                Ok(AuthOutcome::Unverified)
            }
            AuthPolicy::Strict => Err(e),
        },
    }
}

/// Blocking source of a typed-in key
pub type KeyReader = Arc<dyn Fn() -> io::Result<String> + Send + Sync>;

/// Key selector backed by config/env, prompting on stdin when no key is set
pub struct ConfigKeySelector {
    home: PathBuf,
    key: StdRwLock<Option<String>>,
    reader: KeyReader,
}

impl ConfigKeySelector {
    pub fn new(config: &SrishtiConfig) -> Self {
        Self::with_reader(config, Arc::new(prompt_for_key))
    }

    /// Selector reading a key from `reader` instead of the terminal
    pub fn with_reader(config: &SrishtiConfig, reader: KeyReader) -> Self {
        Self {
            home: config.home.clone(),
            key: StdRwLock::new(config.api_key.clone().filter(|k| !k.trim().is_empty())),
            reader,
        }
    }

    /// The key currently selected, if any
    pub fn selected_key(&self) -> Option<String> {
        self.key.read().ok().and_then(|k| k.clone())
    }

    async fn select(&self) -> Result<()> {
        let reader = self.reader.clone();
        let entered = tokio::task::spawn_blocking(move || reader())
            .await
            .map_err(|e| SrishtiError::Auth(format!("key prompt aborted: {e}")))??;

        let key = entered.trim().to_string();
        if key.is_empty() {
            return Err(SrishtiError::Auth("no API key entered".to_string()));
        }

        let home = self.home.clone();
        let to_store = key.clone();
        tokio::task::spawn_blocking(move || remember_key(&home, &to_store))
            .await
            .map_err(|e| SrishtiError::Auth(format!("saving key aborted: {e}")))??;

        if let Ok(mut slot) = self.key.write() {
            *slot = Some(key);
        }
        Ok(())
    }
}

impl KeySelector for ConfigKeySelector {
    fn has_selected_key(&self) -> BoxFuture<'_, Result<bool>> {
        let selected = self.selected_key().is_some();
        Box::pin(async move { Ok(selected) })
    }

    fn open_select_key(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.select())
    }
}

/// Prompt on stderr, read one line from stdin
fn prompt_for_key() -> io::Result<String> {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    writeln!(out)?;
    writeln!(out, "  No Gemini API key found.")?;
    writeln!(
        out,
        "  Set {} or paste a key below (it will be saved to config.toml).",
        crate::config::API_KEY_ENV
    )?;
    writeln!(out)?;
    write!(out, "  API key: ")?;
    out.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input)
}

/// Write `api_key` into `<home>/config.toml`, keeping everything else intact
pub fn remember_key(home: &Path, api_key: &str) -> Result<()> {
    let config_path = home.join("config.toml");
    std::fs::create_dir_all(home)?;

    let existing = if config_path.exists() {
        std::fs::read_to_string(&config_path)?
    } else {
        String::new()
    };

    let mut doc: toml_edit::DocumentMut = existing.parse()?;
    doc["api_key"] = toml_edit::value(api_key);
    std::fs::write(&config_path, doc.to_string())?;

    info!("Saved API key to {}", config_path.display());
    Ok(())
}
