use std::{
    env::{self, VarError},
    fs::File,
    path::PathBuf,
    time::Duration,
};

use platform_dirs::AppDirs;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{AuthClient, Authenticator, SharedSecret},
    cache::{LocalStore, LocalStoreHandle},
    caption::CaptionClient,
    error::Error,
    remote::SheetStore,
    util::{default_ureq_agent, mkdir_if_not_exists},
};

const APP_NAME: &str = "Arsip";
const CONFIG_FILENAME: &str = "config.json";
const PROXY_ENV_VAR: &str = "HTTPS_PROXY";
const STORE_URL_ENV_VAR: &str = "ARSIP_STORE_URL";
const AUTH_URL_ENV_VAR: &str = "ARSIP_AUTH_URL";
const CAPTION_URL_ENV_VAR: &str = "ARSIP_CAPTION_URL";

const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Spreadsheet web-app endpoint.
    pub store_url: String,
    /// Without one, the password is checked locally.
    pub auth_url: Option<String>,
    pub caption_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            auth_url: None,
            caption_url: None,
            cache_dir: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    fn app_dirs() -> Option<AppDirs> {
        const USE_XDG_ON_MACOS: bool = false;

        AppDirs::new(Some(APP_NAME), USE_XDG_ON_MACOS)
    }

    pub fn config_dir() -> Option<PathBuf> {
        Self::app_dirs().map(|dirs| dirs.config_dir)
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(CONFIG_FILENAME))
    }

    /// Read `config.json` from the platform config dir, `None` if there is
    /// none yet.
    pub fn load() -> Result<Option<Config>, Error> {
        let path = Self::config_path()
            .ok_or_else(|| Error::ConfigError("no config directory".into()))?;
        match File::open(&path) {
            Ok(file) => {
                log::info!("loading config: {:?}", &path);
                Ok(Some(serde_json::from_reader(file)?))
            }
            Err(_) => Ok(None),
        }
    }

    /// Saved config (or defaults) with environment overrides applied.
    pub fn load_or_default() -> Result<Config, Error> {
        let config = Self::load()?.unwrap_or_default();
        Ok(config.with_overrides(env_var))
    }

    pub fn save(&self) -> Result<(), Error> {
        let dir = Self::config_dir()
            .ok_or_else(|| Error::ConfigError("no config directory".into()))?;
        mkdir_if_not_exists(&dir)?;
        let file = File::create(dir.join(CONFIG_FILENAME))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Endpoint URLs from `var` win over the saved ones.
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var(STORE_URL_ENV_VAR) {
            self.store_url = url;
        }
        if let Some(url) = var(AUTH_URL_ENV_VAR) {
            self.auth_url = Some(url);
        }
        if let Some(url) = var(CAPTION_URL_ENV_VAR) {
            self.caption_url = Some(url);
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn proxy(&self) -> Option<String> {
        env_var(PROXY_ENV_VAR)
    }

    pub fn local_store_dir(&self) -> Result<PathBuf, Error> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::app_dirs()
                .map(|dirs| dirs.cache_dir)
                .ok_or_else(|| Error::ConfigError("no cache directory".into())),
        }
    }

    pub fn local_store(&self) -> Result<LocalStoreHandle, Error> {
        LocalStore::open(self.local_store_dir()?)
    }

    pub fn remote_store(&self) -> Result<SheetStore, Error> {
        if self.store_url.trim().is_empty() {
            return Err(Error::ConfigError(format!(
                "store URL is not set, use {STORE_URL_ENV_VAR} or {CONFIG_FILENAME}"
            )));
        }
        let agent = default_ureq_agent(self.proxy().as_deref(), self.timeout());
        Ok(SheetStore::new(agent, self.store_url.trim()))
    }

    pub fn authenticator(&self) -> Box<dyn Authenticator> {
        match &self.auth_url {
            Some(url) => Box::new(AuthClient::new(
                url.as_str(),
                self.proxy().as_deref(),
                self.timeout(),
            )),
            None => Box::new(SharedSecret::from_env()),
        }
    }

    pub fn caption_client(&self) -> Option<CaptionClient> {
        self.caption_url
            .as_ref()
            .map(|url| CaptionClient::new(url.as_str(), self.proxy().as_deref(), self.timeout()))
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).map_or_else(
        |err| match err {
            VarError::NotPresent => None,
            VarError::NotUnicode(_) => {
                log::error!("{} is not valid unicode", name);
                None
            }
        },
        |value| Some(value).filter(|value| !value.is_empty()),
    )
}
