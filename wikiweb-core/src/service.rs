//! The wiki service: registry of webs, system setup and persistence.
//!
//! Every operation on a web goes through the service, which routes it to the
//! web by address and persists the web afterwards. Locks are always taken in
//! the order system state, registry, web.

use crate::config::Config;
use crate::error::{Result, WikiError};
use crate::models::{Author, Revision};
use crate::page::{Edit, Page};
use crate::search::SearchEngine;
use crate::storage::{JsonFileStorage, NoPersistence, Storage, StorageError, SystemState};
use crate::web::{Web, WebSettings};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type SharedWeb = Arc<RwLock<Web>>;

/// Changes to apply to a web; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct WebSettingsUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub settings: Option<WebSettings>,
}

pub struct WikiService {
    config: Config,
    webs: RwLock<BTreeMap<String, SharedWeb>>,
    system: RwLock<SystemState>,
    storage: Box<dyn Storage>,
    search: SearchEngine,
}

impl WikiService {
    /// An in-memory wiki.
    pub fn new(config: Config) -> Self {
        let search = SearchEngine::with_config(&config.search);
        Self {
            config,
            webs: RwLock::new(BTreeMap::new()),
            system: RwLock::new(SystemState::default()),
            storage: Box::new(NoPersistence),
            search,
        }
    }

    /// Load the wiki held by `storage`.
    pub fn open(config: Config, storage: Box<dyn Storage>) -> Result<Self> {
        let stored = storage.load()?;
        let lock_timeout = config.lock_timeout();

        let mut webs = BTreeMap::new();
        for mut web in stored.webs {
            web.hydrate(lock_timeout);
            let address = web.address().to_string();
            if webs.contains_key(&address) {
                return Err(StorageError::DuplicateWeb(address).into());
            }
            webs.insert(address, Arc::new(RwLock::new(web)));
        }
        info!(webs = webs.len(), setup = stored.system.setup_complete, "Opened wiki");

        Ok(Self {
            search: SearchEngine::with_config(&config.search),
            config,
            webs: RwLock::new(webs),
            system: RwLock::new(stored.system),
            storage,
        })
    }

    /// Use JSON file storage when the config names a storage path.
    pub fn from_config(config: Config) -> Result<Self> {
        match config.storage_dir() {
            Some(dir) => Self::open(config, Box::new(JsonFileStorage::new(dir))),
            None => Ok(Self::new(config)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn search_engine(&self) -> &SearchEngine {
        &self.search
    }

    /// `name`, or the configured default author when absent or blank
    pub fn author(&self, name: Option<&str>, origin: impl Into<String>) -> Author {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.config.default_author);
        Author::new(name, origin)
    }

    // ---- system ----

    pub fn setup(&self) -> bool {
        self.system.read().setup_complete
    }

    pub fn system(&self) -> SystemState {
        self.system.read().clone()
    }

    pub fn system_password_set(&self) -> bool {
        self.system
            .read()
            .password
            .as_deref()
            .is_some_and(|p| !p.is_empty())
    }

    /// Set the system password and create the first web.
    ///
    /// Only the first call has an effect; later calls return `Ok(false)`.
    pub fn initialize_system(
        &self,
        password: &str,
        web_name: &str,
        web_address: &str,
    ) -> Result<bool> {
        let mut system = self.system.write();
        if system.setup_complete {
            debug!("{}", WikiError::AlreadyInitialized);
            return Ok(false);
        }

        self.create_web(web_name, web_address)?;
        let next = SystemState {
            password: Some(password.to_string()),
            setup_complete: true,
        };
        if let Err(err) = self.storage.save_system(&next) {
            self.webs.write().remove(web_address);
            if let Err(cleanup) = self.storage.delete_web(web_address) {
                warn!(web = web_address, "Failed to remove web after setup failed: {}", cleanup);
            }
            return Err(err.into());
        }
        *system = next;

        info!(web = web_address, "System initialized");
        Ok(true)
    }

    fn system_fallback_password(&self) -> String {
        self.system
            .read()
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.config.default_password.clone())
    }

    /// Check the system password, or the configured default while none is set.
    pub fn authenticate_system(&self, password: &str) -> Result<()> {
        if self.system_fallback_password() == password {
            Ok(())
        } else {
            warn!("System authentication failed");
            Err(WikiError::AuthenticationFailure)
        }
    }

    // ---- webs ----

    pub fn create_web(&self, name: &str, address: &str) -> Result<SharedWeb> {
        let mut webs = self.webs.write();
        if webs.contains_key(address) {
            return Err(WikiError::DuplicateAddress(address.to_string()));
        }

        let settings = WebSettings {
            markup: self.config.default_markup,
            home_page: self.config.home_page.clone(),
            ..WebSettings::default()
        };
        let mut web = Web::with_settings(address, name, settings);
        web.set_lock_timeout(self.config.lock_timeout());
        self.storage.save_web(&web)?;

        let web = Arc::new(RwLock::new(web));
        webs.insert(address.to_string(), Arc::clone(&web));
        info!(web = address, name, "Created web");
        Ok(web)
    }

    pub fn web(&self, address: &str) -> Result<SharedWeb> {
        self.webs
            .read()
            .get(address)
            .cloned()
            .ok_or_else(|| WikiError::WebNotFound(address.to_string()))
    }

    /// All webs, ordered by name
    pub fn webs(&self) -> Vec<SharedWeb> {
        let mut webs: Vec<SharedWeb> = self.webs.read().values().cloned().collect();
        webs.sort_by_cached_key(|web| web.read().name().to_string());
        webs
    }

    pub fn web_addresses(&self) -> Vec<String> {
        self.webs.read().keys().cloned().collect()
    }

    /// Run `f` with shared access to a web.
    pub fn with_web<R>(&self, address: &str, f: impl FnOnce(&Web) -> R) -> Result<R> {
        let web = self.web(address)?;
        let guard = web.read();
        Ok(f(&guard))
    }

    /// Run `f` with shared access to a web that is published.
    ///
    /// Unpublished webs are reported as not found.
    pub fn with_published_web<R>(&self, address: &str, f: impl FnOnce(&Web) -> R) -> Result<R> {
        self.with_web(address, |web| web.settings().published.then(|| f(web)))?
            .ok_or_else(|| WikiError::WebNotFound(address.to_string()))
    }

    /// Run `f` on a copy of a web and keep the copy once it is saved.
    ///
    /// The web stays locked until it is saved. When `f` or the save fails the
    /// web is left as it was.
    pub fn with_web_mut<R>(
        &self,
        address: &str,
        f: impl FnOnce(&mut Web) -> Result<R>,
    ) -> Result<R> {
        let webs = self.webs.read();
        let web = webs
            .get(address)
            .ok_or_else(|| WikiError::WebNotFound(address.to_string()))?;
        let mut guard = web.write();
        let mut draft = guard.clone();
        let out = f(&mut draft)?;
        self.storage.save_web(&draft)?;
        *guard = draft;
        Ok(out)
    }

    /// Rename a web or change its settings.
    pub fn update_web(&self, address: &str, update: WebSettingsUpdate) -> Result<()> {
        let mut webs = self.webs.write();
        let web = webs
            .get(address)
            .cloned()
            .ok_or_else(|| WikiError::WebNotFound(address.to_string()))?;

        let new_address = update.address.unwrap_or_else(|| address.to_string());
        if new_address != address && webs.contains_key(&new_address) {
            return Err(WikiError::DuplicateAddress(new_address));
        }

        {
            let mut guard = web.write();
            let mut draft = guard.clone();
            let name = update.name.unwrap_or_else(|| guard.name().to_string());
            draft.rename(new_address.clone(), name);
            if let Some(settings) = update.settings {
                draft.update_settings(settings);
            }
            self.storage.save_web(&draft)?;

            if new_address != address {
                if let Err(err) = self.storage.delete_web(address) {
                    if let Err(cleanup) = self.storage.delete_web(&new_address) {
                        warn!(web = %new_address, "Failed to remove renamed copy: {}", cleanup);
                    }
                    return Err(err.into());
                }
            }
            *guard = draft;
        }

        if new_address != address {
            webs.remove(address);
            webs.insert(new_address.clone(), web);
        }
        info!(web = address, new_address = %new_address, "Updated web");
        Ok(())
    }

    pub fn delete_web(&self, address: &str) -> Result<()> {
        let mut webs = self.webs.write();
        if !webs.contains_key(address) {
            return Err(WikiError::WebNotFound(address.to_string()));
        }
        self.storage.delete_web(address)?;
        webs.remove(address);
        info!(web = address, "Deleted web");
        Ok(())
    }

    /// Check a web's password; webs without one accept the system password.
    pub fn authenticate_web(&self, address: &str, password: &str) -> Result<()> {
        let fallback = self.system_fallback_password();
        if self.with_web(address, |web| web.authenticate(password, &fallback))? {
            Ok(())
        } else {
            warn!(web = address, "Web authentication failed");
            Err(WikiError::AuthenticationFailure)
        }
    }

    // ---- pages ----

    pub fn write_page(
        &self,
        address: &str,
        name: &str,
        content: impl Into<String>,
        author: Author,
        at: DateTime<Utc>,
    ) -> Result<Revision> {
        self.write_page_with(address, name, Edit::new(content, author, at))
    }

    pub fn write_page_with(&self, address: &str, name: &str, edit: Edit) -> Result<Revision> {
        self.with_web_mut(address, |web| web.write_page_with(name, edit).cloned())
    }

    /// Snapshot of a page
    pub fn read_page(&self, address: &str, name: &str) -> Result<Page> {
        self.with_web(address, |web| web.read_page(name).cloned())?
    }

    pub fn revision(&self, address: &str, name: &str, index: usize) -> Result<Revision> {
        self.with_web(address, |web| {
            web.read_page(name)
                .and_then(|page| page.revision(index).cloned())
        })?
    }

    pub fn lock_page(
        &self,
        address: &str,
        name: &str,
        at: DateTime<Utc>,
        holder: &str,
    ) -> Result<()> {
        self.with_web_mut(address, |web| web.lock_page(name, at, holder))
    }

    /// Start editing a page: take its lock for `holder`.
    ///
    /// Fails while someone else holds an active lock, unless `break_lock` is
    /// set, in which case the lock passes to `holder`.
    pub fn begin_edit(
        &self,
        address: &str,
        name: &str,
        at: DateTime<Utc>,
        holder: &str,
        break_lock: bool,
    ) -> Result<Page> {
        self.with_web_mut(address, |web| {
            let page = web.page_mut(name)?;
            if let Some(current) = page.lock_holder(at) {
                if current != holder && !break_lock {
                    warn!(web = address, page = name, holder = current, "Page is being edited");
                    return Err(WikiError::LockConflict {
                        page: name.to_string(),
                        holder: current.to_string(),
                    });
                }
            }
            page.lock(at, holder);
            Ok(page.clone())
        })
    }

    pub fn cancel_edit(&self, address: &str, name: &str) -> Result<()> {
        self.with_web_mut(address, |web| web.unlock_page(name))
    }

    pub fn remove_page(&self, address: &str, name: &str) -> Result<Page> {
        self.with_web_mut(address, |web| web.remove_page(name))
    }

    /// One orphan removal pass over a web.
    pub fn remove_orphaned_pages(&self, address: &str) -> Result<Vec<Page>> {
        self.with_web_mut(address, |web| Ok(web.remove_orphaned_pages()))
    }

    /// Snapshots of the pages matching `query`, by name
    pub fn search(&self, address: &str, query: &str) -> Result<Vec<Page>> {
        self.with_web(address, |web| {
            self.search
                .search(web, query)
                .into_iter()
                .cloned()
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> WikiService {
        WikiService::new(Config::default())
    }

    #[test]
    fn test_service_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WikiService>();
    }

    #[test]
    fn test_duplicate_address() {
        let wiki = service();
        wiki.create_web("Wiki", "wiki1").unwrap();
        let err = wiki.create_web("Other", "wiki1").unwrap_err();
        assert!(matches!(err, WikiError::DuplicateAddress(a) if a == "wiki1"));
    }

    #[test]
    fn test_default_author() {
        let wiki = service();
        assert_eq!(wiki.author(None, "127.0.0.1").name, "AnonymousCoward");
        assert_eq!(wiki.author(Some("  "), "127.0.0.1").name, "AnonymousCoward");
        assert_eq!(wiki.author(Some("Guest"), "127.0.0.1").name, "Guest");
    }

    #[test]
    fn test_unknown_web() {
        let wiki = service();
        let err = wiki.read_page("nope", "HomePage").unwrap_err();
        assert!(matches!(err, WikiError::WebNotFound(_)));
    }

    #[test]
    fn test_system_password_fallback() {
        let wiki = service();
        assert!(!wiki.system_password_set());
        wiki.authenticate_system("wikiweb").unwrap();

        wiki.initialize_system("pswd", "Wiki", "wiki1").unwrap();
        assert!(wiki.system_password_set());
        assert!(wiki.authenticate_system("wikiweb").is_err());
        wiki.authenticate_system("pswd").unwrap();
        wiki.authenticate_web("wiki1", "pswd").unwrap();
    }
}
