use chrono::{Duration, Utc};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wikiweb_core::storage::StoredWiki;
use wikiweb_core::{
    Author, Config, JsonFileStorage, Storage, StorageError, SystemState, Web, WebSettingsUpdate,
    WikiError, WikiService,
};

#[derive(Default)]
struct Faults {
    web_saves: AtomicBool,
    system_saves: AtomicBool,
}

/// JSON files that refuse to save while a fault is switched on.
struct FaultyStorage {
    inner: JsonFileStorage,
    faults: Arc<Faults>,
}

fn refused() -> StorageError {
    StorageError::Io {
        path: "disk".into(),
        source: std::io::Error::other("disk full"),
    }
}

impl Storage for FaultyStorage {
    fn load(&self) -> Result<StoredWiki, StorageError> {
        self.inner.load()
    }

    fn save_system(&self, system: &SystemState) -> Result<(), StorageError> {
        if self.faults.system_saves.load(Ordering::SeqCst) {
            return Err(refused());
        }
        self.inner.save_system(system)
    }

    fn save_web(&self, web: &Web) -> Result<(), StorageError> {
        if self.faults.web_saves.load(Ordering::SeqCst) {
            return Err(refused());
        }
        self.inner.save_web(web)
    }

    fn delete_web(&self, address: &str) -> Result<(), StorageError> {
        self.inner.delete_web(address)
    }
}

fn faulty_wiki(root: &Path) -> (WikiService, Arc<Faults>) {
    let faults = Arc::new(Faults::default());
    let storage = FaultyStorage {
        inner: JsonFileStorage::new(root),
        faults: Arc::clone(&faults),
    };
    let wiki = WikiService::open(Config::default(), Box::new(storage)).unwrap();
    (wiki, faults)
}

fn config_in(dir: &std::path::Path) -> Config {
    let path = dir.join("wikiweb.yml");
    fs::write(&path, "storage:\n  path: data\nlock_timeout_minutes: 10\n").unwrap();
    Config::from_file(&path).unwrap()
}

#[test]
fn writes_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();

    {
        let wiki = WikiService::from_config(config_in(dir.path())).unwrap();
        wiki.initialize_system("pswd", "Wiki1", "wiki1").unwrap();
        wiki.write_page(
            "wiki1",
            "Oak",
            "All about oak.\ncategory: trees",
            Author::new("TreeHugger", "127.0.0.2"),
            now,
        )
        .unwrap();
        wiki.write_page("wiki1", "Oak", "Still oak.\ncategory: trees", Author::new("Guest", "127.0.0.1"), now)
            .unwrap();
        wiki.lock_page("wiki1", "Oak", now, "Locky").unwrap();
    }

    assert!(dir.path().join("data/system.json").exists());
    assert!(dir.path().join("data/webs/wiki1.json").exists());

    let wiki = WikiService::from_config(config_in(dir.path())).unwrap();
    assert!(wiki.setup());
    wiki.authenticate_system("pswd").unwrap();

    let oak = wiki.read_page("wiki1", "Oak").unwrap();
    assert_eq!(oak.revision_count(), 2);
    assert_eq!(oak.content(), "Still oak.\ncategory: trees");
    assert_eq!(oak.revision(0).unwrap().author().origin, "127.0.0.2");
    assert!(oak.in_category("trees"));

    assert_eq!(oak.lock_holder(now), Some("Locky"));
    assert_eq!(oak.lock_timeout(), Duration::minutes(10));
    assert!(!oak.locked(now + Duration::minutes(10)));
}

#[test]
fn renamed_web_moves_its_file() {
    let dir = tempfile::tempdir().unwrap();
    let storage_root = dir.path().join("store");

    {
        let wiki =
            WikiService::open(Config::default(), Box::new(JsonFileStorage::new(&storage_root))).unwrap();
        wiki.create_web("Wiki1", "wiki1").unwrap();
        wiki.update_web(
            "wiki1",
            WebSettingsUpdate {
                address: Some("renamed".into()),
                ..Default::default()
            },
        )
        .unwrap();
    }

    assert!(!storage_root.join("webs/wiki1.json").exists());
    let wiki =
        WikiService::open(Config::default(), Box::new(JsonFileStorage::new(&storage_root))).unwrap();
    assert_eq!(wiki.web_addresses(), vec!["renamed"]);
}

#[test]
fn rejected_write_is_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();

    {
        let wiki = WikiService::from_config(config_in(dir.path())).unwrap();
        wiki.create_web("Wiki1", "wiki1").unwrap();
        wiki.write_page("wiki1", "HomePage", "v1", Author::new("Guest", "x"), now)
            .unwrap();
        wiki.lock_page("wiki1", "HomePage", now, "Locky").unwrap();
        assert!(wiki
            .write_page("wiki1", "HomePage", "v2", Author::new("Guest", "x"), now)
            .is_err());
    }

    let wiki = WikiService::from_config(config_in(dir.path())).unwrap();
    assert_eq!(wiki.read_page("wiki1", "HomePage").unwrap().content(), "v1");
}

#[test]
fn failed_save_leaves_web_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let guest = || Author::new("Guest", "127.0.0.1");

    let (wiki, faults) = faulty_wiki(dir.path());
    wiki.create_web("Wiki1", "wiki1").unwrap();
    wiki.write_page("wiki1", "HomePage", "v1", guest(), now).unwrap();

    faults.web_saves.store(true, Ordering::SeqCst);
    let err = wiki
        .write_page("wiki1", "HomePage", "v2", guest(), now)
        .unwrap_err();
    assert!(matches!(err, WikiError::Storage(_)));
    assert!(wiki.lock_page("wiki1", "HomePage", now, "Locky").is_err());
    assert!(wiki.remove_page("wiki1", "HomePage").is_err());

    let home = wiki.read_page("wiki1", "HomePage").unwrap();
    assert_eq!(home.revision_count(), 1);
    assert_eq!(home.content(), "v1");
    assert!(!home.locked(now));

    faults.web_saves.store(false, Ordering::SeqCst);
    let revision = wiki.write_page("wiki1", "HomePage", "v2", guest(), now).unwrap();
    assert_eq!(revision.number(), 1);

    drop(wiki);
    let wiki =
        WikiService::open(Config::default(), Box::new(JsonFileStorage::new(dir.path()))).unwrap();
    let home = wiki.read_page("wiki1", "HomePage").unwrap();
    assert_eq!(home.revision_count(), 2);
    assert_eq!(home.content(), "v2");
}

#[test]
fn failed_setup_can_be_retried() {
    let dir = tempfile::tempdir().unwrap();
    let (wiki, faults) = faulty_wiki(dir.path());

    faults.system_saves.store(true, Ordering::SeqCst);
    assert!(wiki.initialize_system("pswd", "Wiki1", "wiki1").is_err());
    assert!(!wiki.setup());
    assert!(!wiki.system_password_set());
    assert!(wiki.web_addresses().is_empty());
    assert!(!dir.path().join("webs/wiki1.json").exists());

    faults.system_saves.store(false, Ordering::SeqCst);
    assert!(wiki.initialize_system("pswd", "Wiki1", "wiki1").unwrap());
    assert!(wiki.setup());
    assert_eq!(wiki.web_addresses(), vec!["wiki1"]);
}

#[test]
fn failed_rename_keeps_old_address() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let (wiki, faults) = faulty_wiki(dir.path());
    wiki.create_web("Wiki1", "wiki1").unwrap();

    faults.web_saves.store(true, Ordering::SeqCst);
    let rename = WebSettingsUpdate {
        name: Some("Renamed".into()),
        address: Some("renamed".into()),
        ..Default::default()
    };
    assert!(wiki.update_web("wiki1", rename).is_err());
    assert_eq!(wiki.web_addresses(), vec!["wiki1"]);
    wiki.with_web("wiki1", |web| {
        assert_eq!(web.address(), "wiki1");
        assert_eq!(web.name(), "Wiki1");
    })
    .unwrap();

    faults.web_saves.store(false, Ordering::SeqCst);
    wiki.write_page("wiki1", "HomePage", "hello", Author::new("Guest", "x"), now)
        .unwrap();
    assert!(dir.path().join("webs/wiki1.json").exists());
    assert!(!dir.path().join("webs/renamed.json").exists());
}

const INCONSISTENT_WEB: &str = r#"{
  "address": "wiki1",
  "name": "Wiki1",
  "pages": [
    {
      "name": "Oak",
      "revisions": [
        {"number": 5, "content": "first oak", "author": {"name": "Guest", "origin": "x"}, "timestamp": "2024-01-01T00:00:00Z"},
        {"number": 5, "content": "second oak", "author": {"name": "Guest", "origin": "x"}, "timestamp": "2024-01-02T00:00:00Z"}
      ]
    },
    {
      "name": "Oak",
      "revisions": [
        {"number": 0, "content": "stray copy", "author": {"name": "Other", "origin": "x"}, "timestamp": "2024-01-03T00:00:00Z"}
      ]
    }
  ]
}"#;

#[test]
fn stored_pages_are_normalised_on_load() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("webs")).unwrap();
    fs::write(dir.path().join("webs/wiki1.json"), INCONSISTENT_WEB).unwrap();

    let wiki =
        WikiService::open(Config::default(), Box::new(JsonFileStorage::new(dir.path()))).unwrap();
    wiki.with_web("wiki1", |web| assert_eq!(web.page_names(), vec!["Oak"]))
        .unwrap();

    let oak = wiki.read_page("wiki1", "Oak").unwrap();
    let numbers: Vec<usize> = oak.revisions().iter().map(|r| r.number()).collect();
    assert_eq!(numbers, vec![0, 1]);
    assert_eq!(oak.content(), "second oak");
    assert_eq!(wiki.revision("wiki1", "Oak", 1).unwrap().content(), "second oak");
}

#[test]
fn duplicate_stored_addresses_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("webs")).unwrap();
    let web = r#"{"address": "wiki1", "name": "Wiki1"}"#;
    fs::write(dir.path().join("webs/wiki1.json"), web).unwrap();
    fs::write(dir.path().join("webs/copy.json"), web).unwrap();

    let err = WikiService::open(Config::default(), Box::new(JsonFileStorage::new(dir.path())))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        WikiError::Storage(StorageError::DuplicateWeb(address)) if address == "wiki1"
    ));
}
