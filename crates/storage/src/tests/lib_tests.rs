use super::*;
use anyhow::anyhow;
use serde_json::json;
use shared::{domain::ServiceName, record::SeedData};

struct BrokenJar;

impl CookieJar for BrokenJar {
    fn get(&self, _name: &str) -> Option<String> {
        None
    }

    fn set(&self, _name: &str, _value: &str, _options: &CookieOptions) -> Result<()> {
        Err(anyhow!("quota exceeded"))
    }
}

fn temp_cookie_file() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("cookies.json");
    (dir, path)
}

#[test]
fn memory_jar_round_trips_values() {
    let jar = MemoryCookieJar::new();
    assert_eq!(jar.get("cookie-accepted"), None);

    jar.set("cookie-accepted", "true", &CookieOptions::default())
        .expect("set");
    assert_eq!(jar.get("cookie-accepted").as_deref(), Some("true"));

    let stored = jar.cookie("cookie-accepted").expect("stored");
    assert_eq!(stored.path, "/");
    assert!(!stored.secure);
    assert!(stored.expires_at.expect("expiry") > Utc::now());
}

#[test]
fn memory_jar_clones_share_cookies() {
    let jar = MemoryCookieJar::new();
    let other = jar.clone();
    jar.set("a", "1", &CookieOptions::default()).expect("set");
    assert_eq!(other.get("a").as_deref(), Some("1"));
}

#[test]
fn non_positive_max_age_deletes_the_cookie() {
    let jar = MemoryCookieJar::new();
    jar.set("a", "1", &CookieOptions::default()).expect("set");

    let expire_now = CookieOptions {
        max_age_secs: 0,
        ..CookieOptions::default()
    };
    jar.set("a", "1", &expire_now).expect("delete");
    assert_eq!(jar.get("a"), None);
}

#[test]
fn expired_cookies_read_as_absent() {
    let jar = MemoryCookieJar::new();
    jar.insert_raw(
        "a",
        StoredCookie {
            value: "true".into(),
            path: "/".into(),
            secure: false,
            expires_at: Some(Utc::now() - Duration::seconds(5)),
        },
    );
    assert_eq!(jar.get("a"), None);
    assert!(jar.cookie("a").is_none());
}

#[test]
fn file_jar_persists_across_instances_and_creates_parent_dir() {
    let (_dir, path) = temp_cookie_file();
    let jar = FileCookieJar::new(&path);
    assert_eq!(jar.get("consent"), None);

    jar.set("consent", "{\"accepted\":true}", &CookieOptions::default())
        .expect("set");
    assert!(path.exists(), "cookie file should exist: {}", path.display());

    let reopened = FileCookieJar::new(&path);
    assert_eq!(
        reopened.get("consent").as_deref(),
        Some("{\"accepted\":true}")
    );
}

#[test]
fn corrupt_cookie_file_is_an_empty_jar_and_is_overwritten() {
    let (_dir, path) = temp_cookie_file();
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(&path, "{{{ definitely not json").expect("write garbage");

    let jar = FileCookieJar::new(&path);
    assert_eq!(jar.get("consent"), None);

    jar.set("consent", "false", &CookieOptions::default())
        .expect("set");
    assert_eq!(jar.get("consent").as_deref(), Some("false"));
}

#[test]
fn file_jar_drops_expired_entries() {
    let (_dir, path) = temp_cookie_file();
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    let expired = json!({
        "consent": {
            "value": "true",
            "path": "/",
            "secure": false,
            "expires_at": "2001-01-01T00:00:00Z"
        }
    });
    fs::write(&path, expired.to_string()).expect("write");

    let jar = FileCookieJar::new(&path);
    assert_eq!(jar.get("consent"), None);
}

#[test]
fn store_reads_absent_when_nothing_persisted() {
    let store = ConsentStore::new(Arc::new(MemoryCookieJar::new()));
    assert!(store.read("cookie-accepted").is_none());
}

#[test]
fn store_normalizes_string_typed_accepted() {
    let jar = MemoryCookieJar::new();
    jar.set("c", "\"true\"", &CookieOptions::default()).expect("set");
    jar.set("d", "{\"accepted\":\"false\"}", &CookieOptions::default())
        .expect("set");
    let store = ConsentStore::new(Arc::new(jar));

    assert!(store.read("c").expect("record").accepted);
    assert!(!store.read("d").expect("record").accepted);
}

#[test]
fn store_treats_corrupt_payload_as_absent() {
    let jar = MemoryCookieJar::new();
    jar.set("c", "{\"accepted\":", &CookieOptions::default())
        .expect("set");
    jar.set("d", "{\"accepted\":[true]}", &CookieOptions::default())
        .expect("set");
    let store = ConsentStore::new(Arc::new(jar));

    assert!(store.read("c").is_none());
    assert!(store.read("d").is_none());
}

#[test]
fn store_write_then_read_returns_the_record() {
    let store = ConsentStore::new(Arc::new(MemoryCookieJar::new()));
    let mut seeds = SeedData::new();
    seeds.insert(ServiceName::Gtm, vec![json!({"event": "pageView"})]);
    let record = ConsentRecord::new(true, seeds);

    store
        .write("cookie-accepted", &record, &CookieOptions::default())
        .expect("write");
    assert_eq!(store.read("cookie-accepted"), Some(record));
}

#[test]
fn store_write_failure_propagates() {
    let store = ConsentStore::new(Arc::new(BrokenJar));
    let err = store
        .write(
            "cookie-accepted",
            &ConsentRecord::new(false, SeedData::new()),
            &CookieOptions::default(),
        )
        .expect_err("write should fail");
    assert!(format!("{err:#}").contains("quota exceeded"));
}
