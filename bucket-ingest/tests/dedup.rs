use bucket_ingest::dedup::FileDedupStore;
use bucket_ingest_core::contract::DedupStore;
use bucket_ingest_core::event::FileEvent;
use tempfile::tempdir;

#[tokio::test]
async fn first_claim_wins_and_redelivery_is_refused() {
    let dir = tempdir().unwrap();
    let store = FileDedupStore::new(dir.path().join("claims"));
    let key = FileEvent::new("landing", "in/daily/sales_forecast_daily.csv")
        .with_generation("17")
        .dedup_key();

    assert!(store.claim(&key).await.unwrap());
    assert!(!store.claim(&key).await.unwrap());
    assert!(store.marker_path(&key).exists());
}

#[tokio::test]
async fn new_generation_of_same_object_is_a_new_claim() {
    let dir = tempdir().unwrap();
    let store = FileDedupStore::new(dir.path());
    let event = FileEvent::new("landing", "in/daily/sales_forecast_daily.csv");

    assert!(store.claim(&event.clone().with_generation("1").dedup_key()).await.unwrap());
    assert!(store.claim(&event.with_generation("2").dedup_key()).await.unwrap());
}

#[tokio::test]
async fn marker_names_are_stable_hex_digests() {
    let store = FileDedupStore::new("/var/lib/bucket-ingest");
    let a = store.marker_path("landing/in/a.csv#1");
    let b = store.marker_path("landing/in/a.csv#1");
    let name = a.file_name().unwrap().to_string_lossy().to_string();

    assert_eq!(a, b);
    assert_eq!(name.len(), 64);
    assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(store.dir(), std::path::Path::new("/var/lib/bucket-ingest"));
}

#[tokio::test]
async fn unwritable_location_is_an_error() {
    let file = tempfile::NamedTempFile::new().unwrap();
    // A regular file cannot hold marker files.
    let store = FileDedupStore::new(file.path());

    assert!(store.claim("landing/in/a.csv#1").await.is_err());
}

#[tokio::test]
async fn released_claim_can_be_claimed_again() {
    let dir = tempdir().unwrap();
    let store = FileDedupStore::new(dir.path());
    let key = "landing/in/daily/sales_forecast_daily.csv#-";

    assert!(store.claim(key).await.unwrap());
    store.release(key).await.unwrap();
    assert!(!store.marker_path(key).exists());
    assert!(store.claim(key).await.unwrap());
}

#[tokio::test]
async fn releasing_an_unclaimed_key_is_a_no_op() {
    let dir = tempdir().unwrap();
    let store = FileDedupStore::new(dir.path());

    store.release("landing/in/never-claimed.csv#1").await.unwrap();
}

#[test]
fn marker_name_is_hex_of_sha256() {
    let store = FileDedupStore::new("/tmp/claims");
    // SHA-256 of the empty string.
    assert_eq!(
        store.marker_path("").file_name().unwrap().to_string_lossy(),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}
