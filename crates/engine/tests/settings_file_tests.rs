//! File-backed settings tests
//!
//! Open, mutate, close and reopen a settings directory on disk.

use prefs_durability::{FileBackend, SettingsPaths};
use prefs_engine::{spawn_autosave, ResetGroup, Setting, Settings, SettingsConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_values_survive_reopen() {
    let dir = TempDir::new().unwrap();

    let settings = Settings::open_file(dir.path()).await.unwrap();
    settings.set_int("volume", 7);
    settings.set_float("gain", 0.25);
    settings.set_string("name", "ada");
    settings.delete_key("volume");
    settings.set_int("volume", 8);
    settings.close().await.unwrap();
    drop(settings);

    let reopened = Settings::open_file(dir.path()).await.unwrap();
    assert_eq!(reopened.get_int("volume", 0), 8);
    assert_eq!(reopened.get_float("gain", 0.0), 0.25);
    assert_eq!(reopened.get_string("name", ""), "ada");
    assert_eq!(reopened.len(), 3);
    assert!(!reopened.is_dirty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_round_trip_independent_of_lookup_mode() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(FileBackend::new().with_sync(false));

    let with_lookup = Settings::open(dir.path(), SettingsConfig::default(), backend.clone())
        .await
        .unwrap();
    with_lookup.set_int("a", 1);
    with_lookup.set_string("b", "two");
    with_lookup.close().await.unwrap();

    let config = SettingsConfig::default().with_lookup_cache(false);
    let without_lookup = Settings::open(dir.path(), config, backend).await.unwrap();
    assert_eq!(without_lookup.get_int("a", 0), 1);
    assert_eq!(without_lookup.get_string("b", ""), "two");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_custom_file_name_from_config() {
    let dir = TempDir::new().unwrap();
    let paths = SettingsPaths::from_root(dir.path());
    SettingsConfig::default()
        .with_file_name("player.prefs")
        .write_to_file(&paths.config_file())
        .unwrap();

    let settings = Settings::open_file(dir.path()).await.unwrap();
    assert!(dir.path().join("player.prefs").exists());
    assert!(!dir.path().join("settings.prefs").exists());
    settings.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_corrupt_file_fails_open() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("settings.prefs"), b"garbage").unwrap();
    assert!(Settings::open_file(dir.path()).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stale_temp_file_is_removed_on_open() {
    let dir = TempDir::new().unwrap();
    let temp = dir.path().join(".settings.prefs.tmp");
    std::fs::write(&temp, b"partial").unwrap();

    let _settings = Settings::open_file(dir.path()).await.unwrap();
    assert!(!temp.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_autosave_task_writes_dirty_changes() {
    let dir = TempDir::new().unwrap();
    let config = SettingsConfig::default()
        .with_save_interval(Duration::from_millis(30))
        .with_sync_on_save(false);
    let backend = Arc::new(FileBackend::new().with_sync(false));
    let settings = Arc::new(Settings::open(dir.path(), config, backend).await.unwrap());

    let task = spawn_autosave(&settings, Duration::from_millis(5)).unwrap();
    settings.set_int("volume", 4);

    for _ in 0..400 {
        if !settings.is_dirty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!settings.is_dirty());

    settings.close().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_autosave_disabled_by_zero_interval() {
    let config = SettingsConfig::default().with_save_interval(Duration::ZERO);
    let settings = Arc::new(Settings::in_memory_with_config(config).await.unwrap());
    assert!(spawn_autosave(&settings, Duration::from_millis(5)).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reset_group_then_reopen() {
    let dir = TempDir::new().unwrap();
    let settings = Arc::new(Settings::open_file(dir.path()).await.unwrap());
    let volume = Arc::new(Setting::int(settings.clone(), "volume", 5));
    let lang = Arc::new(Setting::string(settings.clone(), "lang", "en"));

    volume.set_int(9);
    lang.set_string("de");
    settings.save_async().await.unwrap();

    let group = ResetGroup::new().with(volume.clone()).with(lang.clone());
    assert_eq!(group.reset(), 2);
    settings.close().await.unwrap();
    drop((volume, lang, group, settings));

    let reopened = Settings::open_file(dir.path()).await.unwrap();
    assert!(reopened.is_empty());
}
