mod common;

use common::*;
use pak_keeper_lib::core::pak_name::DISABLED_PRIORITY;
use pak_keeper_lib::core::profiles::ProfileStore;
use pak_keeper_lib::models::error::SError;
use pak_keeper_lib::models::metadata::SyncMode;
use pak_keeper_lib::models::server::{ServerInfo, ServerMod};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Barrier};
use std::thread;

const ALPHA_INDEX: &str = "https://index.test/alpha.json";

/// Alpha 1.0.0 enabled and indexed with 1.0.0, 2.0.0 and a broken 3.0.0.
fn alpha_store() -> (tempfile::TempDir, pak_keeper_lib::models::paths::StorePaths, Arc<FakeIndex>) {
    let (tmp, paths) = setup_store();
    write_pak_at(
        &pak_path(&paths.install, 1, "Alpha", "1.0.0"),
        &indexed_descriptor("Alpha", "1.0.0", "server_and_client", ALPHA_INDEX),
    );
    let index = Arc::new(
        FakeIndex::default()
            .with_index(ALPHA_INDEX, "Alpha", &["1.0.0", "2.0.0", "3.0.0"])
            .serving(
                "Alpha",
                "2.0.0",
                indexed_descriptor("Alpha", "2.0.0", "server_and_client", ALPHA_INDEX),
            ),
    );
    (tmp, paths, index)
}

#[test]
fn test_index_refresh_lists_remote_versions() {
    let (_tmp, paths, index) = alpha_store();
    let registry = open_registry(&paths, index.clone(), Arc::new(FixedServer(None)));
    registry.reconcile().unwrap();

    assert_eq!(registry.refresh_index_files().unwrap(), 1);
    assert_eq!(
        registry.mods()[0].available_versions,
        vec!["3.0.0", "2.0.0", "1.0.0"]
    );

    // refreshing again yields the same view
    registry.refresh_index_files().unwrap();
    assert_eq!(registry.mods()[0].available_versions.len(), 3);
    assert_eq!(index.index_fetches.load(Ordering::SeqCst), 2);
    assert_eq!(index.downloads.load(Ordering::SeqCst), 0);
}

#[test]
fn test_switch_version_downloads_missing_version() {
    let (_tmp, paths, index) = alpha_store();
    let registry = open_registry(&paths, index, Arc::new(FixedServer(None)));
    registry.reconcile().unwrap();
    registry.refresh_index_files().unwrap();

    assert!(registry.switch_version("Alpha", &v("2.0.0")).unwrap());
    let views = registry.mods();
    assert_eq!(views[0].version, "2.0.0");
    assert!(views[0].enabled);
    assert_eq!(
        file_names(&paths.install),
        vec!["001-Alpha-2.0.0_P.pak".to_string()]
    );
    assert_eq!(
        file_names(&paths.downloads),
        vec!["999-Alpha-1.0.0_P.pak".to_string()]
    );
    assert!(file_names(&paths.staging).is_empty());

    // the older version is still on disk, no download needed
    assert!(registry.switch_version("Alpha", &v("1.0.0")).unwrap());
    assert_eq!(registry.mods()[0].version, "1.0.0");
}

#[test]
fn test_failed_download_keeps_current_version() {
    let (_tmp, paths, index) = alpha_store();
    let registry = open_registry(&paths, index, Arc::new(FixedServer(None)));
    registry.reconcile().unwrap();
    registry.refresh_index_files().unwrap();

    assert!(!registry.switch_version("Alpha", &v("3.0.0")).unwrap());
    assert_eq!(registry.mods()[0].version, "1.0.0");
    assert!(pak_path(&paths.install, 1, "Alpha", "1.0.0").exists());
    assert!(file_names(&paths.staging).is_empty());

    // the mod can be updated again once the failed attempt is over
    assert!(registry.switch_version("Alpha", &v("2.0.0")).unwrap());

    assert!(matches!(
        registry.switch_version("Alpha", &v("9.9.9")),
        Err(SError::MissingIndexEntry(_))
    ));
    assert!(matches!(
        registry.switch_version("Ghost", &v("1.0.0")),
        Err(SError::ModNotFound(_))
    ));
}

#[test]
fn test_force_latest_pulls_newest_version() {
    let (_tmp, paths) = setup_store();
    write_pak_at(
        &pak_path(&paths.install, 1, "Alpha", "1.0.0"),
        &indexed_descriptor("Alpha", "1.0.0", "server_and_client", ALPHA_INDEX),
    );
    let index = Arc::new(
        FakeIndex::default()
            .with_index(ALPHA_INDEX, "Alpha", &["1.0.0", "2.0.0"])
            .serving(
                "Alpha",
                "2.0.0",
                indexed_descriptor("Alpha", "2.0.0", "server_and_client", ALPHA_INDEX),
            ),
    );
    let registry = open_registry(&paths, index, Arc::new(FixedServer(None)));
    registry.reconcile().unwrap();
    registry.set_force_latest("Alpha", true).unwrap();

    registry.refresh_index_files().unwrap();
    let views = registry.mods();
    assert_eq!(views[0].version, "2.0.0");
    assert!(pak_path(&paths.install, 1, "Alpha", "2.0.0").exists());
}

#[test]
fn test_pinning_older_version_ends_force_latest() {
    let (_tmp, paths) = setup_store();
    write_plain_pak(&paths.install, 1, "Alpha", "1.0.0");
    write_plain_pak(&paths.downloads, DISABLED_PRIORITY, "Alpha", "2.0.0");
    let registry = offline_registry(&paths);
    registry.reconcile().unwrap();
    registry.set_force_latest("Alpha", true).unwrap();
    assert_eq!(registry.mods()[0].version, "2.0.0");

    assert!(registry.switch_version("Alpha", &v("1.0.0")).unwrap());
    let views = registry.mods();
    assert_eq!(views[0].version, "1.0.0");
    assert!(!views[0].force_latest);
    assert!(pak_path(&paths.install, 1, "Alpha", "1.0.0").exists());

    // later passes leave the pin alone
    registry.reconcile().unwrap();
    assert_eq!(registry.mods()[0].version, "1.0.0");
}

#[test]
fn test_download_is_not_installed_once_game_starts() {
    let (_tmp, paths, index) = alpha_store();
    let registry = open_registry(&paths, index.clone(), Arc::new(FixedServer(None)));
    registry.reconcile().unwrap();
    registry.refresh_index_files().unwrap();
    index
        .game_starts_during_download
        .set(registry.read_only_flag())
        .unwrap();

    assert!(matches!(
        registry.switch_version("Alpha", &v("2.0.0")),
        Err(SError::ReadOnly)
    ));
    assert_eq!(index.downloads.load(Ordering::SeqCst), 1);
    assert_eq!(registry.mods()[0].version, "1.0.0");
    assert!(file_names(&paths.downloads).is_empty());
    assert!(file_names(&paths.staging).is_empty());
    assert!(!registry.library().lock().find("Alpha").unwrap().cannot_currently_update);
}

fn server(mods: Vec<ServerMod>) -> Arc<FixedServer> {
    Arc::new(FixedServer(Some(ServerInfo {
        server_name: String::new(),
        mods,
    })))
}

#[test]
fn test_server_sync_builds_profile() {
    let (_tmp, paths, index) = alpha_store();
    write_pak_at(
        &pak_path(&paths.install, 2, "Beta", "1.0.0"),
        &descriptor("Beta", "1.0.0", "none"),
    );
    let directory = server(vec![ServerMod {
        mod_id: "Alpha".to_string(),
        name: None,
        version: v("2.0.0"),
        sync: SyncMode::ServerAndClient,
        index_url: None,
    }]);
    let registry = open_registry(&paths, index, directory);
    registry.reconcile().unwrap();

    let summary = registry.sync_with_server("127.0.0.1:8777").unwrap();
    assert_eq!(summary.profile_name, "127.0.0.1:8777 Synced Mods");
    assert_eq!(summary.failed_downloads, 0);
    assert!(summary.message().ends_with("No mods failed to sync."));

    // the live load order is untouched until the profile is loaded
    let views = registry.mods();
    assert_eq!(
        (views[0].id.as_str(), views[0].version.as_str()),
        ("Alpha", "1.0.0")
    );
    assert!(views[1].enabled);

    let stored = ProfileStore::load(&paths.profiles).unwrap();
    let profile = stored.get(&summary.profile_name).unwrap();
    let alpha = &profile.mods["Alpha"];
    assert!(alpha.enabled);
    assert_eq!(alpha.priority, 1);
    assert_eq!(alpha.installed_version, v("2.0.0"));
    let beta = &profile.mods["Beta"];
    assert!(!beta.enabled);
    assert_eq!(beta.priority, DISABLED_PRIORITY);

    registry.load_profile(&summary.profile_name).unwrap();
    let views = registry.mods();
    assert_eq!(
        (views[0].id.as_str(), views[0].version.as_str(), views[0].enabled),
        ("Alpha", "2.0.0", true)
    );
    assert!(!views[1].enabled);
    assert_eq!(
        file_names(&paths.install),
        vec!["001-Alpha-2.0.0_P.pak".to_string()]
    );
    assert_eq!(
        file_names(&paths.downloads),
        vec![
            "999-Alpha-1.0.0_P.pak".to_string(),
            "999-Beta-1.0.0_P.pak".to_string()
        ]
    );
}

#[test]
fn test_server_sync_counts_failed_downloads() {
    let (_tmp, paths, index) = alpha_store();
    let directory = server(vec![
        ServerMod {
            mod_id: "Alpha".to_string(),
            name: None,
            version: v("3.0.0"),
            sync: SyncMode::ServerAndClient,
            index_url: Some(ALPHA_INDEX.to_string()),
        },
        ServerMod {
            mod_id: "ServerTool".to_string(),
            name: None,
            version: v("1.0"),
            sync: SyncMode::ServerOnly,
            index_url: None,
        },
    ]);
    let registry = open_registry(&paths, index, directory);
    registry.reconcile().unwrap();

    let summary = registry.sync_with_server("10.0.0.1:7777").unwrap();
    assert_eq!(summary.failed_downloads, 1);
    assert!(summary.message().contains("1 mod(s) failed to sync"));
    assert_eq!(registry.profile_names(), vec![summary.profile_name]);
}

#[test]
fn test_server_sync_without_server() {
    let (_tmp, paths, index) = alpha_store();
    let registry = open_registry(&paths, index, Arc::new(FixedServer(None)));
    registry.reconcile().unwrap();

    assert!(matches!(
        registry.sync_with_server("10.0.0.1:7777"),
        Err(SError::ServerUnreachable(_))
    ));
    assert!(registry.profile_names().is_empty());
}

#[test]
fn test_second_sync_is_rejected_while_one_runs() {
    let (_tmp, paths, index) = alpha_store();
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let directory = Arc::new(BlockingServer {
        entered: entered.clone(),
        release: release.clone(),
    });
    let registry = Arc::new(open_registry(&paths, index, directory));

    let first = {
        let registry = registry.clone();
        thread::spawn(move || registry.sync_with_server("10.0.0.1:7777"))
    };
    entered.wait();
    assert!(matches!(
        registry.sync_with_server("10.0.0.1:7777"),
        Err(SError::SyncInProgress)
    ));
    release.wait();

    assert!(matches!(
        first.join().unwrap(),
        Err(SError::ServerUnreachable(_))
    ));
}

#[test]
fn test_vanished_version_stays_available_when_indexed() {
    let (_tmp, paths, index) = alpha_store();
    let extra = pak_path(&paths.downloads, DISABLED_PRIORITY, "Alpha", "2.0.0");
    write_pak_at(
        &extra,
        &indexed_descriptor("Alpha", "2.0.0", "server_and_client", ALPHA_INDEX),
    );
    let registry = open_registry(&paths, index, Arc::new(FixedServer(None)));
    registry.reconcile().unwrap();
    registry.refresh_index_files().unwrap();
    // the copy in the install directory stays the installed one
    assert_eq!(registry.mods()[0].version, "1.0.0");

    std::fs::remove_file(&extra).unwrap();
    registry.reconcile().unwrap();

    let library = registry.library();
    let lib = library.lock();
    let alpha = lib.find("Alpha").unwrap();
    assert!(!alpha.all_versions.contains_key(&v("2.0.0")));
    assert!(alpha.available_versions.contains(&v("2.0.0")));
    assert_eq!(alpha.installed_version, v("1.0.0"));
}
