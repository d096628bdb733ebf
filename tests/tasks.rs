mod common;

use common::*;
use pak_keeper_lib::core::guard::{GameDetector, ReadOnlyGuard};
use pak_keeper_lib::core::pak_name::DISABLED_PRIORITY;
use pak_keeper_lib::core::tasks::{BackgroundTasks, TaskTiming};
use pak_keeper_lib::models::mod_dto::{ModEdit, VersionChoice};
use std::sync::Arc;
use std::time::Duration;

struct NeverRunning;

impl GameDetector for NeverRunning {
    fn is_game_running(&mut self) -> bool {
        false
    }
}

fn fast_timing() -> TaskTiming {
    TaskTiming {
        reconcile: Duration::from_millis(100),
        index_refresh: Duration::from_secs(60),
        read_only_poll: Duration::from_millis(50),
        edit_debounce: Duration::from_millis(50),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_loops_pick_up_changes() {
    let (_tmp, paths) = setup_store();
    let registry = Arc::new(offline_registry(&paths));
    let guard = ReadOnlyGuard::new(registry.read_only_flag(), Box::new(NeverRunning));
    let tasks = BackgroundTasks::spawn(registry.clone(), guard, fast_timing());

    // a package dropped into the download directory shows up after a reconcile tick
    write_plain_pak(&paths.downloads, DISABLED_PRIORITY, "Alpha", "1.0");
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(registry.mods().len(), 1);

    registry.queue_edit(ModEdit {
        mod_id: "Alpha".to_string(),
        enabled: true,
        version: VersionChoice::Exact(v("1.0")),
    });
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(registry.mods()[0].enabled);
    assert!(pak_path(&paths.install, 1, "Alpha", "1.0").exists());

    tasks.shutdown();
}
