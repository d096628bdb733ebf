use crate::utils::process::ProcessChecker;
use camino::Utf8PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sysinfo::System;
use tracing::info;

/// Answers whether the game currently holds the mod files.
pub trait GameDetector: Send {
    fn is_game_running(&mut self) -> bool;
}

/// Looks for the game's executables among running processes.
pub struct ProcessDetector {
    sys: System,
    binaries: Vec<Utf8PathBuf>,
}

impl ProcessDetector {
    pub fn new(binaries: Vec<Utf8PathBuf>) -> Self {
        Self {
            sys: System::new(),
            binaries,
        }
    }
}

impl GameDetector for ProcessDetector {
    fn is_game_running(&mut self) -> bool {
        ProcessChecker::is_running(&mut self.sys, &self.binaries)
    }
}

/// Flips the library's read-only flag to follow the game's running state.
pub struct ReadOnlyGuard {
    flag: Arc<AtomicBool>,
    detector: Box<dyn GameDetector>,
}

impl ReadOnlyGuard {
    pub fn new(flag: Arc<AtomicBool>, detector: Box<dyn GameDetector>) -> Self {
        Self { flag, detector }
    }

    /// Samples the detector once. Returns the new read-only state.
    pub fn poll(&mut self) -> bool {
        let running = self.detector.is_game_running();
        let previous = self.flag.swap(running, Ordering::AcqRel);
        if previous != running {
            if running {
                info!("game started, mods are read-only");
            } else {
                info!("game stopped, mods are writable again");
            }
        }
        running
    }

    pub fn is_read_only(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
