use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use sysinfo::{Process, System};

pub struct ProcessChecker;

impl ProcessChecker {
    /// Whether any of the game binaries is running. `sys` is refreshed in place.
    ///
    /// An absolute target matches a process whose executable resolves to the same file. A bare
    /// file name matches the process name.
    pub fn is_running<P: AsRef<Path>>(sys: &mut System, target_paths: &[P]) -> bool {
        sys.refresh_processes();

        let targets: Vec<PathBuf> = target_paths.iter().map(Self::canonical).collect();
        sys.processes()
            .values()
            .any(|p| targets.iter().any(|target| Self::matches(p, target)))
    }

    fn matches(process: &Process, target: &Path) -> bool {
        if target.is_absolute() {
            return process.exe().is_some_and(|exe| exe == target);
        }
        target
            .file_name()
            .is_some_and(|name| name == OsStr::new(process.name()))
    }

    fn canonical<P: AsRef<Path>>(path: P) -> PathBuf {
        let path = path.as_ref();
        if !path.is_absolute() {
            return path.to_path_buf();
        }
        dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_current_executable_by_path() {
        let mut sys = System::new();
        let me = std::env::current_exe().unwrap();
        assert!(ProcessChecker::is_running(&mut sys, &[me]));
    }

    #[test]
    fn unknown_binaries_are_not_running() {
        let mut sys = System::new();
        let missing = std::env::temp_dir().join("no-such-dir").join("AstroServer.exe");
        assert!(!ProcessChecker::is_running(&mut sys, &[missing]));
        assert!(!ProcessChecker::is_running(
            &mut sys,
            &[PathBuf::from("definitely-not-a-game.exe")]
        ));
    }
}
