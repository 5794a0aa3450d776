use std::path::{Path, PathBuf};

/// Looks up an executable by name on `PATH`.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let raw = std::env::var_os("PATH")?;
    std::env::split_paths(&raw).find_map(|dir| executable_in(&dir, name))
}

fn executable_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let candidate = dir.join(name);
    if candidate.is_file() {
        return Some(candidate);
    }
    if cfg!(windows) {
        let exe = candidate.with_extension("exe");
        if exe.is_file() {
            return Some(exe);
        }
    }
    None
}
