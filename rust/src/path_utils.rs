use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "logo_studio.toml";

pub fn get_base_dir() -> PathBuf {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if has_config_candidate(&exe_dir) {
        return exe_dir;
    }

    if let Ok(cwd) = env::current_dir() {
        if has_config_candidate(&cwd) {
            return cwd;
        }
    }

    exe_dir
}

pub fn resolve_config_path(raw: Option<String>, base_dir: &Path) -> PathBuf {
    if let Some(path) = raw {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            return path;
        }
        if let Ok(cwd) = env::current_dir() {
            return cwd.join(path);
        }
        return path;
    }

    config_candidates(base_dir)
        .into_iter()
        .find(|path| path.exists())
        .unwrap_or_else(|| base_dir.join(CONFIG_FILE_NAME))
}

fn config_candidates(base_dir: &Path) -> [PathBuf; 2] {
    [
        base_dir.join(CONFIG_FILE_NAME),
        base_dir.join("config").join(CONFIG_FILE_NAME),
    ]
}

fn has_config_candidate(base_dir: &Path) -> bool {
    config_candidates(base_dir).iter().any(|path| path.exists())
}
