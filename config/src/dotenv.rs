//! Read a project `.env` into a key-value map. Applying to the process env happens in lib.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// `.env` in `override_dir` if given, else in the current directory.
fn dotenv_path(override_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = override_dir
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())?;
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

/// Load `.env` from `override_dir` or the current directory. Missing file returns an empty map.
///
/// Parsing is delegated to the `dotenv` crate; nothing is written to the environment here.
pub fn load_env_map(override_dir: Option<&Path>) -> Result<HashMap<String, String>, ::dotenv::Error> {
    let Some(path) = dotenv_path(override_dir) else {
        return Ok(HashMap::new());
    };
    let mut out = HashMap::new();
    for item in ::dotenv::from_path_iter(&path)? {
        let (key, value) = item?;
        if !key.is_empty() {
            out.insert(key, value);
        }
    }
    Ok(out)
}
