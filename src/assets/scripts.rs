//! JavaScript bundling.
//!
//! Only the configured entry is bundled; every other `.js` file under the
//! input directory is a module the entry may import and gets no output of its
//! own. The bundler (stock `esbuild`) writes to stdout:
//!
//! ```text
//! esbuild <entry> --bundle --target=es2020 --minify
//! ```

use super::AssetError;
use crate::config::ScriptsConfig;
use crate::exec::Cmd;
use std::path::Path;

/// Whether `input_rel` is the configured bundle entry.
pub fn is_entry(input_rel: &str, config: &ScriptsConfig) -> bool {
    normalize(input_rel) == normalize(&config.entry)
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches("./")
}

/// Bundler arguments after the command vector.
pub fn bundle_args(entry: &Path, config: &ScriptsConfig) -> Vec<String> {
    let mut args = vec![
        entry.to_string_lossy().into_owned(),
        "--bundle".to_string(),
        format!("--target={}", config.target),
    ];
    if config.minify {
        args.push("--minify".to_string());
    }
    args
}

/// Bundle the entry and return the output bytes.
pub fn bundle(input_dir: &Path, config: &ScriptsConfig) -> Result<Vec<u8>, AssetError> {
    let entry = input_dir.join(normalize(&config.entry));
    if !entry.is_file() {
        return Err(AssetError::MissingEntry(entry));
    }
    let output = Cmd::from_slice(&config.command)
        .args(bundle_args(&entry, config))
        .cwd(input_dir)
        .run()?;
    Ok(output)
}
