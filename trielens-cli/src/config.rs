//! Config file handling.
//!
//! An optional `trielens.toml` in the working directory (or a path given
//! via `--config`) supplies default render options; command-line flags
//! override it field by field.

use std::io::ErrorKind;
use std::path::Path;

use trielens_core::{LayoutMode, RenderOptions};

use crate::cli::Cli;
use crate::error::{CliError, CliResult};

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = "trielens.toml";

/// Load render options from the config file, if any.
///
/// An explicit `--config` path must exist and parse; the implicit
/// `trielens.toml` is optional.
pub fn load(path: Option<&Path>) -> CliResult<Option<RenderOptions>> {
    let (text, source) = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .map_err(|e| CliError::Config(format!("cannot read {}: {e}", p.display())))?;
            (text, p.display().to_string())
        }
        None => match std::fs::read_to_string(CONFIG_FILE) {
            Ok(text) => (text, CONFIG_FILE.to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CliError::Config(format!("cannot read {CONFIG_FILE}: {e}")))
            }
        },
    };
    let options = toml::from_str(&text).map_err(|e| CliError::Config(format!("{source}: {e}")))?;
    Ok(Some(options))
}

/// Merge command-line flags over file config over built-in defaults.
pub fn resolve_options(cli: &Cli, file: Option<RenderOptions>) -> RenderOptions {
    let mut options = file.unwrap_or_default();
    if cli.cluster {
        options.layout = LayoutMode::Cluster;
    }
    if let Some(x_scale) = cli.x_scale {
        options.x_scale = x_scale;
    }
    if let Some(y_scale) = cli.y_scale {
        options.y_scale = y_scale;
    }
    if cli.show_storage {
        options.show_storage_nodes = true;
    }
    if let Some(truncate) = cli.truncate {
        options.value_truncation = (truncate > 0).then_some(truncate);
    }
    options
}
