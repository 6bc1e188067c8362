pub mod check;
pub mod convert;
pub mod keys;
pub mod skip;

use std::path::PathBuf;

use appcast_platform::AppPaths;

use crate::settings::UpdaterSettings;

/// Shared state handed to every command.
pub struct Context {
    pub paths: AppPaths,
    pub settings_path: PathBuf,
    pub settings: UpdaterSettings,
}
