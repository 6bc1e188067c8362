mod os;
mod paths;

pub use os::OperatingSystem;
pub use paths::{AppPaths, AppPathsError, HOME_OVERRIDE_VAR};
