// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine default locations of the files guidebook reads and writes.

use std::path::PathBuf;

/// Determine default absolute path to configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/guidebook/config.toml`.
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("guidebook").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to local navigation document.
///
/// Uses XDG Base Directory path `$XDG_DATA_HOME/guidebook/db.json`. Does not
/// check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if data directory cannot be determined.
pub fn default_document_path() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join("guidebook").join("db.json"))
        .ok_or(NoWayHome)
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use sealed_test::prelude::*;

    #[cfg(target_os = "linux")]
    #[sealed_test(env = [
        ("HOME", "/home/blah"),
        ("XDG_CONFIG_HOME", "/home/blah/.config"),
        ("XDG_DATA_HOME", "/home/blah/.local/share")
    ])]
    fn default_paths_follow_xdg() -> anyhow::Result<()> {
        assert_eq!(
            default_config_path()?,
            PathBuf::from("/home/blah/.config/guidebook/config.toml")
        );
        assert_eq!(
            default_document_path()?,
            PathBuf::from("/home/blah/.local/share/guidebook/db.json")
        );

        Ok(())
    }
}
