//! Candidate selection.
//!
//! [`filter_updates`] applies a fixed sequence of stages to each item and
//! keeps the items that pass all of them. A caller-supplied
//! [`ManifestFilter`] runs last and takes over version-floor decisions and
//! ordering; [`ChannelFilter`] is the stock implementation.

use std::fmt;

use log::debug;

use appcast_model::{ManifestFilter, ManifestItem, OperatingSystem, TrustPolicy, VersionKey};

/// Switches for the optional pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    /// Platform whose items are eligible. Defaults to the running OS.
    pub platform: OperatingSystem,
    pub remove_items_without_version: bool,
    pub remove_items_without_download_link: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            platform: OperatingSystem::current(),
            remove_items_without_version: false,
            remove_items_without_download_link: false,
        }
    }
}

impl FilterOptions {
    #[must_use]
    pub fn for_platform(platform: OperatingSystem) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Platform,
    NotNewer,
    MissingSignature,
    MissingVersion,
    MissingDownloadLink,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Platform => write!(f, "built for another platform"),
            Self::NotNewer => write!(f, "not newer than the installed version"),
            Self::MissingSignature => write!(f, "download signature required but missing"),
            Self::MissingVersion => write!(f, "no version"),
            Self::MissingDownloadLink => write!(f, "no download link"),
        }
    }
}

/// Select the items that are valid update candidates.
///
/// Stages run in this order and the first failure rejects the item:
/// platform, version floor (only when no `custom` filter is supplied),
/// signature presence for software downloads, then the optional
/// missing-version and missing-link checks. Survivors keep their input order
/// unless `custom` reorders them.
#[must_use]
pub fn filter_updates(
    items: Vec<ManifestItem>,
    installed: &VersionKey,
    policy: TrustPolicy,
    options: &FilterOptions,
    custom: Option<&dyn ManifestFilter>,
) -> Vec<ManifestItem> {
    let signature_needed = policy.is_signature_needed(true);

    let survivors: Vec<ManifestItem> = items
        .into_iter()
        .filter(|item| {
            match rejection(item, installed, signature_needed, options, custom.is_some()) {
                Some(reason) => {
                    debug!("Skipping update {}: {reason}", item.version);
                    false
                }
                None => true,
            }
        })
        .collect();

    match custom {
        Some(custom) => custom.filter(installed, survivors),
        None => survivors,
    }
}

fn rejection(
    item: &ManifestItem,
    installed: &VersionKey,
    signature_needed: bool,
    options: &FilterOptions,
    has_custom_filter: bool,
) -> Option<Rejection> {
    if !item.targets(options.platform) {
        return Some(Rejection::Platform);
    }
    if !has_custom_filter && item.version <= *installed {
        return Some(Rejection::NotNewer);
    }
    if signature_needed && item.has_download_link() && !item.has_download_signature() {
        return Some(Rejection::MissingSignature);
    }
    if options.remove_items_without_version && !item.has_version() {
        return Some(Rejection::MissingVersion);
    }
    if options.remove_items_without_download_link && !item.has_download_link() {
        return Some(Rejection::MissingDownloadLink);
    }
    None
}

/// Keeps items published on the requested release channels.
///
/// An item belongs to a channel when its version suffix contains the channel
/// name (`beta` matches `2.0.0-beta.3`) or its channel tag does, ignoring
/// case. The result is sorted newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFilter {
    channels: Vec<String>,
    /// Also keep plain releases such as `2.0.0`.
    pub keep_items_with_no_suffix: bool,
    /// Drop items at or below the installed version.
    pub remove_older_items: bool,
}

impl ChannelFilter {
    #[must_use]
    pub fn new<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            channels: channels
                .into_iter()
                .map(|channel| channel.as_ref().trim().to_lowercase())
                .filter(|channel| !channel.is_empty())
                .collect(),
            keep_items_with_no_suffix: true,
            remove_older_items: true,
        }
    }

    #[must_use]
    pub fn keep_items_with_no_suffix(mut self, keep: bool) -> Self {
        self.keep_items_with_no_suffix = keep;
        self
    }

    #[must_use]
    pub fn remove_older_items(mut self, remove: bool) -> Self {
        self.remove_older_items = remove;
        self
    }

    #[must_use]
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    fn matches_channel(&self, item: &ManifestItem) -> bool {
        let suffix = item.version.suffix_part().to_lowercase();
        let tag = item.channel.trim().to_lowercase();
        self.channels
            .iter()
            .any(|channel| suffix.contains(channel.as_str()) || tag.contains(channel.as_str()))
    }

    fn is_plain_release(item: &ManifestItem) -> bool {
        item.version.is_release() && item.channel.trim().is_empty()
    }
}

impl ManifestFilter for ChannelFilter {
    fn filter(&self, installed: &VersionKey, items: Vec<ManifestItem>) -> Vec<ManifestItem> {
        let mut kept: Vec<ManifestItem> = items
            .into_iter()
            .filter(|item| !self.remove_older_items || item.version > *installed)
            .filter(|item| {
                self.matches_channel(item)
                    || (self.keep_items_with_no_suffix && Self::is_plain_release(item))
            })
            .collect();

        kept.sort_by(|a, b| b.version.cmp(&a.version));
        kept
    }
}
