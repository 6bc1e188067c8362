use crate::manifest::ManifestItem;
use crate::version::VersionKey;

/// Caller-supplied selection and ordering of candidate updates.
///
/// Implementations must be pure functions of their inputs. A filter replaces
/// the pipeline's own "newer than installed" check, so it decides for itself
/// which versions are too old, and its output order is final.
pub trait ManifestFilter: Send + Sync {
    fn filter(&self, installed: &VersionKey, items: Vec<ManifestItem>) -> Vec<ManifestItem>;
}

impl<F> ManifestFilter for F
where
    F: Fn(&VersionKey, Vec<ManifestItem>) -> Vec<ManifestItem> + Send + Sync,
{
    fn filter(&self, installed: &VersionKey, items: Vec<ManifestItem>) -> Vec<ManifestItem> {
        self(installed, items)
    }
}
