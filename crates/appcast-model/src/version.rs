use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Width every digit run is left-padded to before comparison.
const PAD_WIDTH: usize = 10;

/// Comparable form of a version string.
///
/// Accepts strict semantic versions (`2.0.0-beta.3+build.7`) as well as legacy
/// dotted numbers (`1.2.3.4`). The string is split at the first `-` or `+`:
/// everything before is the numeric part, everything from that character on is
/// the suffix. Parsing never fails; malformed input simply compares as padded
/// text.
///
/// Ordering compares the numeric parts with every digit run zero-padded to ten
/// places, then ranks a release (empty suffix) above any pre-release, then
/// compares the padded suffixes. Equality and hashing use the same padded
/// forms, so `1.02` and `1.2` are equal keys while keeping their raw text.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VersionKey {
    raw: String,
    suffix_start: usize,
    padded_numeric: String,
    padded_suffix: String,
}

impl VersionKey {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        let suffix_start = raw.find(['-', '+']).unwrap_or(raw.len());
        let padded_numeric = pad_digit_runs(&raw[..suffix_start]);
        let padded_suffix = pad_digit_runs(&raw[suffix_start..]);
        Self {
            raw,
            suffix_start,
            padded_numeric,
            padded_suffix,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn numeric_part(&self) -> &str {
        &self.raw[..self.suffix_start]
    }

    /// Raw suffix including its leading `-` or `+`, or `""` for a release.
    #[must_use]
    pub fn suffix_part(&self) -> &str {
        &self.raw[self.suffix_start..]
    }

    #[must_use]
    pub fn is_release(&self) -> bool {
        self.suffix_part().is_empty()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

fn pad_digit_runs(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + PAD_WIDTH * 3);
    let mut digits = String::new();

    for ch in input.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else {
            flush_digit_run(&mut out, &mut digits);
            out.push(ch);
        }
    }
    flush_digit_run(&mut out, &mut digits);

    out
}

fn flush_digit_run(out: &mut String, digits: &mut String) {
    if digits.is_empty() {
        return;
    }
    for _ in digits.len()..PAD_WIDTH {
        out.push('0');
    }
    out.push_str(digits);
    digits.clear();
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.padded_numeric
            .cmp(&other.padded_numeric)
            .then_with(|| self.is_release().cmp(&other.is_release()))
            .then_with(|| self.padded_suffix.cmp(&other.padded_suffix))
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionKey {
    fn eq(&self, other: &Self) -> bool {
        self.padded_numeric == other.padded_numeric && self.padded_suffix == other.padded_suffix
    }
}

impl Eq for VersionKey {}

impl Hash for VersionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.padded_numeric.hash(state);
        self.padded_suffix.hash(state);
    }
}

impl Default for VersionKey {
    fn default() -> Self {
        Self::parse("")
    }
}

impl FromStr for VersionKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for VersionKey {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for VersionKey {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<VersionKey> for String {
    fn from(value: VersionKey) -> Self {
        value.raw
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionKey({:?})", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;
    use std::collections::HashSet;

    use super::{VersionKey, pad_digit_runs};

    fn key(raw: &str) -> VersionKey {
        VersionKey::parse(raw)
    }

    #[test]
    fn splits_at_first_dash_or_plus() {
        let version = key("2.0.0-beta.3+build.7");
        assert_eq!(version.numeric_part(), "2.0.0");
        assert_eq!(version.suffix_part(), "-beta.3+build.7");

        let build_only = key("1.4+20240101");
        assert_eq!(build_only.numeric_part(), "1.4");
        assert_eq!(build_only.suffix_part(), "+20240101");

        let release = key("1.2.3.4");
        assert_eq!(release.numeric_part(), "1.2.3.4");
        assert_eq!(release.suffix_part(), "");
        assert!(release.is_release());
    }

    #[test]
    fn pads_every_digit_run() {
        assert_eq!(
            pad_digit_runs("1.2.3"),
            "0000000001.0000000002.0000000003"
        );
        assert_eq!(pad_digit_runs("100.0"), "0000000100.0000000000");
        assert_eq!(pad_digit_runs("-beta.2"), "-beta.0000000002");
        assert_eq!(pad_digit_runs(""), "");
    }

    #[test]
    fn compares_numerically_not_lexically() {
        assert!(key("1.9.0") < key("1.10.0"));
        assert!(key("2.0") > key("1.99.99"));
        assert!(key("10.0.0") > key("9.0.0"));
    }

    #[test]
    fn release_sorts_after_prerelease() {
        assert!(key("1.0.0") > key("1.0.0-beta.1"));
        assert!(key("1.0.0") > key("1.0.0-rc.9"));
        assert!(key("1.0.0") > key("1.0.0+build.1"));
        assert!(key("1.0.1-alpha") > key("1.0.0"));
    }

    #[test]
    fn prerelease_suffixes_compare_padded() {
        assert!(key("1.0.0-beta.2") < key("1.0.0-beta.10"));
        assert!(key("1.0.0-alpha") < key("1.0.0-beta"));
    }

    #[test]
    fn equal_keys_compare_equal_and_hash_equal() {
        let a = key("1.02.0");
        let b = key("1.2.0");
        assert_eq!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "1.02.0");

        let set: HashSet<VersionKey> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn malformed_input_still_parses() {
        let garbage = key("not a version!");
        assert_eq!(garbage.numeric_part(), "not a version!");
        assert!(key("") < key("0.0.1"));
        assert!(key("").is_empty());
    }

    #[test]
    fn ordering_is_total_over_mixed_inputs() {
        let samples = [
            "1.0.0",
            "1.0.0-beta.1",
            "1.0.0-beta.2",
            "1.0",
            "1.10",
            "1.9.9",
            "2.0.0+build",
            "",
            "abc",
            "1.0.0.0",
        ];
        let keys: Vec<VersionKey> = samples.iter().map(|raw| key(raw)).collect();

        for a in &keys {
            assert_eq!(a.cmp(a), Ordering::Equal);
            for b in &keys {
                assert_eq!(a.cmp(b), b.cmp(a).reverse(), "antisymmetry for {a} / {b}");
                assert_eq!(a.cmp(b) == Ordering::Equal, a == b);
                for c in &keys {
                    if a <= b && b <= c {
                        assert!(a <= c, "transitivity for {a} <= {b} <= {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn serializes_as_raw_string() {
        let version = key("3.1.0-rc.1");
        let json = serde_json::to_string(&version).expect("version should serialize");
        assert_eq!(json, "\"3.1.0-rc.1\"");

        let parsed: VersionKey = serde_json::from_str(&json).expect("version should deserialize");
        assert_eq!(parsed, version);
    }
}
