//! Semantic version helpers
//!
//! Git tags are free-form, so parsing is lenient: a leading `v` is accepted on
//! versions and inside requirements, and a bare version without an operator
//! pins the given precision (`1.1` means any `1.1.x`).

use semver::{Version, VersionReq};

/// Parse a version, accepting a leading `v`
pub fn parse_version_loose(raw: &str) -> Option<Version> {
    let t = raw.trim();
    let t = t.strip_prefix('v').unwrap_or(t);
    if t.is_empty() {
        return None;
    }
    Version::parse(t).ok()
}

fn is_req_boundary(ch: char) -> bool {
    ch.is_ascii_whitespace() || matches!(ch, ',' | '<' | '>' | '=' | '^' | '~')
}

fn strip_v_prefixes(raw: &str) -> String {
    let chars: Vec<char> = raw.trim().chars().collect();
    let mut out = String::with_capacity(chars.len());
    for (i, &ch) in chars.iter().enumerate() {
        if ch == 'v'
            && chars.get(i + 1).is_some_and(char::is_ascii_digit)
            && (i == 0 || is_req_boundary(chars[i - 1]))
        {
            continue;
        }
        out.push(ch);
    }
    out
}

fn starts_with_digit(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Parse a version requirement
///
/// `*` and `latest` match any release. A bare version (`1`, `1.2`, `v1.2.3`)
/// is exact at its precision. Anything else goes through `semver` syntax with
/// `v` prefixes removed, so `>=v1.0,<2` is accepted.
pub fn parse_version_req_loose(raw: &str) -> Option<VersionReq> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    if t == "*" || t.eq_ignore_ascii_case("latest") {
        return Some(VersionReq::STAR);
    }
    let normalized = strip_v_prefixes(t);
    if starts_with_digit(&normalized) && !normalized.contains(',') {
        return VersionReq::parse(&format!("={normalized}")).ok();
    }
    VersionReq::parse(&normalized).ok()
}

/// Format a version the way tags and dependency paths spell it
pub fn display_version(version: &Version) -> String {
    format!("v{version}")
}

/// One available version of a mod, as found on the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyVersion {
    pub version: Version,
    /// Tag name exactly as it appears on the remote (e.g. `v1.2.0`)
    pub tag: String,
    /// Commit the tag points at
    pub commit: String,
}

/// `req.matches`, except that a prerelease also satisfies any requirement
/// its release would
pub fn matches_with_prerelease(req: &VersionReq, version: &Version) -> bool {
    req.matches(version)
        || (!version.pre.is_empty()
            && req.matches(&Version::new(version.major, version.minor, version.patch)))
}

/// Available versions of a mod, sorted most recent first
///
/// The descending order is relied upon by resolution: the first entry that
/// satisfies a requirement is the highest satisfying version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyVersionList {
    versions: Vec<DependencyVersion>,
    include_prerelease: bool,
}

impl DependencyVersionList {
    /// Build from `(tag, commit)` pairs, discarding non-semver tags
    ///
    /// Unless `include_prerelease` is set, tags with prerelease or build
    /// metadata are dropped as well. When two tags parse to the same version
    /// (`1.0.0` and `v1.0.0`) the `v`-prefixed one is kept.
    pub fn from_tags<'a, I>(tags: I, include_prerelease: bool) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut versions: Vec<DependencyVersion> = tags
            .into_iter()
            .filter_map(|(tag, commit)| {
                let version = parse_version_loose(tag)?;
                let plain = version.pre.is_empty() && version.build.is_empty();
                (plain || include_prerelease).then(|| DependencyVersion {
                    version,
                    tag: tag.to_string(),
                    commit: commit.to_string(),
                })
            })
            .collect();

        versions.sort_by(|a, b| {
            b.version
                .cmp(&a.version)
                .then_with(|| b.tag.starts_with('v').cmp(&a.tag.starts_with('v')))
        });
        versions.dedup_by(|later, earlier| later.version == earlier.version);

        Self {
            versions,
            include_prerelease,
        }
    }

    fn satisfies(&self, req: &VersionReq, version: &Version) -> bool {
        if self.include_prerelease {
            matches_with_prerelease(req, version)
        } else {
            req.matches(version)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencyVersion> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Highest version satisfying `req`
    pub fn first_satisfying(&self, req: &VersionReq) -> Option<&DependencyVersion> {
        self.versions.iter().find(|v| self.satisfies(req, &v.version))
    }

    /// Highest version satisfying `req` that is strictly newer than `current`
    pub fn newer_satisfying(&self, current: &Version, req: &VersionReq) -> Option<&DependencyVersion> {
        self.first_satisfying(req).filter(|v| v.version > *current)
    }
}
