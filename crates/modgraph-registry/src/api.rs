//! Response model of the registry's `/v3/releases` endpoint.

use modgraph_core::metadata::MetadataDependency;
use modgraph_core::release::{normalize_name, Origin, Release};
use modgraph_core::version::parse_version;
use modgraph_resolver::source::SourceError;
use serde::Deserialize;

/// Releases requested per page.
pub const PAGE_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ReleasesPage {
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default)]
    pub results: Vec<ReleaseEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    /// Path (or absolute URL) of the next page.
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseEntry {
    pub version: String,
    #[serde(default)]
    pub file_uri: String,
    #[serde(default)]
    pub metadata: Option<EntryMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct EntryMetadata {
    #[serde(default)]
    pub dependencies: Vec<MetadataDependency>,
}

/// One page of releases, converted.
#[derive(Debug)]
pub struct Page {
    pub releases: Vec<Release>,
    pub next: Option<String>,
}

/// Parse a page of releases of `module`.
///
/// Entries with an unparseable version or requirement are skipped with a
/// warning; a body that is not a releases page fails as a whole.
pub fn parse_page(module: &str, body: &str) -> Result<Page, SourceError> {
    let page: ReleasesPage = serde_json::from_str(body).map_err(|e| SourceError::Malformed {
        module: module.to_string(),
        message: e.to_string(),
    })?;

    let name = normalize_name(module);
    let mut releases = Vec::with_capacity(page.results.len());
    'entries: for entry in page.results {
        let version = match parse_version(&entry.version) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("skipping release of {name}: {e}");
                continue;
            }
        };
        let mut release = Release::new(
            &name,
            version,
            Origin::Registry {
                file_uri: entry.file_uri,
            },
        );
        for dep in entry.metadata.map(|m| m.dependencies).unwrap_or_default() {
            match dep.range() {
                Ok(range) => release = release.with_requirement(&dep.name, range),
                Err(e) => {
                    tracing::warn!("skipping {name} v{}: {e}", release.version);
                    continue 'entries;
                }
            }
        }
        releases.push(release);
    }

    Ok(Page {
        releases,
        next: page.pagination.next.filter(|n| !n.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dependencies_and_next() {
        let body = r#"{
            "pagination": { "next": "/v3/releases?module=alice-apollo&offset=100" },
            "results": [
                {
                    "version": "0.0.2",
                    "file_uri": "/v3/files/alice-apollo-0.0.2.tar.gz",
                    "metadata": {
                        "dependencies": [
                            { "name": "alice/java", "version_requirement": ">= 1.7.0" },
                            { "name": "alice/stdlib" }
                        ]
                    }
                }
            ]
        }"#;
        let page = parse_page("alice/apollo", body).unwrap();
        assert_eq!(page.next.as_deref(), Some("/v3/releases?module=alice-apollo&offset=100"));
        let release = &page.releases[0];
        assert_eq!(release.name, "alice-apollo");
        assert_eq!(release.requirements["alice-java"].to_string(), ">= 1.7.0");
        assert!(release.requirements.contains_key("alice-stdlib"));
        assert_eq!(
            release.origin,
            Origin::Registry {
                file_uri: "/v3/files/alice-apollo-0.0.2.tar.gz".to_string()
            }
        );
    }

    #[test]
    fn skips_bad_entries() {
        let body = r#"{
            "pagination": { "next": null },
            "results": [
                { "version": "not-a-version" },
                { "version": "1.0.0", "metadata": { "dependencies": [
                    { "name": "alice-x", "version_requirement": ">>> what" }
                ] } },
                { "version": "1.1.0" }
            ]
        }"#;
        let page = parse_page("alice-lib", body).unwrap();
        assert!(page.next.is_none());
        assert_eq!(page.releases.len(), 1);
        assert_eq!(page.releases[0].version.to_string(), "1.1.0");
    }

    #[test]
    fn rejects_non_json() {
        let err = parse_page("alice-lib", "<html>").unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }
}
