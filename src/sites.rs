use std::path::Path;

use tracing::info;

use crate::error::ConfigError;
use crate::models::Site;

/// Loads the monitoring targets from a JSON array of `{"url": ...}` records.
///
/// A missing or malformed file, an entry whose url does not parse as an absolute
/// http(s) URL, or an empty list are all startup errors.
pub fn load_sites(path: &Path) -> Result<Vec<Site>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::SiteListRead {
        path: path.to_path_buf(),
        source,
    })?;
    let sites: Vec<Site> = serde_json::from_str(&raw).map_err(|source| ConfigError::SiteListParse {
        path: path.to_path_buf(),
        source,
    })?;

    for (index, site) in sites.iter().enumerate() {
        validate_url(&site.url).map_err(|details| ConfigError::InvalidSiteUrl {
            index,
            url: site.url.clone(),
            details,
        })?;
    }

    if sites.is_empty() {
        return Err(ConfigError::EmptySiteList);
    }

    info!(count = sites.len(), path = %path.display(), "Loaded site list");
    Ok(sites)
}

fn validate_url(url: &str) -> Result<(), String> {
    let parsed = reqwest::Url::parse(url).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(()),
        "http" | "https" => Err("missing host".into()),
        other => Err(format!("unsupported scheme {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn site_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_sites_in_file_order() {
        let file = site_file(
            r#"[
                {"url": "https://ok.example"},
                {"url": "https://down.example", "name": "Down"}
            ]"#,
        );
        let sites = load_sites(file.path()).unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].url, "https://ok.example");
        assert_eq!(sites[1].name.as_deref(), Some("Down"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_sites(&dir.path().join("sites.json")).unwrap_err();
        assert!(matches!(err, ConfigError::SiteListRead { .. }));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let file = site_file(r#"[{"url": "https://ok.example"},"#);
        let err = load_sites(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::SiteListParse { .. }));

        let file = site_file(r#"[{"name": "no url"}]"#);
        let err = load_sites(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::SiteListParse { .. }));
    }

    #[test]
    fn empty_list_is_rejected() {
        let file = site_file("[]");
        let err = load_sites(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptySiteList));
    }

    #[test]
    fn rejects_urls_that_cannot_be_fetched() {
        let file = site_file(r#"[{"url": "https://ok.example"}, {"url": "ok.example"}]"#);
        let err = load_sites(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSiteUrl { index: 1, .. }));

        let file = site_file(r#"[{"url": "ftp://files.example"}]"#);
        let err = load_sites(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSiteUrl { index: 0, .. }));
    }
}
