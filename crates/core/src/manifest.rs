//! Generation names and asset manifests.

use std::fmt;

use url::Url;

use crate::Error;

/// Name of one versioned snapshot of cached resources.
///
/// Bumping it is how a deployment invalidates every older generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheGeneration(String);

impl CacheGeneration {
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("generation name must not be empty".to_string()));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for CacheGeneration {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Absolute URLs pre-cached on install, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    urls: Vec<String>,
}

impl AssetManifest {
    /// Build a manifest from URLs that are already absolute.
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { urls: urls.into_iter().map(Into::into).collect() }
    }

    /// Resolve site-relative entries (`/app/index.html`) against an origin.
    pub fn resolve<I, S>(origin: &Url, entries: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls = entries
            .into_iter()
            .map(|entry| {
                let entry = entry.as_ref();
                origin
                    .join(entry)
                    .map(String::from)
                    .map_err(|e| Error::InvalidUrl(format!("{entry}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { urls })
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
