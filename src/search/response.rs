//! Serde schema for the slice of the SerpAPI response the engine consumes.
//!
//! Only the link-bearing fields are modeled; everything else in the
//! provider's payload is ignored by `#[serde(default)]` plus deny-nothing
//! deserialization.

use std::collections::HashSet;

use serde::Deserialize;

/// Results requested per page (`num` query parameter).
///
/// Page N maps to result offset `N * RESULTS_PER_PAGE`.
pub const RESULTS_PER_PAGE: usize = 100;

/// One page of search results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    /// Primary organic results.
    #[serde(default)]
    pub organic_results: Vec<OrganicResult>,

    /// Auxiliary related-result section, when the provider includes one.
    #[serde(default)]
    pub related_results: Vec<LinkedResult>,
}

/// A single organic result with its optional sitelink sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganicResult {
    /// Landing URL of the result.
    #[serde(default)]
    pub link: Option<String>,

    /// Inline and expanded sitelinks attached to the result.
    #[serde(default)]
    pub sitelinks: Option<Sitelinks>,
}

/// Sitelink sections nested under an organic result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sitelinks {
    /// Inline sitelinks.
    #[serde(default)]
    pub inline: Vec<LinkedResult>,

    /// Expanded sitelinks.
    #[serde(default)]
    pub expanded: Vec<LinkedResult>,
}

/// A bare linked result (sitelink or related result).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkedResult {
    /// Landing URL of the linked result.
    #[serde(default)]
    pub link: Option<String>,
}

impl SearchPage {
    /// Builds a page of bare organic results, one per URL.
    ///
    /// Handy for scripted providers in tests.
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            organic_results: urls
                .into_iter()
                .map(|u| OrganicResult {
                    link: Some(u.into()),
                    sitelinks: None,
                })
                .collect(),
            related_results: Vec::new(),
        }
    }

    /// Unions every URL found across all result sections of this page.
    ///
    /// URLs are opaque strings; equality is exact string match with no
    /// normalization.
    #[must_use]
    pub fn urls(&self) -> HashSet<String> {
        let mut urls = HashSet::new();
        for result in &self.organic_results {
            if let Some(link) = &result.link {
                urls.insert(link.clone());
            }
            if let Some(sitelinks) = &result.sitelinks {
                for linked in sitelinks.inline.iter().chain(&sitelinks.expanded) {
                    if let Some(link) = &linked.link {
                        urls.insert(link.clone());
                    }
                }
            }
        }
        for linked in &self.related_results {
            if let Some(link) = &linked.link {
                urls.insert(link.clone());
            }
        }
        urls
    }
}
