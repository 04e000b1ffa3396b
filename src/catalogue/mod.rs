//! Data structures and traits for the DR TV catalogue.
//!
//! This module provides structures to represent program cards, season
//! listings, episode details and bundle relations as returned by the DR
//! REST endpoints, as well as the `Catalogue` trait the rest of the crate
//! talks to.
mod dr;
mod dr_types;

pub use dr::DrCatalogue;

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

/// Errors that can occur while talking to the catalogue.
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// The URL does not end in a usable program slug
    #[error("Could not extract a program slug from URL: {0}")]
    InvalidUrl(String),

    /// Request to the catalogue failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the catalogue's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// A field required for the requested operation was absent
    #[error("API response is missing field '{field}' for {context}")]
    MissingField {
        field: &'static str,
        context: String,
    },
}

impl CatalogueError {
    pub(crate) fn missing(field: &'static str, context: impl Into<String>) -> Self {
        CatalogueError::MissingField {
            field,
            context: context.into(),
        }
    }
}

/// Metadata record for a single program (episode) in the catalogue.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramCard {
    /// Unique resource name of the program
    pub urn: String,
    /// URL slug of the program
    pub slug: String,
    /// Resource name of the series the program belongs to, if any
    pub series_urn: Option<String>,
    /// Title of the series
    pub series_title: String,
    /// Season number within the series, if known
    pub season_number: Option<u32>,
    /// Title of the program itself
    pub title: String,
    /// Streamable URI; absent while the program is not yet released
    pub presentation_uri: Option<String>,
    /// Announced (or actual) broadcast time
    pub sort_date_time: Option<DateTime<FixedOffset>>,
}

impl ProgramCard {
    /// Returns the series URN or a `MissingField` error naming this card.
    pub fn require_series_urn(&self) -> Result<&str, CatalogueError> {
        self.series_urn
            .as_deref()
            .ok_or_else(|| CatalogueError::missing("SeriesUrn", &self.slug))
    }

    /// Views this card as an entry of a season listing.
    pub fn as_episode(&self) -> EpisodeRef {
        EpisodeRef {
            urn: self.urn.clone(),
            slug: self.slug.clone(),
            series_title: self.series_title.clone(),
            title: self.title.clone(),
            presentation_uri: self.presentation_uri.clone(),
            duration_ms: None,
        }
    }
}

/// An episode entry inside a season listing.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRef {
    pub urn: String,
    pub slug: String,
    pub series_title: String,
    pub title: String,
    /// Absent for episodes that have been announced but not published
    pub presentation_uri: Option<String>,
    pub duration_ms: Option<f64>,
}

/// A season of a series with its episodes in catalogue order.
#[derive(Debug, Clone, PartialEq)]
pub struct Season {
    pub season_number: u32,
    pub episodes: Vec<EpisodeRef>,
}

/// Broadcast details from the legacy per-episode endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeDetails {
    /// Original broadcast title of the show, if the broadcaster knows one
    pub original_title: Option<String>,
    /// Season number (1 when the broadcaster omits it)
    pub season_number: u32,
    pub episode_number: u32,
}

/// A relation of a series bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleMember {
    pub slug: String,
    pub kind: String,
    /// Set for nested bundles (e.g. seasons), absent for plain programs
    pub bundle_type: Option<String>,
}

impl BundleMember {
    /// True for plain member programs, false for typed sub-bundles.
    pub fn is_plain_member(&self) -> bool {
        self.kind == "Member" && self.bundle_type.is_none()
    }
}

/// Trait for catalogue backends.
///
/// Every call issues exactly one request; nothing is cached between calls.
pub trait Catalogue {
    /// Fetches the program card for a slug.
    fn program_card(&self, slug: &str) -> Result<ProgramCard, CatalogueError>;

    /// Fetches the full season listing of a series.
    fn seasons(&self, series_urn: &str) -> Result<Vec<Season>, CatalogueError>;

    /// Fetches broadcast details for an episode from the legacy endpoint.
    fn episode_details(&self, urn: &str) -> Result<EpisodeDetails, CatalogueError>;

    /// Fetches the relations of a series bundle.
    fn bundle_members(&self, series_urn: &str) -> Result<Vec<BundleMember>, CatalogueError>;
}

impl<C: Catalogue + ?Sized> Catalogue for Box<C> {
    fn program_card(&self, slug: &str) -> Result<ProgramCard, CatalogueError> {
        (**self).program_card(slug)
    }

    fn seasons(&self, series_urn: &str) -> Result<Vec<Season>, CatalogueError> {
        (**self).seasons(series_urn)
    }

    fn episode_details(&self, urn: &str) -> Result<EpisodeDetails, CatalogueError> {
        (**self).episode_details(urn)
    }

    fn bundle_members(&self, series_urn: &str) -> Result<Vec<BundleMember>, CatalogueError> {
        (**self).bundle_members(series_urn)
    }
}

/// Extracts the program slug (the trailing path segment) from a catalogue URL.
///
/// Query strings, fragments and a trailing slash are ignored.
pub fn slug_from_url(url: &str) -> Result<&str, CatalogueError> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.trim_end_matches('/');
    let slug = match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    };

    if slug.is_empty() || slug.contains(':') {
        return Err(CatalogueError::InvalidUrl(url.to_string()));
    }

    Ok(slug)
}

/// Resolves a catalogue URL to its program card.
pub fn resolve_url<C: Catalogue + ?Sized>(
    catalogue: &C,
    url: &str,
) -> Result<ProgramCard, CatalogueError> {
    let slug = slug_from_url(url)?;
    catalogue.program_card(slug)
}
