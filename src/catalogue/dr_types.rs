/// DR API response types for deserialization.
///
/// These structures mirror the JSON response format of the DR endpoints.
/// Every field the crate reads is optional here; required-ness is decided
/// when converting into the catalogue types.
use serde::Deserialize;

/// Program card from the mu-online endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DrProgramCard {
    pub urn: Option<String>,
    pub slug: Option<String>,
    pub series_urn: Option<String>,
    pub series_title: Option<String>,
    pub season_number: Option<u32>,
    pub title: Option<String>,
    pub presentation_uri: Option<String>,
    pub sort_date_time: Option<String>,
}

/// Response of the seasons list view.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DrSeasonList {
    #[serde(default)]
    pub items: Vec<DrSeason>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DrSeason {
    pub season_number: Option<u32>,
    pub episodes: Option<DrEpisodeList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DrEpisodeList {
    #[serde(default)]
    pub items: Vec<DrEpisode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DrEpisode {
    pub urn: Option<String>,
    pub slug: Option<String>,
    pub series_title: Option<String>,
    pub title: Option<String>,
    pub presentation_uri: Option<String>,
    pub primary_asset: Option<DrAsset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DrAsset {
    pub duration_in_milliseconds: Option<f64>,
}

/// Envelope used by the legacy `mu` endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DrDataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Program card from the legacy endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DrLegacyCard {
    #[serde(default)]
    pub broadcasts: Vec<DrBroadcast>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DrBroadcast {
    pub original_title: Option<String>,
}

/// Series bundle from the legacy endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DrBundle {
    #[serde(default)]
    pub relations: Vec<DrRelation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DrRelation {
    pub slug: Option<String>,
    pub kind: Option<String>,
    pub bundle_type: Option<String>,
}
