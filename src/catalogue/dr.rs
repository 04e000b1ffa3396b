/// DR REST API catalogue implementation.
use super::dr_types::{
    DrBundle, DrDataEnvelope, DrEpisode, DrLegacyCard, DrProgramCard, DrSeasonList,
};
use super::{
    BundleMember, Catalogue, CatalogueError, EpisodeDetails, EpisodeRef, ProgramCard, Season,
};
use crate::config::ApiEndpoints;
use chrono::DateTime;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Catalogue backed by the public DR endpoints.
///
/// Uses the mu-online API for program cards and season listings and the
/// older mu API for broadcast details and bundle relations.
pub struct DrCatalogue {
    client: reqwest::blocking::Client,
    endpoints: ApiEndpoints,
}

impl DrCatalogue {
    /// Creates a catalogue talking to the given endpoints.
    pub fn new(endpoints: ApiEndpoints) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoints,
        }
    }

    /// Issues a GET request and decodes the JSON body.
    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogueError> {
        debug!(url, ?query, "GET");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| CatalogueError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogueError::RequestError(format!(
                "HTTP {} {} for {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown"),
                url
            )));
        }

        response
            .json()
            .map_err(|e| CatalogueError::ParseError(e.to_string()))
    }

    /// Converts a DR program card into our `ProgramCard`.
    fn convert_card(card: DrProgramCard, slug: &str) -> Result<ProgramCard, CatalogueError> {
        // Only upcoming checks need the release time
        let sort_date_time = card.sort_date_time.and_then(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .inspect_err(|e| {
                    warn!(slug, raw = %raw, error = %e, "ignoring invalid SortDateTime")
                })
                .ok()
        });

        Ok(ProgramCard {
            urn: card
                .urn
                .ok_or_else(|| CatalogueError::missing("Urn", slug))?,
            slug: card.slug.unwrap_or_else(|| slug.to_string()),
            series_urn: card.series_urn,
            series_title: card.series_title.unwrap_or_default(),
            season_number: card.season_number,
            title: card.title.unwrap_or_default(),
            presentation_uri: card.presentation_uri,
            sort_date_time,
        })
    }

    fn convert_episode(episode: DrEpisode, series_urn: &str) -> Result<EpisodeRef, CatalogueError> {
        Ok(EpisodeRef {
            urn: episode
                .urn
                .ok_or_else(|| CatalogueError::missing("Urn", series_urn))?,
            slug: episode
                .slug
                .ok_or_else(|| CatalogueError::missing("Slug", series_urn))?,
            series_title: episode.series_title.unwrap_or_default(),
            title: episode.title.unwrap_or_default(),
            presentation_uri: episode.presentation_uri,
            duration_ms: episode.primary_asset.and_then(|a| a.duration_in_milliseconds),
        })
    }

    /// Converts the seasons list view, keeping catalogue order.
    fn convert_seasons(
        list: DrSeasonList,
        series_urn: &str,
    ) -> Result<Vec<Season>, CatalogueError> {
        list.items
            .into_iter()
            .map(|season| -> Result<Season, CatalogueError> {
                let season_number = season
                    .season_number
                    .ok_or_else(|| CatalogueError::missing("SeasonNumber", series_urn))?;
                let episodes = season
                    .episodes
                    .map(|list| list.items)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|episode| Self::convert_episode(episode, series_urn))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Season {
                    season_number,
                    episodes,
                })
            })
            .collect()
    }

    fn convert_details(
        envelope: DrDataEnvelope<DrLegacyCard>,
        urn: &str,
    ) -> Result<EpisodeDetails, CatalogueError> {
        let card = envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| CatalogueError::missing("Data", urn))?;

        Ok(EpisodeDetails {
            original_title: card
                .broadcasts
                .into_iter()
                .next()
                .and_then(|b| b.original_title),
            season_number: card.season_number.unwrap_or(1),
            episode_number: card
                .episode_number
                .ok_or_else(|| CatalogueError::missing("EpisodeNumber", urn))?,
        })
    }

    fn convert_bundle(
        envelope: DrDataEnvelope<DrBundle>,
        series_urn: &str,
    ) -> Result<Vec<BundleMember>, CatalogueError> {
        let bundle = envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| CatalogueError::missing("Data", series_urn))?;

        // Relations without a slug cannot be resolved further
        Ok(bundle
            .relations
            .into_iter()
            .filter_map(|relation| {
                Some(BundleMember {
                    slug: relation.slug?,
                    kind: relation.kind.unwrap_or_default(),
                    bundle_type: relation.bundle_type,
                })
            })
            .collect())
    }
}

impl Catalogue for DrCatalogue {
    fn program_card(&self, slug: &str) -> Result<ProgramCard, CatalogueError> {
        let url = format!("{}{}", self.endpoints.program_card_url, slug);
        let card: DrProgramCard = self.get_json(&url, &[])?;
        Self::convert_card(card, slug)
    }

    fn seasons(&self, series_urn: &str) -> Result<Vec<Season>, CatalogueError> {
        let list: DrSeasonList = self.get_json(
            &self.endpoints.seasons_url,
            &[("id", series_urn), ("limit", "0")],
        )?;
        Self::convert_seasons(list, series_urn)
    }

    fn episode_details(&self, urn: &str) -> Result<EpisodeDetails, CatalogueError> {
        let url = format!("{}{}", self.endpoints.legacy_program_card_url, urn);
        let envelope: DrDataEnvelope<DrLegacyCard> = self.get_json(&url, &[])?;
        Self::convert_details(envelope, urn)
    }

    fn bundle_members(&self, series_urn: &str) -> Result<Vec<BundleMember>, CatalogueError> {
        let url = format!("{}{}", self.endpoints.bundle_url, series_urn);
        let envelope: DrDataEnvelope<DrBundle> = self.get_json(&url, &[])?;
        Self::convert_bundle(envelope, series_urn)
    }
}
