//! Series and season expansion
//!
//! Turns a resolved program card into the list of episodes to fetch for a
//! given scope.

use crate::catalogue::{Catalogue, CatalogueError, EpisodeRef, ProgramCard, Season};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much of a series a download or subscription covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Only the program the URL points at
    #[default]
    Episode,
    /// Every episode of the program's season
    Season,
    /// Every episode of every season
    Series,
}

impl Scope {
    /// Builds a scope from the `-t` / `-s` command line flags.
    ///
    /// The series flag wins when both are given.
    pub fn from_flags(series: bool, season: bool) -> Self {
        if series {
            Scope::Series
        } else if season {
            Scope::Season
        } else {
            Scope::Episode
        }
    }

    /// The command line flag selecting this scope, if any.
    pub fn flag(self) -> Option<&'static str> {
        match self {
            Scope::Episode => None,
            Scope::Season => Some("-s"),
            Scope::Series => Some("-t"),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Episode => write!(f, "episode"),
            Scope::Season => write!(f, "season"),
            Scope::Series => write!(f, "series"),
        }
    }
}

/// Picks the streamable episodes in scope from a season listing.
///
/// Episodes without a presentation URI are not yet published and are
/// skipped. Listing order is preserved.
pub fn select_episodes(card: &ProgramCard, seasons: &[Season], scope: Scope) -> Vec<EpisodeRef> {
    let released = |episode: &&EpisodeRef| episode.presentation_uri.is_some();

    match scope {
        Scope::Episode => {
            let episode = card.as_episode();
            if episode.presentation_uri.is_some() {
                vec![episode]
            } else {
                Vec::new()
            }
        }
        Scope::Season => seasons
            .iter()
            .filter(|season| Some(season.season_number) == card.season_number)
            .flat_map(|season| season.episodes.iter())
            .filter(released)
            .cloned()
            .collect(),
        Scope::Series => seasons
            .iter()
            .flat_map(|season| season.episodes.iter())
            .filter(released)
            .cloned()
            .collect(),
    }
}

/// Expands a program card to the episodes in scope, fetching the season
/// listing only when the scope needs it.
pub fn expand<C: Catalogue + ?Sized>(
    catalogue: &C,
    card: &ProgramCard,
    scope: Scope,
) -> Result<Vec<EpisodeRef>, CatalogueError> {
    if scope == Scope::Episode {
        return Ok(select_episodes(card, &[], scope));
    }

    let seasons = catalogue.seasons(card.require_series_urn()?)?;
    Ok(select_episodes(card, &seasons, scope))
}
