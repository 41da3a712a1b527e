//! Client for the league scheduling API.

use crate::prelude::*;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Reqwest(#[from] reqwest::Error),
    #[error("upstream error envelope: {0}")]
    Upstream(String),
}

/// The API wraps every payload in an explicit success/failure envelope.
#[derive(Debug, Deserialize)]
pub(crate) enum Envelope<T> {
    Ok(T),
    Err(String),
}

impl<T> Envelope<T> {
    pub(crate) fn into_result(self) -> Result<T, Error> {
        match self {
            Self::Ok(payload) => Ok(payload),
            Self::Err(message) => Err(Error::Upstream(message)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) enum RaceState {
    Scheduled,
    /// States other than `Scheduled` never get a sheet row, so they all decode
    /// into one catch-all rather than failing the whole fetch.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Race {
    pub(crate) id: u64,
    pub(crate) state: RaceState,
    pub(crate) player1_id: u64,
    pub(crate) player2_id: u64,
    pub(crate) bracket_id: u64,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub(crate) scheduled_for: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Player {
    pub(crate) id: u64,
    pub(crate) name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Bracket {
    pub(crate) id: u64,
    pub(crate) name: String,
}

pub(crate) async fn scheduled_races(http_client: &reqwest::Client, config: &Config) -> Result<Vec<Race>, Error> {
    http_client.get(format!("{}/season/{}/races", config.api_base, config.season))
        .query(&[("state", "\"Scheduled\"")])
        .send().await?
        .error_for_status()?
        .json::<Envelope<Vec<Race>>>().await?
        .into_result()
}

pub(crate) async fn players(http_client: &reqwest::Client, config: &Config, ids: &[u64]) -> Result<Vec<Player>, Error> {
    let query = ids.iter().map(|id| ("player_id", id.to_string())).collect::<Vec<_>>();
    http_client.get(format!("{}/players", config.api_base))
        .query(&query)
        .send().await?
        .error_for_status()?
        .json::<Envelope<Vec<Player>>>().await?
        .into_result()
}

pub(crate) async fn brackets(http_client: &reqwest::Client, config: &Config) -> Result<Vec<Bracket>, Error> {
    http_client.get(format!("{}/season/{}/brackets", config.api_base, config.season))
        .send().await?
        .error_for_status()?
        .json::<Envelope<Vec<Bracket>>>().await?
        .into_result()
}
