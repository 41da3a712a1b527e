use {
    std::{
        io,
        path::PathBuf,
    },
    tokio::fs,
    crate::prelude::*,
};
#[cfg(unix)] use xdg::BaseDirectories;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Io(#[from] io::Error),
    #[error(transparent)] Json(#[from] serde_json::Error),
    #[cfg(unix)]
    #[error("missing config file")]
    Missing,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Config {
    pub(crate) season: u32,
    pub(crate) sheet_id: String,
    pub(crate) worksheet_name: String,
    /// 1-based sheet row where each new race row is inserted.
    pub(crate) insert_row: u32,
    pub(crate) event_name: String,
    pub(crate) run_estimate: String,
    pub(crate) runner_count: u32,
    #[serde(default = "default_api_base")]
    pub(crate) api_base: String,
    #[serde(default = "default_state_path")]
    pub(crate) state_path: PathBuf,
    /// Column C formula template outside US Eastern DST, with a `{row}` placeholder.
    #[serde(default = "default_dst_formula_standard")]
    pub(crate) dst_formula_standard: String,
    /// Column C formula template during US Eastern DST, with a `{row}` placeholder.
    #[serde(default = "default_dst_formula_dst")]
    pub(crate) dst_formula_dst: String,
}

impl Config {
    pub(crate) async fn load() -> Result<Self, Error> {
        #[cfg(unix)] {
            if let Some(config_path) = BaseDirectories::new().find_config_file("league-sheets.json") {
                Ok(serde_json::from_slice(&fs::read(config_path).await?)?)
            } else {
                Err(Error::Missing)
            }
        }
        #[cfg(windows)] {
            Ok(serde_json::from_slice(&fs::read("cfg/league-sheets.json").await?)?)
        }
    }

    #[cfg(test)]
    pub(crate) fn test_default() -> Self {
        Self {
            season: 30,
            sheet_id: "test-sheet".to_owned(),
            worksheet_name: "Restream Signups".to_owned(),
            insert_row: 4,
            event_name: "Test League".to_owned(),
            run_estimate: "1:30:00".to_owned(),
            runner_count: 2,
            api_base: default_api_base(),
            state_path: default_state_path(),
            dst_formula_standard: default_dst_formula_standard(),
            dst_formula_dst: default_dst_formula_dst(),
        }
    }
}

fn default_api_base() -> String {
    "https://league.speedgaming.org/api".to_owned()
}

fn default_state_path() -> PathBuf {
    PathBuf::from("seen-races.json")
}

fn default_dst_formula_standard() -> String {
    "=A{row}-ESTOffset".to_owned()
}

fn default_dst_formula_dst() -> String {
    "=A{row}-EDTOffset".to_owned()
}
