use {
    std::{
        collections::BTreeSet,
        io,
        path::PathBuf,
    },
    serde::Serialize,
    tokio::fs,
    crate::prelude::*,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Io(#[from] io::Error),
    #[error(transparent)] Json(#[from] serde_json::Error),
}

/// On-disk shape of the seen-set.
#[derive(Debug, Default, Deserialize, Serialize)]
struct StateFile {
    seen_ids: Vec<u64>,
}

/// Race identifiers that already have a sheet row.
///
/// Loaded once at startup and rewritten in full after every confirmed write, so a
/// crash between cycles never reprocesses a race that made it into the sheet.
/// Identifiers are never removed.
pub(crate) struct SeenRaces {
    path: PathBuf,
    ids: BTreeSet<u64>,
}

impl SeenRaces {
    pub(crate) async fn load(path: PathBuf) -> Result<Self, Error> {
        let ids = match fs::read(&path).await {
            Ok(buf) => match serde_json::from_slice::<StateFile>(&buf) {
                Ok(state) => state.seen_ids.into_iter().collect(),
                Err(e) => {
                    log::warn!("malformed state file {}, resetting seen-set: {e}", path.display());
                    BTreeSet::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeSet::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, ids })
    }

    pub(crate) fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    /// Marks a race as written and immediately persists the full set.
    pub(crate) async fn add(&mut self, id: u64) -> Result<(), Error> {
        if self.ids.insert(id) {
            let state = StateFile { seen_ids: self.ids.iter().copied().collect() };
            fs::write(&self.path, serde_json::to_vec_pretty(&state)?).await?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn from_ids(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            path: PathBuf::from("unused"),
            ids: ids.into_iter().collect(),
        }
    }
}
