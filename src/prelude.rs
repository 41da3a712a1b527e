pub(crate) use {
    std::{
        collections::HashMap,
        time::Duration,
    },
    chrono::prelude::*,
    serde::Deserialize,
    crate::config::Config,
};
