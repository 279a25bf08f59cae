mod client;
mod config;

pub use client::DaemonClient;
pub use config::DaemonApiConfig;

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("storage daemon returned HTTP {0}")]
    HttpFail(u16),

    #[error("storage daemon returned HTTP {0} with content '{1}'")]
    HttpFailWithBody(u16, String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidId(#[from] pinion_core::cid::InvalidContentId),
}
