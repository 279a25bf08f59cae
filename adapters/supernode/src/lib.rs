mod client;
mod config;
mod lookup;
mod timeout;

pub use client::SupernodeClient;
pub use config::{SupernodeApiConfig, SupernodeTimeouts};
pub use lookup::PinLookup;
pub use timeout::pin_timeout;

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("supernode returned HTTP {0} with content '{1}'")]
    HttpFailWithBody(u16, String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
