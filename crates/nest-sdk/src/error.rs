use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("selector error: {0}")]
    Select(#[from] nest_select::SelectError),

    #[error("store error: {0}")]
    Store(#[from] nest_store::StoreError),

    #[error("fetch error: {0}")]
    Fetch(#[from] nest_fetch::FetchError),
}

pub type ClientResult<T> = Result<T, ClientError>;
