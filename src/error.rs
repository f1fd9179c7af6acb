use problemdeck_catalog::CatalogError;

#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error("no page template available")]
    MissingPageTemplate,
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("invalid records: {0}")]
    InvalidRecords(#[from] CatalogError),
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("pdf inspection failed: {0}")]
    Inspect(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to obtain a decorative asset. Callers recover by rendering without it.
#[derive(Debug, thiserror::Error)]
pub enum AssetLoadError {
    #[error("asset unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("asset could not be decoded: {0}")]
    Decode(String),
    #[error("asset could not be rendered: {0}")]
    Render(String),
}
