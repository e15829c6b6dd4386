use thiserror::Error;

/// Errors raised while validating a [`crate::HarvestConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
  /// A required value was empty.
  #[error("missing required configuration: {field}")]
  Missing { field: &'static str },

  /// The TES base URL could not be parsed.
  #[error("invalid TES base url '{url}': {source}")]
  InvalidUrl {
    url: String,
    #[source]
    source: url::ParseError,
  },

  /// The TES base URL uses a scheme other than http or https.
  #[error("unsupported scheme '{scheme}' in TES base url")]
  UnsupportedScheme { scheme: String },

  /// A numeric setting was out of range.
  #[error("invalid value for {field}: {message}")]
  InvalidValue { field: &'static str, message: String },
}
