//! Configuration of a gateway session.

use accord_model::gateway::{
    payload::outgoing::IdentifyProperties, presence::UpdatePresence, Intents,
};
use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Large-threshold sent at identify time when not configured.
pub const DEFAULT_LARGE_THRESHOLD: u64 = 250;

/// Error building a session configuration.
#[derive(Debug)]
pub struct ConfigError {
    kind: ConfigErrorType,
}

impl ConfigError {
    /// Immutable reference to the type of error that occurred.
    #[must_use = "retrieving the type has no effect if left unused"]
    pub const fn kind(&self) -> &ConfigErrorType {
        &self.kind
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.kind {
            ConfigErrorType::LargeThresholdInvalid { value } => {
                f.write_str("provided large threshold value ")?;
                Display::fmt(&value, f)?;

                f.write_str(" is not in the accepted range of 50..=250")
            }
            ConfigErrorType::ShardIdInvalid { id, total } => {
                f.write_str("provided shard id ")?;
                Display::fmt(&id, f)?;
                f.write_str(" is not less than the total of ")?;

                Display::fmt(&total, f)
            }
        }
    }
}

impl Error for ConfigError {}

/// Type of [`ConfigError`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum ConfigErrorType {
    /// The large threshold is outside the platform's accepted range.
    LargeThresholdInvalid { value: u64 },
    /// The shard id is not within the shard total.
    ShardIdInvalid { id: u64, total: u64 },
}

/// Configuration of a gateway session.
#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) compress: bool,
    pub(crate) gateway_url: Option<String>,
    pub(crate) identify_properties: Option<IdentifyProperties>,
    pub(crate) intents: Intents,
    pub(crate) large_threshold: u64,
    pub(crate) presence: Option<UpdatePresence>,
    pub(crate) shard: Option<[u64; 2]>,
    pub(crate) token: String,
}

impl Config {
    /// Create a builder from a token and the intents to request.
    pub fn builder(token: impl Into<String>, intents: Intents) -> ConfigBuilder {
        ConfigBuilder::new(token.into(), intents)
    }

    /// Create a configuration with only a token and intents.
    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        Self::builder(token, intents).build()
    }

    /// Intents the session was configured with, before handler inference.
    pub const fn intents(&self) -> Intents {
        self.intents
    }

    /// The shard triple sent at identify time, if sharding was configured.
    pub const fn shard(&self) -> Option<[u64; 2]> {
        self.shard
    }
}

/// Builder for a [`Config`].
#[derive(Clone, Debug)]
#[must_use = "has no effect if not built into a Config"]
pub struct ConfigBuilder {
    inner: Config,
}

impl ConfigBuilder {
    fn new(mut token: String, intents: Intents) -> Self {
        if !token.starts_with("Bot ") {
            token.insert_str(0, "Bot ");
        }

        Self {
            inner: Config {
                compress: false,
                gateway_url: None,
                identify_properties: None,
                intents,
                large_threshold: DEFAULT_LARGE_THRESHOLD,
                presence: None,
                shard: None,
                token,
            },
        }
    }

    /// Consume the builder, returning the configuration.
    pub fn build(self) -> Config {
        self.inner
    }

    /// Request zlib-compressed frames from the platform.
    pub const fn compress(mut self, compress: bool) -> Self {
        self.inner.compress = compress;

        self
    }

    /// Use a fixed gateway URL instead of fetching one over REST.
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.inner.gateway_url = Some(url.into());

        self
    }

    /// Set the runtime labels reported at identify time.
    pub fn identify_properties(mut self, properties: IdentifyProperties) -> Self {
        self.inner.identify_properties = Some(properties);

        self
    }

    /// Set the member count threshold above which guilds arrive partial.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigErrorType::LargeThresholdInvalid`] error type when
    /// the value is outside 50..=250.
    pub fn large_threshold(mut self, large_threshold: u64) -> Result<Self, ConfigError> {
        if !(50..=250).contains(&large_threshold) {
            return Err(ConfigError {
                kind: ConfigErrorType::LargeThresholdInvalid {
                    value: large_threshold,
                },
            });
        }

        self.inner.large_threshold = large_threshold;

        Ok(self)
    }

    /// Set the presence sent at identify time.
    pub fn presence(mut self, presence: UpdatePresence) -> Self {
        self.inner.presence = Some(presence);

        self
    }

    /// Set the shard triple sent at identify time.
    ///
    /// Shard orchestration itself is out of scope; the triple is carried
    /// through to the identify payload verbatim.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigErrorType::ShardIdInvalid`] error type when the id
    /// is not less than the total.
    pub fn shard(mut self, id: u64, total: u64) -> Result<Self, ConfigError> {
        if id >= total {
            return Err(ConfigError {
                kind: ConfigErrorType::ShardIdInvalid { id, total },
            });
        }

        self.inner.shard = Some([id, total]);

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use accord_model::gateway::Intents;

    #[test]
    fn token_is_prefixed() {
        let config = Config::new("abc", Intents::GUILDS);

        assert_eq!("Bot abc", config.token);
    }

    #[test]
    fn large_threshold_is_validated() {
        assert!(Config::builder("t", Intents::empty())
            .large_threshold(49)
            .is_err());
        assert!(Config::builder("t", Intents::empty())
            .large_threshold(251)
            .is_err());
        assert!(Config::builder("t", Intents::empty())
            .large_threshold(250)
            .is_ok());
    }

    #[test]
    fn shard_is_validated() {
        assert!(Config::builder("t", Intents::empty()).shard(2, 2).is_err());

        let config = Config::builder("t", Intents::empty())
            .shard(1, 2)
            .unwrap()
            .build();
        assert_eq!(Some([1, 2]), config.shard());
    }
}
