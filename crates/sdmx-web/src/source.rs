use sdmx_core::Languages;
use serde::{Deserialize, Serialize};
use url::Url;

/// REST dialect of plain SDMX 2.1 endpoints.
pub const SDMX21: &str = "SDMX21";

fn default_dialect() -> String {
    SDMX21.to_string()
}

/// An SDMX REST endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSource {
    /// Short identifier used to look the source up.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Base URL of the REST service, without the resource segment.
    pub endpoint: Url,
    /// REST dialect spoken by the endpoint.
    #[serde(default = "default_dialect")]
    pub dialect: String,
    /// Language priority for labels.
    #[serde(default)]
    pub languages: Languages,
}

impl WebSource {
    /// Creates a source speaking plain SDMX 2.1.
    #[must_use]
    pub fn new(id: impl Into<String>, endpoint: Url) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            endpoint,
            dialect: default_dialect(),
            languages: Languages::default(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = dialect.into();
        self
    }

    /// Sets the language priority.
    #[must_use]
    pub fn with_languages(mut self, languages: Languages) -> Self {
        self.languages = languages;
        self
    }
}
