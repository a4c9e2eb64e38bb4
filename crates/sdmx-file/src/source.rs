use sdmx_core::{DataflowRef, Languages};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A data file and the optional structure message describing it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSource {
    /// SDMX-CSV data file.
    pub data: PathBuf,
    /// SDMX-JSON structure message; the structure is inferred from the data
    /// header when absent.
    #[serde(default)]
    pub structure: Option<PathBuf>,
    /// Dataflow of the file; read from the first row when absent.
    #[serde(default)]
    pub flow: Option<DataflowRef>,
    /// Language priority for labels.
    #[serde(default)]
    pub languages: Languages,
}

impl FileSource {
    /// Creates a source over a data file.
    #[must_use]
    pub fn new(data: impl Into<PathBuf>) -> Self {
        Self {
            data: data.into(),
            structure: None,
            flow: None,
            languages: Languages::default(),
        }
    }

    /// Sets the structure message file.
    #[must_use]
    pub fn with_structure(mut self, structure: impl Into<PathBuf>) -> Self {
        self.structure = Some(structure.into());
        self
    }

    /// Sets the dataflow.
    #[must_use]
    pub fn with_flow(mut self, flow: DataflowRef) -> Self {
        self.flow = Some(flow);
        self
    }

    /// Sets the language priority.
    #[must_use]
    pub fn with_languages(mut self, languages: Languages) -> Self {
        self.languages = languages;
        self
    }

    /// Returns the structure file, if any.
    #[must_use]
    pub fn structure_path(&self) -> Option<&Path> {
        self.structure.as_deref()
    }

    /// Name of the dataflow when neither the source nor the file declares
    /// one: the file stem.
    pub(crate) fn default_flow_id(&self) -> String {
        self.data
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.data.display().to_string())
    }
}
