//! Object naming conventions for uploads and results

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use super::{BlobInfo, BlobStore};
use crate::error::Result;

const CSV_SUFFIX: &str = ".csv";
const RESULT_SUFFIX: &str = "_result.csv";

/// How input and result object names relate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultNaming {
    /// Flat namespace: `data.csv` is processed into `data_result.csv`
    Suffix,
    /// Inputs under one prefix, results under another with the same tail:
    /// `uploads/data.csv` is processed into `outputs/data.csv`
    Prefixed {
        uploads_prefix: String,
        outputs_prefix: String,
    },
}

/// An input with a finished result next to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedFile {
    /// Original input object
    pub filename: String,
    /// Result object
    pub result_filename: String,
    /// When the result was last written
    pub updated: DateTime<Utc>,
}

impl ResultNaming {
    /// Object name for a freshly uploaded file
    pub fn upload_name(&self, filename: &str) -> String {
        match self {
            ResultNaming::Suffix => filename.to_string(),
            ResultNaming::Prefixed { uploads_prefix, .. } => {
                format!("{}{}", uploads_prefix, filename)
            }
        }
    }

    /// Result object name for an input object.
    ///
    /// Only a trailing `.csv` is replaced; names without it get the suffix
    /// appended.
    pub fn output_name(&self, input: &str) -> String {
        match self {
            ResultNaming::Suffix => match input.strip_suffix(CSV_SUFFIX) {
                Some(stem) => format!("{}{}", stem, RESULT_SUFFIX),
                None => format!("{}{}", input, RESULT_SUFFIX),
            },
            ResultNaming::Prefixed {
                uploads_prefix,
                outputs_prefix,
            } => {
                let tail = input.strip_prefix(uploads_prefix.as_str()).unwrap_or(input);
                format!("{}{}", outputs_prefix, tail)
            }
        }
    }

    /// Input object a result was produced from, if the name fits the scheme
    pub fn input_name(&self, output: &str) -> Option<String> {
        match self {
            ResultNaming::Suffix => output
                .strip_suffix(RESULT_SUFFIX)
                .map(|stem| format!("{}{}", stem, CSV_SUFFIX)),
            ResultNaming::Prefixed {
                uploads_prefix,
                outputs_prefix,
            } => output
                .strip_prefix(outputs_prefix.as_str())
                .filter(|tail| !tail.is_empty())
                .map(|tail| format!("{}{}", uploads_prefix, tail)),
        }
    }

    /// Prefix under which results are listed
    fn outputs_listing_prefix(&self) -> &str {
        match self {
            ResultNaming::Suffix => "",
            ResultNaming::Prefixed { outputs_prefix, .. } => outputs_prefix,
        }
    }

    /// Objects this naming scheme owns, in listing order.
    ///
    /// With prefixes that is everything under the uploads and outputs
    /// prefixes. In a flat namespace it is each `_result.csv` object plus the
    /// input it was produced from; nothing else in the store is touched.
    pub async fn owned_objects(&self, store: &dyn BlobStore) -> Result<Vec<BlobInfo>> {
        match self {
            ResultNaming::Suffix => {
                let listing = store.list("").await?;
                let results: HashSet<&str> = listing
                    .iter()
                    .filter(|blob| blob.name.ends_with(RESULT_SUFFIX))
                    .map(|blob| blob.name.as_str())
                    .collect();
                let inputs: HashSet<String> = results
                    .iter()
                    .filter_map(|name| self.input_name(name))
                    .collect();

                Ok(listing
                    .iter()
                    .filter(|blob| {
                        results.contains(blob.name.as_str()) || inputs.contains(&blob.name)
                    })
                    .cloned()
                    .collect())
            }
            ResultNaming::Prefixed {
                uploads_prefix,
                outputs_prefix,
            } => {
                let mut owned: Vec<BlobInfo> = Vec::new();
                for prefix in [uploads_prefix, outputs_prefix] {
                    for blob in store.list(prefix).await? {
                        if !owned.iter().any(|b| b.name == blob.name) {
                            owned.push(blob);
                        }
                    }
                }
                Ok(owned)
            }
        }
    }

    /// List results whose original input still exists, sorted by input name
    pub async fn processed_files(&self, store: &dyn BlobStore) -> Result<Vec<ProcessedFile>> {
        let mut results = Vec::new();
        for blob in store.list(self.outputs_listing_prefix()).await? {
            let Some(input) = self.input_name(&blob.name) else {
                continue;
            };
            if store.exists(&input).await? {
                results.push(ProcessedFile {
                    filename: input,
                    result_filename: blob.name,
                    updated: blob.updated,
                });
            }
        }
        results.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(results)
    }
}
