// ABOUTME: Implements Environment - result batches grouped by capability and
// ABOUTME: result name, plus a hidden partition kept out of summaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved capability name for agent self-description; never summarized.
pub const SELF_INFO_KEY: &str = "SelfInfo";

/// One batch of objects produced by a single capability result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultBatch {
    pub objects: Vec<Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ResultBatch {
    pub fn new(objects: Vec<Value>) -> Self {
        Self {
            objects,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One row of an environment summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub tool: String,
    pub result_name: String,
    pub num_batches: usize,
    pub total_objects: usize,
}

/// Shared mutable state visible to capabilities during a run.
///
/// The visible partition maps capability name -> result name -> batches and
/// only ever grows. The hidden partition is an ordered key/value map for
/// internal state that capabilities can react to (e.g. availability checks)
/// but that is not part of the summary view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    results: BTreeMap<String, BTreeMap<String, Vec<ResultBatch>>>,
    hidden: BTreeMap<String, Value>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// The visible partition.
    pub fn results(&self) -> &BTreeMap<String, BTreeMap<String, Vec<ResultBatch>>> {
        &self.results
    }

    /// Append a batch under `tool` / `result_name`.
    pub fn append(
        &mut self,
        tool: impl Into<String>,
        result_name: impl Into<String>,
        batch: ResultBatch,
    ) {
        self.results
            .entry(tool.into())
            .or_default()
            .entry(result_name.into())
            .or_default()
            .push(batch);
    }

    /// Batches stored under `tool` / `result_name`, oldest first.
    pub fn batches(&self, tool: &str, result_name: &str) -> &[ResultBatch] {
        self.results
            .get(tool)
            .and_then(|groups| groups.get(result_name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True if the visible partition holds no batches.
    pub fn is_empty(&self) -> bool {
        self.results.values().all(|groups| groups.is_empty())
    }

    /// The hidden partition.
    pub fn hidden(&self) -> &BTreeMap<String, Value> {
        &self.hidden
    }

    /// Store a hidden value, returning the previous one.
    pub fn set_hidden(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.hidden.insert(key.into(), value.into())
    }

    pub fn get_hidden(&self, key: &str) -> Option<&Value> {
        self.hidden.get(key)
    }

    pub fn contains_hidden(&self, key: &str) -> bool {
        self.hidden.contains_key(key)
    }

    pub fn remove_hidden(&mut self, key: &str) -> Option<Value> {
        self.hidden.remove(key)
    }

    /// Summarize the visible partition, one entry per result group.
    ///
    /// Groups under [`SELF_INFO_KEY`] are never listed.
    pub fn summary(&self) -> Vec<SummaryEntry> {
        self.results
            .iter()
            .filter(|(tool, _)| tool.as_str() != SELF_INFO_KEY)
            .flat_map(|(tool, groups)| {
                groups.iter().map(move |(result_name, batches)| SummaryEntry {
                    tool: tool.clone(),
                    result_name: result_name.clone(),
                    num_batches: batches.len(),
                    total_objects: batches.iter().map(|b| b.objects.len()).sum(),
                })
            })
            .collect()
    }
}
