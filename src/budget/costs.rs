//! Estimated token cost per AI operation.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// AI operations the grading backend exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiOperation {
    Analyze,
    Grade,
    Feedback,
    Plagiarism,
}

impl AiOperation {
    pub const ALL: [AiOperation; 4] = [
        AiOperation::Analyze,
        AiOperation::Grade,
        AiOperation::Feedback,
        AiOperation::Plagiarism,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Grade => "grade",
            Self::Feedback => "feedback",
            Self::Plagiarism => "plagiarism",
        }
    }

    pub const fn default_cost(&self) -> u64 {
        match self {
            Self::Analyze => 1000,
            Self::Grade => 2000,
            Self::Feedback => 1500,
            Self::Plagiarism => 2500,
        }
    }
}

impl fmt::Display for AiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownOperation(s.to_string()))
    }
}

static DEFAULT_COSTS: LazyLock<OperationCostTable> = LazyLock::new(|| OperationCostTable {
    costs: AiOperation::ALL
        .iter()
        .map(|op| (op.as_str().to_string(), op.default_cost()))
        .collect(),
});

pub fn default_cost_table() -> &'static OperationCostTable {
    &DEFAULT_COSTS
}

/// Operation name to token estimate. Every entry is greater than zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationCostTable {
    costs: HashMap<String, u64>,
}

impl OperationCostTable {
    pub fn builder() -> OperationCostTableBuilder {
        OperationCostTableBuilder::new()
    }

    pub fn cost(&self, operation: &str) -> Option<u64> {
        self.costs.get(operation).copied()
    }

    /// Cost of `operation`, or [`Error::UnknownOperation`].
    pub fn require(&self, operation: &str) -> Result<u64> {
        self.cost(operation)
            .ok_or_else(|| Error::UnknownOperation(operation.to_string()))
    }

    pub fn contains(&self, operation: &str) -> bool {
        self.costs.contains_key(operation)
    }

    pub fn operations(&self) -> impl Iterator<Item = (&str, u64)> {
        self.costs.iter().map(|(name, cost)| (name.as_str(), *cost))
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

impl Default for OperationCostTable {
    fn default() -> Self {
        default_cost_table().clone()
    }
}

#[derive(Debug, Default)]
pub struct OperationCostTableBuilder {
    costs: HashMap<String, u64>,
}

impl OperationCostTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(mut self) -> Self {
        for op in AiOperation::ALL {
            self.costs.insert(op.as_str().to_string(), op.default_cost());
        }
        self
    }

    pub fn operation(mut self, name: impl Into<String>, cost: u64) -> Self {
        self.costs.insert(name.into(), cost);
        self
    }

    pub fn build(self) -> Result<OperationCostTable> {
        let mut zero: Vec<&str> = self
            .costs
            .iter()
            .filter(|(_, cost)| **cost == 0)
            .map(|(name, _)| name.as_str())
            .collect();
        if !zero.is_empty() {
            zero.sort_unstable();
            return Err(Error::Config(format!(
                "operation cost must be greater than zero: {}",
                zero.join(", ")
            )));
        }
        Ok(OperationCostTable { costs: self.costs })
    }
}
