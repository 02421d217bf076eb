//! Grouping keys.
//!
//! A grouping key is a composite of one or more basic keys, optionally
//! tagged as merge-eligible. Keys are written as the basic key names
//! joined by `#`, with an optional `:merge` suffix, for example
//! `DataSetType#Project:merge`. An ordered, comma-separated list of keys
//! is configured per grouping task; keys are tried in that order.

use crate::dataset::DataSet;
use crate::error::{CoreError, CoreResult};

use std::fmt;

/// A basic grouping attribute of a data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// All data sets form a single group.
    All,
    /// Group by organizational space.
    Space,
    /// Group by project.
    Project,
    /// Group by owning experiment.
    Experiment,
    /// Group by sample.
    Sample,
    /// Group by data set type code.
    DataSetType,
    /// Every data set forms its own group.
    DataSet,
}

impl Grouping {
    const ALL: [Grouping; 7] = [
        Grouping::All,
        Grouping::Space,
        Grouping::Project,
        Grouping::Experiment,
        Grouping::Sample,
        Grouping::DataSetType,
        Grouping::DataSet,
    ];

    fn name(self) -> &'static str {
        match self {
            Grouping::All => "All",
            Grouping::Space => "Space",
            Grouping::Project => "Project",
            Grouping::Experiment => "Experiment",
            Grouping::Sample => "Sample",
            Grouping::DataSetType => "DataSetType",
            Grouping::DataSet => "DataSet",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|g| g.name() == token)
    }

    fn evaluate(self, data_set: &DataSet) -> String {
        match self {
            Grouping::All => String::new(),
            Grouping::Space => data_set.space.clone(),
            Grouping::Project => format!("{}/{}", data_set.space, data_set.project),
            Grouping::Experiment => format!(
                "{}/{}/{}",
                data_set.space, data_set.project, data_set.experiment
            ),
            Grouping::Sample => data_set.sample.clone().unwrap_or_default(),
            Grouping::DataSetType => data_set.type_code.clone(),
            Grouping::DataSet => data_set.code.clone(),
        }
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A composite grouping key with an optional merge tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingKey {
    basics: Vec<Grouping>,
    merge: bool,
}

impl GroupingKey {
    /// Creates a key from its basic components.
    #[must_use]
    pub fn new(basics: Vec<Grouping>, merge: bool) -> Self {
        Self { basics, merge }
    }

    /// Parses a single key such as `DataSetType#Project:merge`.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let text = text.trim();
        let (basics_part, merge) = match text.split_once(':') {
            Some((head, "merge")) => (head, true),
            Some(_) => {
                return Err(CoreError::configuration(format!(
                    "Invalid grouping key in option 'grouping-keys' \
                     because 'merge' is expected after ':': {text}"
                )))
            }
            None => (text, false),
        };
        let mut basics = Vec::new();
        for token in basics_part.split('#') {
            let basic = Grouping::parse(token).ok_or_else(|| {
                CoreError::configuration(format!(
                    "Invalid basic grouping key in option 'grouping-keys': {token} \
                     (valid values are {:?})",
                    Grouping::ALL
                ))
            })?;
            basics.push(basic);
        }
        Ok(Self { basics, merge })
    }

    /// Parses a comma-separated ordered list of keys.
    pub fn parse_list(text: &str) -> CoreResult<Vec<Self>> {
        text.split(',').map(Self::parse).collect()
    }

    /// Whether too-small groups produced by this key may be merged.
    #[must_use]
    pub fn is_merge_eligible(&self) -> bool {
        self.merge
    }

    /// Computes the group label of a data set under this key.
    #[must_use]
    pub fn evaluate(&self, data_set: &DataSet) -> Vec<String> {
        self.basics.iter().map(|b| b.evaluate(data_set)).collect()
    }
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, basic) in self.basics.iter().enumerate() {
            if i > 0 {
                f.write_str("#")?;
            }
            write!(f, "{basic}")?;
        }
        if self.merge {
            f.write_str(":merge")?;
        }
        Ok(())
    }
}
