//! Candidate Feature Sets
//!
//! Column names are grouped by naming convention and combined into four
//! cumulative sets; the fifth set is whatever forward selection picks.

use crate::{FeatureError, CLUSTER_COLUMN, PCA_PREFIX};
use sensor_table::SENSOR_COLUMNS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// Name of the forward-selection feature set
pub const SELECTED_SET_NAME: &str = "Selected Features";

/// Naming conventions used to group columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSetConfig {
    /// Raw sensor axes
    pub basic: Vec<String>,
    /// Magnitude columns
    pub square: Vec<String>,
    pub pca_prefix: String,
    /// Substring marking rolling-window columns
    pub temporal_marker: String,
    /// Substrings marking frequency-domain columns
    pub frequency_markers: Vec<String>,
    pub cluster: String,
}

impl Default for FeatureSetConfig {
    fn default() -> Self {
        Self {
            basic: SENSOR_COLUMNS.iter().map(|c| c.to_string()).collect(),
            square: vec!["acc_r".to_string(), "gyr_r".to_string()],
            pca_prefix: PCA_PREFIX.to_string(),
            temporal_marker: "_temp_".to_string(),
            frequency_markers: vec!["_freq".to_string(), "_pse".to_string()],
            cluster: CLUSTER_COLUMN.to_string(),
        }
    }
}

/// Columns of a table sorted into feature groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureGroups {
    pub basic: Vec<String>,
    pub square: Vec<String>,
    pub pca: Vec<String>,
    pub temporal: Vec<String>,
    pub frequency: Vec<String>,
    pub cluster: Vec<String>,
}

impl FeatureGroups {
    /// Group `columns`; every fixed-name column in `config` must be present
    pub fn from_columns<S: AsRef<str>>(columns: &[S], config: &FeatureSetConfig) -> Result<Self, FeatureError> {
        let available: BTreeSet<&str> = columns.iter().map(|c| c.as_ref()).collect();

        let fixed = |names: &[String]| -> Result<Vec<String>, FeatureError> {
            names
                .iter()
                .map(|name| {
                    if available.contains(name.as_str()) {
                        Ok(name.clone())
                    } else {
                        Err(FeatureError::InvalidParameter(format!(
                            "feature column {} not found",
                            name
                        )))
                    }
                })
                .collect()
        };

        let basic = fixed(&config.basic)?;
        let square = fixed(&config.square)?;
        let cluster = fixed(std::slice::from_ref(&config.cluster))?;

        let matching = |predicate: &dyn Fn(&str) -> bool| -> Vec<String> {
            columns
                .iter()
                .map(|c| c.as_ref())
                .filter(|c| predicate(c))
                .map(|c| c.to_string())
                .collect()
        };

        let pca = matching(&|c| c.starts_with(config.pca_prefix.as_str()));
        let temporal = matching(&|c| c.contains(config.temporal_marker.as_str()));
        let frequency = matching(&|c| {
            !c.contains(config.temporal_marker.as_str())
                && config.frequency_markers.iter().any(|m| c.contains(m.as_str()))
        });

        Ok(Self {
            basic,
            square,
            pca,
            temporal,
            frequency,
            cluster,
        })
    }
}

/// Named, de-duplicated collection of classifier input columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub name: String,
    pub columns: BTreeSet<String>,
}

impl FeatureSet {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// The forward-selection set
    pub fn selected<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SELECTED_SET_NAME, columns)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_list(&self) -> Vec<String> {
        self.columns.iter().cloned().collect()
    }
}

/// Feature Set 1 to 4, each a superset of the previous one
pub fn cumulative_feature_sets(groups: &FeatureGroups) -> Vec<FeatureSet> {
    let set_1: Vec<&String> = groups.basic.iter().collect();
    let set_2: Vec<&String> = set_1
        .iter()
        .copied()
        .chain(&groups.square)
        .chain(&groups.pca)
        .collect();
    let set_3: Vec<&String> = set_2.iter().copied().chain(&groups.temporal).collect();
    let set_4: Vec<&String> = set_3
        .iter()
        .copied()
        .chain(&groups.frequency)
        .chain(&groups.cluster)
        .collect();

    let sets: Vec<FeatureSet> = [set_1, set_2, set_3, set_4]
        .into_iter()
        .enumerate()
        .map(|(i, columns)| FeatureSet::new(format!("Feature Set {}", i + 1), columns.into_iter().cloned()))
        .collect();

    for set in &sets {
        info!("{}: {} columns", set.name, set.len());
    }
    sets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        let mut columns: Vec<String> = SENSOR_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend(
            [
                "duration",
                "acc_r",
                "gyr_r",
                "pca_1",
                "pca_2",
                "pca_3",
                "acc_x_temp_mean_ws_5",
                "acc_x_temp_std_ws_5",
                "acc_x_max_freq",
                "acc_x_freq_weighted",
                "acc_x_pse",
                "acc_x_freq_0.357_Hz_ws_14",
                "cluster",
            ]
            .map(String::from),
        );
        columns
    }

    #[test]
    fn test_grouping() {
        let groups = FeatureGroups::from_columns(&columns(), &FeatureSetConfig::default()).unwrap();
        assert_eq!(groups.basic.len(), 6);
        assert_eq!(groups.square, vec!["acc_r", "gyr_r"]);
        assert_eq!(groups.pca, vec!["pca_1", "pca_2", "pca_3"]);
        assert_eq!(groups.temporal.len(), 2);
        assert_eq!(groups.frequency.len(), 4);
        assert_eq!(groups.cluster, vec!["cluster"]);
    }

    #[test]
    fn test_sets_are_cumulative() {
        let groups = FeatureGroups::from_columns(&columns(), &FeatureSetConfig::default()).unwrap();
        let sets = cumulative_feature_sets(&groups);

        assert_eq!(sets.len(), 4);
        assert_eq!(sets[0].name, "Feature Set 1");
        assert_eq!(sets[3].name, "Feature Set 4");
        assert_eq!(
            sets.iter().map(FeatureSet::len).collect::<Vec<_>>(),
            vec![6, 11, 13, 18]
        );
        for pair in sets.windows(2) {
            assert!(pair[0].columns.is_subset(&pair[1].columns));
        }
        assert!(!sets[3].columns.contains("duration"));
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut config = FeatureSetConfig::default();
        config.square.push("acc_x".to_string());
        let groups = FeatureGroups::from_columns(&columns(), &config).unwrap();
        let sets = cumulative_feature_sets(&groups);
        assert_eq!(sets[1].len(), 11);
    }

    #[test]
    fn test_missing_fixed_column() {
        let columns: Vec<String> = columns().into_iter().filter(|c| c != "gyr_r").collect();
        assert!(matches!(
            FeatureGroups::from_columns(&columns, &FeatureSetConfig::default()),
            Err(FeatureError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_selected_set() {
        let set = FeatureSet::selected(["pca_1", "acc_y", "pca_1"]);
        assert_eq!(set.name, SELECTED_SET_NAME);
        assert_eq!(set.column_list(), vec!["acc_y", "pca_1"]);
    }
}
