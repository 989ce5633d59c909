use anyhow::{Context, Result};

use super::Scenario;
use crate::scenarios;

/// Every scenario in the catalogue, in declaration order
pub fn all() -> Vec<Box<dyn Scenario>> {
    scenarios::synapse::catalogue()
}

pub fn find(name: &str) -> Option<Box<dyn Scenario>> {
    all().into_iter().find(|scenario| scenario.name() == name)
}

/// Scenarios whose name contains `filter` or matches it as a glob pattern
pub fn select(filter: Option<&str>) -> Result<Vec<Box<dyn Scenario>>> {
    let Some(filter) = filter else {
        return Ok(all());
    };

    let pattern = glob::Pattern::new(filter)
        .with_context(|| format!("Invalid scenario filter: {filter}"))?;

    Ok(all()
        .into_iter()
        .filter(|scenario| scenario.name().contains(filter) || pattern.matches(scenario.name()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: Vec<_> = all().iter().map(|s| s.name()).collect();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique.len());
        assert_eq!(names.len(), 24);
    }

    #[test]
    fn test_select_by_substring_and_glob() {
        let sql: Vec<_> = select(Some("sql_pool"))
            .unwrap()
            .iter()
            .map(|s| s.name())
            .collect();
        assert!(sql.contains(&"sql_pool"));
        assert!(sql.contains(&"sql_pool_tde"));
        assert!(!sql.contains(&"spark_pool"));

        let globbed: Vec<_> = select(Some("spark_*"))
            .unwrap()
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(globbed, vec!["spark_pool", "spark_job", "spark_session_and_statements"]);
    }

    #[test]
    fn test_select_invalid_pattern() {
        assert!(select(Some("[")).is_err());
    }

    #[test]
    fn test_find() {
        assert_eq!(find("trigger").map(|s| s.name()), Some("trigger"));
        assert!(find("nope").is_none());
    }

    #[test]
    fn test_skipped_scenarios() {
        let skipped: Vec<_> = all()
            .iter()
            .filter(|s| s.skip_reason().is_some())
            .map(|s| s.name())
            .collect();
        assert_eq!(skipped, vec!["workspace_with_cmk", "data_flow"]);
    }
}
