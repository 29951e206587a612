//! Document-wide duplicate identifier detection.
//!
//! Identifiers must be unique across all collections of a project, not only
//! within one collection. `settings` is not a collection and is not scanned.

use std::collections::HashSet;

use crate::project::Project;

/// Identifiers used more than once, each listed once, in first-repeat order.
pub fn find_duplicates(project: &Project) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();

    for id in project.all_ids() {
        if !seen.insert(id.clone()) && reported.insert(id.clone()) {
            duplicates.push(id);
        }
    }

    if !duplicates.is_empty() {
        tracing::debug!(count = duplicates.len(), "duplicate identifiers found");
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(text: &str) -> Project {
        Project::from_text("p.wlp", text).unwrap()
    }

    #[test]
    fn clean_project_has_no_duplicates() {
        let p = project(r#"{ "meshes": { "1": {}, "2": {} }, "textures": { "3": {} } }"#);
        assert!(find_duplicates(&p).is_empty());
    }

    #[test]
    fn duplicates_across_collections() {
        let p = project(
            r#"{ "objects": { "12": {} }, "meshes": { "12": {}, "4": {} }, "fonts": { "4": {}, "12": {} } }"#,
        );
        assert_eq!(find_duplicates(&p), vec!["12", "4"]);
    }

    #[test]
    fn duplicate_keys_within_a_collection() {
        let p = project(r#"{ "files": { "7": {}, "7": {} } }"#);
        assert_eq!(find_duplicates(&p), vec!["7"]);
    }

    #[test]
    fn settings_keys_are_ignored() {
        let p = project(r#"{ "meshes": { "project": {} }, "settings": { "project": {} } }"#);
        assert!(find_duplicates(&p).is_empty());
    }
}
