//! `pcdgen check` — merge and validate without generating.

use std::path::Path;

use anyhow::{Context, Result};
use pcd_collect::{merge_platform, partition};

use crate::commands::load_platform;
use crate::manifest::Project;

/// Counts reported by a successful check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckSummary {
    pub tokens: usize,
    pub dynamic_pei: usize,
    pub dynamic_dxe: usize,
}

pub fn run(project: &Project, platform: Option<&Path>) -> Result<CheckSummary> {
    let platform_path = project.platform_path(platform);
    let description = load_platform(&platform_path)?;
    let database = merge_platform(&description)
        .with_context(|| format!("checking {}", platform_path.display()))?;

    let dynamic = partition(&database, false);
    let summary = CheckSummary {
        tokens: database.len(),
        dynamic_pei: dynamic.pei.len(),
        dynamic_dxe: dynamic.dxe.len(),
    };

    println!(
        "{}: {} modules, {} PCD tokens ({} dynamic in PEI, {} dynamic in DXE)",
        platform_path.display(),
        description.modules.len(),
        summary.tokens,
        summary.dynamic_pei,
        summary.dynamic_dxe
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::TEST_PLATFORM;

    #[test]
    fn check_counts_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("platform.toml");
        std::fs::write(&path, TEST_PLATFORM).unwrap();
        let project = Project::discover(dir.path()).unwrap();

        let summary = run(&project, Some(&path)).unwrap();
        assert_eq!(
            summary,
            CheckSummary {
                tokens: 3,
                dynamic_pei: 1,
                dynamic_dxe: 1,
            }
        );
    }

    #[test]
    fn check_reports_merge_errors() {
        let dir = tempfile::tempdir().unwrap();
        let broken = TEST_PLATFORM.replace("sku-id = 0\nvalue = \"28\"", "sku-id = 1\nvalue = \"28\"");
        std::fs::write(dir.path().join("platform.toml"), broken).unwrap();
        let project = Project::discover(dir.path()).unwrap();

        let err = run(&project, None).unwrap_err();
        assert!(format!("{err:#}").contains("no sku id = 0"));
    }

    #[test]
    fn check_reports_missing_platform() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::discover(dir.path()).unwrap();
        let err = run(&project, None).unwrap_err();
        assert!(err.to_string().contains("loading"));
    }
}
