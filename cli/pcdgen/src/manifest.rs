//! `pcdgen.toml` manifest parsing and project configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "pcdgen.toml";

/// The top-level manifest of a platform build directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PcdgenManifest {
    /// Project metadata.
    #[serde(default)]
    pub project: ProjectConfig,
    /// Where and under which names generated files are written.
    #[serde(default)]
    pub output: OutputConfig,
    /// Boilerplate fragments spliced into the headers.
    #[serde(default)]
    pub templates: TemplatesConfig,
    /// Generation defaults.
    #[serde(default)]
    pub generate: GenerateConfig,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Platform description, relative to the manifest directory.
    #[serde(default = "default_platform")]
    pub platform: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: None,
            platform: default_platform(),
        }
    }
}

fn default_platform() -> String {
    "platform.toml".to_string()
}

/// Output section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default = "default_out_dir")]
    pub dir: String,
    #[serde(default = "default_pei_header")]
    pub pei_header: String,
    #[serde(default = "default_pei_source")]
    pub pei_source: String,
    #[serde(default = "default_dxe_header")]
    pub dxe_header: String,
    #[serde(default = "default_dxe_source")]
    pub dxe_source: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_out_dir(),
            pei_header: default_pei_header(),
            pei_source: default_pei_source(),
            dxe_header: default_dxe_header(),
            dxe_source: default_dxe_source(),
        }
    }
}

fn default_out_dir() -> String {
    "out".to_string()
}

fn default_pei_header() -> String {
    "PeiPcdDatabase.h".to_string()
}

fn default_pei_source() -> String {
    "PeiPcdDatabase.c".to_string()
}

fn default_dxe_header() -> String {
    "DxePcdDatabase.h".to_string()
}

fn default_dxe_source() -> String {
    "DxePcdDatabase.c".to_string()
}

/// Template fragment paths, relative to the manifest directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default)]
    pub common: Option<String>,
    #[serde(default)]
    pub pei: Option<String>,
    #[serde(default)]
    pub dxe: Option<String>,
}

/// Generation defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GenerateConfig {
    /// Lay out non-dynamic tokens as well.
    #[serde(default)]
    pub include_static: bool,
}

impl PcdgenManifest {
    /// Search upward from `start_dir` for a `pcdgen.toml` file, parse and return it
    /// along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: PcdgenManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                log::debug!("using manifest {}", candidate.display());
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing pcdgen.toml")
    }
}

/// Manifest (or defaults) plus the directory paths are resolved against.
#[derive(Debug, Clone)]
pub struct Project {
    pub dir: PathBuf,
    pub manifest: PcdgenManifest,
}

impl Project {
    /// Locate the project from `cwd`; without a manifest, `cwd` with defaults.
    pub fn discover(cwd: &Path) -> Result<Self> {
        Ok(match PcdgenManifest::find_and_load(cwd)? {
            Some((manifest, dir)) => Self { dir, manifest },
            None => Self {
                dir: cwd.to_path_buf(),
                manifest: PcdgenManifest::default(),
            },
        })
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.dir.join(path)
    }

    /// `--platform` if given, else the manifest's platform file.
    pub fn platform_path(&self, override_path: Option<&Path>) -> PathBuf {
        match override_path {
            Some(path) => path.to_path_buf(),
            None => self.resolve(&self.manifest.project.platform),
        }
    }

    /// `--out-dir` if given, else the manifest's output directory.
    pub fn out_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        match override_dir {
            Some(dir) => dir.to_path_buf(),
            None => self.resolve(&self.manifest.output.dir),
        }
    }

    /// Read one template fragment; absent entries yield an empty fragment.
    pub fn load_template(&self, path: Option<&str>) -> Result<String> {
        match path {
            Some(path) => {
                let path = self.resolve(path);
                std::fs::read_to_string(&path)
                    .with_context(|| format!("reading template {}", path.display()))
            }
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let toml_str = r#"
[project]
name = "Nt32"
platform = "Nt32.platform.toml"

[output]
dir = "Build/Pcd"
pei-header = "PcdPeimAutogen.h"
dxe-source = "PcdDxeAutogen.c"

[templates]
common = "Conf/Pcd/PcdDatabaseCommonDefinitions.sample"
pei = "Conf/Pcd/PcdDatabasePeiDefinitions.sample"
dxe = "Conf/Pcd/PcdDatabaseDxeDefinitions.sample"

[generate]
include-static = true
"#;
        let manifest = PcdgenManifest::from_str(toml_str).unwrap();
        assert_eq!(manifest.project.name.as_deref(), Some("Nt32"));
        assert_eq!(manifest.project.platform, "Nt32.platform.toml");
        assert_eq!(manifest.output.dir, "Build/Pcd");
        assert_eq!(manifest.output.pei_header, "PcdPeimAutogen.h");
        assert_eq!(manifest.output.pei_source, "PeiPcdDatabase.c");
        assert_eq!(manifest.output.dxe_source, "PcdDxeAutogen.c");
        assert!(manifest.templates.dxe.is_some());
        assert!(manifest.generate.include_static);
    }

    #[test]
    fn parse_minimal_manifest() {
        let manifest = PcdgenManifest::from_str("").unwrap();
        assert_eq!(manifest.project.platform, "platform.toml");
        assert_eq!(manifest.output.dir, "out");
        assert_eq!(manifest.output.dxe_header, "DxePcdDatabase.h");
        assert!(manifest.templates.common.is_none());
        assert!(!manifest.generate.include_static);
    }

    #[test]
    fn find_manifest_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            "[project]\nplatform = \"p.toml\"\n",
        )
        .unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let project = Project::discover(&nested).unwrap();
        assert_eq!(project.dir, dir.path());
        assert_eq!(project.platform_path(None), dir.path().join("p.toml"));
        assert_eq!(
            project.platform_path(Some(Path::new("/tmp/x.toml"))),
            PathBuf::from("/tmp/x.toml")
        );
    }

    #[test]
    fn missing_manifest_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::discover(dir.path()).unwrap();
        assert_eq!(project.out_dir(None), dir.path().join("out"));
        assert_eq!(project.load_template(None).unwrap(), "");
        assert!(project.load_template(Some("missing.sample")).is_err());
    }
}
