//! `pcdgen generate` — merge the platform and write both phase databases.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pcd_database::{generate, GenerateOptions, GeneratedDatabase, Templates};

use crate::commands::load_platform;
use crate::manifest::Project;

/// Generate the PEI and DXE databases.
///
/// Nothing is written unless generation of both phases succeeded.
pub fn run(
    project: &Project,
    platform: Option<&Path>,
    out_dir: Option<&Path>,
    include_static: bool,
) -> Result<Vec<PathBuf>> {
    let platform_path = project.platform_path(platform);
    let description = load_platform(&platform_path)?;

    let templates = &project.manifest.templates;
    let options = GenerateOptions {
        templates: Templates {
            common: project.load_template(templates.common.as_deref())?,
            pei: project.load_template(templates.pei.as_deref())?,
            dxe: project.load_template(templates.dxe.as_deref())?,
        },
        include_static_tokens: include_static || project.manifest.generate.include_static,
    };

    let generated = generate(&description, &options)
        .with_context(|| format!("generating PCD database for {}", platform_path.display()))?;

    let out_dir = project.out_dir(out_dir);
    let written = write_outputs(project, &out_dir, &generated)?;

    println!(
        "Generated PCD database: {} PEI tokens, {} DXE tokens",
        generated.pei.token_count(),
        generated.dxe.token_count()
    );
    for path in &written {
        println!("  {}", path.display());
    }
    Ok(written)
}

fn write_outputs(
    project: &Project,
    out_dir: &Path,
    generated: &GeneratedDatabase,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let names = &project.manifest.output;
    let files = [
        (&names.pei_header, &generated.pei_header),
        (&names.pei_source, &generated.pei_source),
        (&names.dxe_header, &generated.dxe_header),
        (&names.dxe_source, &generated.dxe_source),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = out_dir.join(name);
        fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        log::debug!("wrote {} ({} bytes)", path.display(), content.len());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::TEST_PLATFORM as PLATFORM;

    fn project_with(platform: &str, manifest: &str) -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("platform.toml"), platform).unwrap();
        fs::write(dir.path().join("pcdgen.toml"), manifest).unwrap();
        let project = Project::discover(dir.path()).unwrap();
        (dir, project)
    }

    #[test]
    fn generate_writes_all_outputs() {
        let (dir, project) = project_with(
            PLATFORM,
            "[templates]\ncommon = \"common.sample\"\n",
        );
        fs::write(dir.path().join("common.sample"), "#include <PcdCommon.h>\n").unwrap();

        let written = run(&project, None, None, false).unwrap();
        assert_eq!(written.len(), 4);
        for path in &written {
            assert!(path.is_file(), "{}", path.display());
        }

        let pei_header = fs::read_to_string(dir.path().join("out/PeiPcdDatabase.h")).unwrap();
        assert!(pei_header.starts_with("\r\n#include <PcdCommon.h>#define PEI_GUID_TABLE_SIZE"));
        assert!(pei_header.contains("#define PEI_LOCAL_TOKEN_NUMBER            1\r\n"));

        let dxe_header = fs::read_to_string(dir.path().join("out/DxePcdDatabase.h")).unwrap();
        assert!(dxe_header.starts_with(&pei_header));
        assert!(dxe_header.contains("#define DXE_EX_TOKEN_NUMBER       1\r\n"));

        let dxe_source = fs::read_to_string(dir.path().join("out/DxePcdDatabase.c")).unwrap();
        assert!(dxe_source.contains("L\"en-US\""));
    }

    #[test]
    fn include_static_from_flag_or_manifest() {
        let (dir, project) = project_with(PLATFORM, "[generate]\ninclude-static = true\n");
        run(&project, None, Some(&dir.path().join("gen")), false).unwrap();
        let pei_header = fs::read_to_string(dir.path().join("gen/PeiPcdDatabase.h")).unwrap();
        assert!(pei_header.contains("#define PEI_LOCAL_TOKEN_NUMBER            2\r\n"));
    }

    #[test]
    fn failed_generation_writes_nothing() {
        let broken = PLATFORM.replace("value = \"28\"", "value = \"300\"");
        let (dir, project) = project_with(&broken, "");
        let err = run(&project, None, None, false).unwrap_err();
        assert!(format!("{err:#}").contains("exceed the range of UINT8"));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn missing_template_is_an_error() {
        let (dir, project) = project_with(PLATFORM, "[templates]\npei = \"nope.sample\"\n");
        assert!(run(&project, None, None, false).is_err());
        assert!(!dir.path().join("out").exists());
    }
}
