//! Two-phase database generation.

use pcd_collect::{merge_platform, partition, Phase, PlatformDescription, TokenDatabase};

use crate::assemble::{DatabaseAssembler, PhaseDatabase};
use crate::error::{DatabaseError, Result};

/// Boilerplate spliced around the generated phase headers.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    /// Definitions shared by both phases, placed first in the PEI header.
    pub common: String,
    /// Appended after the PEI phase header.
    pub pei: String,
    /// Appended after the DXE phase header.
    pub dxe: String,
}

/// Options for [`generate`].
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub templates: Templates,
    /// Lay out every merged token, not only dynamic ones.
    pub include_static_tokens: bool,
}

/// Generated text of both phases.
#[derive(Debug, Clone)]
pub struct GeneratedDatabase {
    pub pei_header: String,
    pub pei_source: String,
    /// Includes the full PEI header, since the DXE database extends it.
    pub dxe_header: String,
    pub dxe_source: String,
    pub pei: PhaseDatabase,
    pub dxe: PhaseDatabase,
}

impl GeneratedDatabase {
    pub fn phase(&self, phase: Phase) -> &PhaseDatabase {
        match phase {
            Phase::Pei => &self.pei,
            Phase::Dxe => &self.dxe,
        }
    }
}

/// Merge the platform's modules and generate both phase databases.
pub fn generate(
    platform: &PlatformDescription,
    options: &GenerateOptions,
) -> Result<GeneratedDatabase> {
    let database = merge_platform(platform)?;
    generate_from_tokens(&database, options)
}

/// Generate both phase databases from already merged tokens.
pub fn generate_from_tokens(
    database: &TokenDatabase,
    options: &GenerateOptions,
) -> Result<GeneratedDatabase> {
    let tokens = partition(database, options.include_static_tokens);

    let pei = DatabaseAssembler::new(Phase::Pei, 0).assemble(&tokens.pei)?;
    let dxe_start =
        u32::try_from(pei.token_count()).map_err(|_| DatabaseError::TokenNumberOverflow {
            phase: Phase::Dxe.to_string(),
            cname: tokens
                .dxe
                .first()
                .map(|t| t.key.cname.clone())
                .unwrap_or_default(),
        })?;
    let dxe = DatabaseAssembler::new(Phase::Dxe, dxe_start).assemble(&tokens.dxe)?;
    log::debug!(
        "PEI tokens 0..{dxe_start}, DXE tokens {dxe_start}..{}",
        dxe_start as usize + dxe.token_count()
    );

    let templates = &options.templates;
    let pei_header = format!(
        "{}{}{}",
        fragment(&templates.common),
        pei.header,
        fragment(&templates.pei)
    );
    let dxe_header = format!("{pei_header}{}{}", dxe.header, fragment(&templates.dxe));

    Ok(GeneratedDatabase {
        pei_source: pei.source.clone(),
        dxe_source: dxe.source.clone(),
        pei_header,
        dxe_header,
        pei,
        dxe,
    })
}

/// Re-line a boilerplate fragment with CRLF, each line preceded by a break.
fn fragment(text: &str) -> String {
    text.lines().map(|line| format!("\r\n{line}")).collect()
}
