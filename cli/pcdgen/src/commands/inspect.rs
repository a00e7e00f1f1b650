//! `pcdgen inspect` — print the merged token set per phase.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};
use pcd_collect::{merge_platform, Phase};
use pcd_core::{SourceKind, Token};
use pcd_database::{generate_from_tokens, GenerateOptions};
use serde::Serialize;

use crate::commands::load_platform;
use crate::manifest::Project;

#[derive(Serialize)]
struct PhaseView<'a> {
    phase: Phase,
    tokens: &'a [Token],
}

/// Inspect the tokens of one or both phases, in layout order.
pub fn run(
    project: &Project,
    platform: Option<&Path>,
    phase: Option<&str>,
    format: Option<&str>,
    include_static: bool,
) -> Result<String> {
    let phases = match phase {
        None => vec![Phase::Pei, Phase::Dxe],
        Some(p) if p.eq_ignore_ascii_case("pei") => vec![Phase::Pei],
        Some(p) if p.eq_ignore_ascii_case("dxe") => vec![Phase::Dxe],
        Some(other) => bail!("unknown phase '{other}' (expected pei or dxe)"),
    };

    let platform_path = project.platform_path(platform);
    let description = load_platform(&platform_path)?;
    let database = merge_platform(&description)
        .with_context(|| format!("merging {}", platform_path.display()))?;
    let options = GenerateOptions {
        include_static_tokens: include_static || project.manifest.generate.include_static,
        ..Default::default()
    };
    let generated = generate_from_tokens(&database, &options)?;

    let views: Vec<PhaseView<'_>> = phases
        .into_iter()
        .map(|phase| PhaseView {
            phase,
            tokens: &generated.phase(phase).tokens,
        })
        .collect();

    let output = match format.unwrap_or("text") {
        "text" => render_text(&views),
        "json" => serde_json::to_string_pretty(&views).context("serializing tokens")?,
        other => bail!("unknown format '{other}' (expected text or json)"),
    };
    println!("{output}");
    Ok(output)
}

fn render_text(views: &[PhaseView<'_>]) -> String {
    let mut out = String::new();
    for view in views {
        let _ = writeln!(out, "{} ({} tokens)", view.phase, view.tokens.len());
        for token in view.tokens {
            let number = token
                .token_number
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string());
            let kinds: Vec<String> = token.item_types.iter().map(|k| k.to_string()).collect();
            let modules: Vec<&str> = token.usages.iter().map(|u| u.module.as_str()).collect();
            let _ = writeln!(
                out,
                "  [{number}] {} {} ({} bytes) {} default={} skus={} modules={}",
                token.key.cname,
                token.datum_type,
                token.datum_size,
                kinds.join("|"),
                describe_default(token),
                token.sku_data.len(),
                modules.join(",")
            );
        }
    }
    out
}

fn describe_default(token: &Token) -> String {
    match (token.default_kind(), token.default_source()) {
        (Some(SourceKind::Constant), Some(source)) => {
            source.constant_value().unwrap_or_default().to_string()
        }
        (Some(SourceKind::Hii), _) => "HII".to_string(),
        (Some(SourceKind::Vpd), _) => "VPD".to_string(),
        _ => "-".to_string(),
    }
}
