use anyhow::{Context, Result};
use panel::FieldPanel;
use renderer::{check_shaders, Renderer, SCREEN_RATIO_UNIFORM};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use viewconfig::ViewerConfig;

use crate::bindings::{geometry_kind, load_config, renderer_config};
use crate::cli::{CheckArgs, FieldsArgs, RunArgs};

pub fn initialise_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = load_config(&args.source)?;
    let panel = config.build_panel()?;
    let renderer_config = renderer_config(&config, &args);
    tracing::info!(
        layout = config.display_name(),
        image = ?args.image,
        "launching viewer"
    );
    Renderer::new(renderer_config, panel)
        .run()
        .context("viewer exited with an error")
}

#[derive(Debug, Serialize)]
struct FieldRow<'a> {
    uniform: &'a str,
    label: &'a str,
    group: &'a str,
    min: f32,
    max: f32,
    step: f32,
    initial: f32,
}

#[derive(Debug, Serialize)]
struct FieldsReport<'a> {
    name: &'a str,
    geometry: viewconfig::GeometryLayout,
    fixed_width: u32,
    fields: Vec<FieldRow<'a>>,
}

fn field_rows(panel: &FieldPanel) -> Vec<FieldRow<'_>> {
    panel
        .fields()
        .iter()
        .map(|field| FieldRow {
            uniform: field.uniform(),
            label: field.label(),
            group: panel.groups()[field.group()].key(),
            min: field.slider().min(),
            max: field.slider().max(),
            step: field.slider().step(),
            initial: field.initial(),
        })
        .collect()
}

pub fn print_fields(args: &FieldsArgs) -> Result<()> {
    let config = load_config(&args.source)?;
    let panel = config.build_panel()?;
    let rows = field_rows(&panel);

    if args.json {
        let report = FieldsReport {
            name: config.display_name(),
            geometry: config.geometry,
            fixed_width: config.fixed_width,
            fields: rows,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} ({:?}, fixed width {})",
        config.display_name(),
        config.geometry,
        config.fixed_width
    );
    for (index, group) in panel.groups().iter().enumerate() {
        let closed = if group.is_closed() { " (closed)" } else { "" };
        println!("  [{}] {}{closed}", group.key(), group.title());
        for (row, field) in rows.iter().zip(panel.fields()) {
            if field.group() != index {
                continue;
            }
            println!(
                "    {:<16} {:<16} {} .. {}  step {}  initial {}",
                row.uniform, row.label, row.min, row.max, row.step, row.initial
            );
        }
    }
    Ok(())
}

/// Uniform names the layout writes but the shaders do not declare.
fn missing_uniforms(config: &ViewerConfig, declared: impl Fn(&str) -> bool) -> Vec<String> {
    let mut missing: Vec<String> = config
        .fields
        .iter()
        .map(|field| field.uniform.as_str())
        .chain(config.uniforms.keys().map(String::as_str))
        .chain(std::iter::once(SCREEN_RATIO_UNIFORM))
        .filter(|name| !declared(name))
        .map(str::to_string)
        .collect();
    missing.sort();
    missing.dedup();
    missing
}

pub fn check(args: &CheckArgs) -> Result<()> {
    let config = load_config(&args.source)?;
    let report = check_shaders(&config.shaders, geometry_kind(config.geometry))
        .with_context(|| format!("shaders in {} failed to build", config.shaders.display()))?;

    for name in missing_uniforms(&config, |name| report.accepts(name)) {
        tracing::warn!(uniform = %name, "uniform is not declared by the shaders; writes will be ignored");
        println!("warning: uniform '{name}' is not declared by the shaders");
    }
    println!(
        "ok: {} ({} writable uniforms, {} byte block)",
        config.shaders.display(),
        report.uniforms.len(),
        report.uniform_block_size
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_uniforms_missing_from_shaders() {
        let config = ViewerConfig::preset("transform").unwrap();
        let declared = ["rotate", "scale", "screen_ratio"];
        let missing = missing_uniforms(&config, |name| declared.contains(&name));
        assert_eq!(missing, ["squeeze", "translate_x", "translate_y"]);
    }

    #[test]
    fn field_rows_follow_panel_resolution() {
        let config = ViewerConfig::preset("camera").unwrap();
        let panel = config.build_panel().unwrap();
        let rows = field_rows(&panel);
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].uniform, "height");
        assert_eq!(rows[0].group, "camera");
        assert_eq!(rows[0].initial, 1.7);
        assert_eq!(rows.last().map(|row| row.group), Some("view"));
    }
}
