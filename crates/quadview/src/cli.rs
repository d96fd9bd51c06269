use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use renderer::ColorSpaceMode;

#[derive(Parser, Debug)]
#[command(
    name = "quadview",
    author,
    version,
    about = "Interactive image viewer driven by GLSL shaders",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
    /// Raise log verbosity (`-v` debug, `-vv` trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Where the viewer layout comes from, plus overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Bundled layout to use (`transform` or `camera`); defaults to `transform`.
    #[arg(long, value_name = "NAME", conflicts_with = "config")]
    pub preset: Option<String>,

    /// Viewer layout TOML file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding `vertex.glsl` and `fragment.glsl`.
    #[arg(long, value_name = "DIR")]
    pub shader_dir: Option<PathBuf>,

    /// Canvas width loaded images are fitted to.
    #[arg(long, value_name = "PIXELS")]
    pub fixed_width: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Image to show on startup; more can be dropped onto the window.
    #[arg(value_name = "IMAGE")]
    pub image: Option<PathBuf>,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Initial window size before an image is loaded (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_color_space,
        default_value = "auto"
    )]
    pub color_space: ColorSpaceMode,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved field layout.
    Fields(FieldsArgs),
    /// Validate the layout and compile both shader stages without a window.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct FieldsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in --size".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in --size".to_string())?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".into());
    }

    Ok((width, height))
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(ColorSpaceMode::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_sizes() {
        assert_eq!(parse_surface_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_surface_size(" 800 X 600 "), Ok((800, 600)));
        assert_eq!(parse_surface_size("640×480"), Ok((640, 480)));
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("0x10").is_err());
        assert!(parse_surface_size("wide x tall").is_err());
    }

    #[test]
    fn parses_color_spaces() {
        assert_eq!(parse_color_space("AUTO"), Ok(ColorSpaceMode::Auto));
        assert_eq!(parse_color_space("gamma"), Ok(ColorSpaceMode::Gamma));
        assert_eq!(parse_color_space("srgb"), Ok(ColorSpaceMode::Linear));
        assert!(parse_color_space("").is_err());
        assert!(parse_color_space("hdr").is_err());
    }

    #[test]
    fn cli_accepts_image_and_overrides() {
        let cli = Cli::try_parse_from([
            "quadview",
            "photo.jpg",
            "--preset",
            "camera",
            "--fixed-width",
            "1200",
            "--size",
            "640x480",
            "-vv",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.run.image, Some(PathBuf::from("photo.jpg")));
        assert_eq!(cli.run.source.preset.as_deref(), Some("camera"));
        assert_eq!(cli.run.source.fixed_width, Some(1200));
        assert_eq!(cli.run.size, Some((640, 480)));
    }

    #[test]
    fn preset_and_config_conflict() {
        let err = Cli::try_parse_from(["quadview", "--preset", "camera", "--config", "a.toml"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn subcommands_take_their_own_source() {
        let cli = Cli::try_parse_from(["quadview", "fields", "--preset", "camera", "--json"]).unwrap();
        match cli.command {
            Some(Command::Fields(args)) => {
                assert!(args.json);
                assert_eq!(args.source.preset.as_deref(), Some("camera"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
