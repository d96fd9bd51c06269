use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

fn shader_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../shaders")
}

fn quadview() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_quadview"));
    command.env_remove("RUST_LOG");
    command
}

#[test]
fn fields_json_lists_camera_layout() {
    let output = quadview()
        .args(["fields", "--preset", "camera", "--json"])
        .output()
        .expect("failed to run quadview fields");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["name"], "camera");
    assert_eq!(report["geometry"], "split-quad");
    let fields = report["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 6);
    assert_eq!(fields[0]["uniform"], "height");
    assert_eq!(fields[5]["group"], "view");
}

#[test]
fn fields_table_shows_labels() {
    let output = quadview()
        .args(["fields", "--preset", "transform"])
        .output()
        .expect("failed to run quadview fields");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Rotate"));
    assert!(stdout.contains("[main]"));
}

#[test]
fn check_accepts_bundled_shaders() {
    for (preset, dir) in [("transform", "transform"), ("camera", "camera")] {
        let output = quadview()
            .args(["check", "--preset", preset, "--shader-dir"])
            .arg(shader_root().join(dir))
            .output()
            .expect("failed to run quadview check");
        assert!(
            output.status.success(),
            "{preset}: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.starts_with("ok:"), "{preset}: {stdout}");
        assert!(!stdout.contains("warning:"), "{preset}: {stdout}");
    }
}

#[test]
fn check_reports_compile_errors_from_config_dir() {
    let root = TempDir::new().unwrap();
    let shaders = root.path().join("glsl");
    fs::create_dir_all(&shaders).unwrap();
    fs::copy(
        shader_root().join("transform/vertex.glsl"),
        shaders.join("vertex.glsl"),
    )
    .unwrap();
    fs::write(
        shaders.join("fragment.glsl"),
        "#version 450\nvoid main() {\n    vec4 broken = ;\n}\n",
    )
    .unwrap();

    let config = root.path().join("viewer.toml");
    fs::write(
        &config,
        r#"
version = 1
fixed_width = 640
shaders = "glsl"

[[fields]]
uniform = "rotate"
label = "Rotate"
min = -180
max = 180
"#,
    )
    .unwrap();

    let output = quadview()
        .arg("check")
        .arg("--config")
        .arg(&config)
        .output()
        .expect("failed to run quadview check");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to compile fragment shader"), "{stderr}");
}

#[test]
fn unknown_preset_fails() {
    let output = quadview()
        .args(["fields", "--preset", "fisheye"])
        .output()
        .expect("failed to run quadview fields");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("fisheye"));
}
