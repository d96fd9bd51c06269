use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use wgpu::naga;

use crate::error::ShaderError;
use crate::gpu::pipeline::link_interface;
use crate::types::GeometryKind;

/// Pipeline stage a GLSL source is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Logical shader name; also the file stem under the shader directory.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }

    fn naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// GLSL source that parsed and validated cleanly, plus its naga IR for
/// reflection.
#[derive(Debug)]
pub(crate) struct CompiledShader {
    pub stage: ShaderStage,
    pub source: String,
    pub module: naga::Module,
}

pub(crate) fn shader_path(dir: &Path, stage: ShaderStage) -> PathBuf {
    dir.join(format!("{}.glsl", stage.name()))
}

/// Reads `<dir>/<stage>.glsl` and compiles it.
pub(crate) fn load_shader(dir: &Path, stage: ShaderStage) -> Result<CompiledShader, ShaderError> {
    let path = shader_path(dir, stage);
    let source = fs::read_to_string(&path).map_err(|source| ShaderError::Read {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), %stage, "loaded shader source");
    compile_source(source.trim(), stage)
}

pub(crate) fn compile_source(source: &str, stage: ShaderStage) -> Result<CompiledShader, ShaderError> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(stage.naga());
    let module = frontend
        .parse(&options, source)
        .map_err(|errors| ShaderError::Compile {
            shader: stage.name().to_string(),
            log: format_parse_errors(&errors, source),
        })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|error| ShaderError::Compile {
            shader: stage.name().to_string(),
            log: format_validation_error(&error, source),
        })?;

    Ok(CompiledShader {
        stage,
        source: source.to_string(),
        module,
    })
}

/// Hands the validated GLSL to wgpu, surfacing backend validation failures
/// as compile errors.
pub(crate) fn create_module(
    device: &wgpu::Device,
    shader: &CompiledShader,
) -> Result<wgpu::ShaderModule, ShaderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(shader.stage.name()),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(shader.source.as_str()),
            stage: shader.stage.naga(),
            defines: &[],
        },
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(ShaderError::Compile {
            shader: shader.stage.name().to_string(),
            log: error.to_string(),
        });
    }
    Ok(module)
}

/// Outcome of [`check_shaders`].
#[derive(Debug, Clone)]
pub struct ShaderReport {
    /// Float members of the uniform block, i.e. names that accept writes.
    pub uniforms: Vec<String>,
    /// Size of the uniform block in bytes.
    pub uniform_block_size: u64,
}

impl ShaderReport {
    pub fn accepts(&self, uniform: &str) -> bool {
        self.uniforms.iter().any(|name| name == uniform)
    }
}

/// Compiles and links both stages without touching a GPU.
pub fn check_shaders(dir: &Path, geometry: GeometryKind) -> Result<ShaderReport, ShaderError> {
    let vertex = load_shader(dir, ShaderStage::Vertex)?;
    let fragment = load_shader(dir, ShaderStage::Fragment)?;
    let layout = link_interface(&vertex, &fragment, geometry)?;
    Ok(ShaderReport {
        uniforms: layout.float_names().map(str::to_string).collect(),
        uniform_block_size: layout.buffer_size(),
    })
}

fn format_parse_errors(errors: &naga::front::glsl::ParseErrors, source: &str) -> String {
    errors
        .errors
        .iter()
        .map(|error| {
            let location = error.meta.location(source);
            format!(
                "{}:{}: {}",
                location.line_number, location.line_position, error
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_validation_error(
    error: &naga::WithSpan<naga::valid::ValidationError>,
    source: &str,
) -> String {
    let mut log = error.as_inner().to_string();
    for (span, label) in error.spans() {
        let location = span.location(source);
        log.push_str(&format!(
            "\n{}:{}: {}",
            location.line_number, location.line_position, label
        ));
    }
    log
}
