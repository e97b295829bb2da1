//! Shader stages: reading WGSL sources and compiling them with naga.
//!
//! Compilation here means parse + validate. Linking stages into a program
//! lives in [`crate::program`].

use std::fmt;
use std::path::{Path, PathBuf};

/// Errors anywhere on the path from shader file to usable program.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read shader source {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} shader '{label}' failed to compile:\n{diagnostic}")]
    Compile {
        stage: ShaderStage,
        label: String,
        diagnostic: String,
    },
    #[error("{stage} shaders are not supported by the wgpu backend")]
    UnsupportedStage { stage: ShaderStage },
    #[error("program '{label}' failed to link: {reason}")]
    Link { label: String, reason: String },
    #[error("program '{label}' ran out of uniform slots ({capacity} draws per frame)")]
    SlotsExhausted { label: String, capacity: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    /// Accepted in program descriptions but rejected at compile time: wgpu
    /// has no geometry stage.
    Geometry,
}

impl ShaderStage {
    fn naga_stage(self) -> Option<naga::ShaderStage> {
        match self {
            ShaderStage::Vertex => Some(naga::ShaderStage::Vertex),
            ShaderStage::Fragment => Some(naga::ShaderStage::Fragment),
            ShaderStage::Geometry => None,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Geometry => "geometry",
        })
    }
}

/// Read a whole shader source file.
pub fn read_source(path: impl AsRef<Path>) -> Result<String, ShaderError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| ShaderError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("read shader source {} ({} bytes)", path.display(), source.len());
    Ok(source)
}

/// A parsed and validated WGSL module for one stage.
#[derive(Debug)]
pub struct CompiledStage {
    stage: ShaderStage,
    label: String,
    source: String,
    module: naga::Module,
}

impl CompiledStage {
    pub fn compile(
        stage: ShaderStage,
        label: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, ShaderError> {
        let label = label.into();
        let source = source.into();
        if stage.naga_stage().is_none() {
            return Err(ShaderError::UnsupportedStage { stage });
        }

        let module = naga::front::wgsl::parse_str(&source).map_err(|e| ShaderError::Compile {
            stage,
            label: label.clone(),
            diagnostic: e.emit_to_string(&source),
        })?;

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .map_err(|e| ShaderError::Compile {
            stage,
            label: label.clone(),
            diagnostic: e.emit_to_string(&source),
        })?;

        tracing::debug!(%stage, label = %label, "compiled shader stage");
        Ok(Self {
            stage,
            label,
            source,
            module,
        })
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn module(&self) -> &naga::Module {
        &self.module
    }

    /// First entry point whose stage matches this compiled stage.
    pub fn entry_point(&self) -> Option<&naga::EntryPoint> {
        let wanted = self.stage.naga_stage()?;
        self.module.entry_points.iter().find(|ep| ep.stage == wanted)
    }
}

/// Compile every `(stage, label, source)`, logging each failure, and return
/// the first failure if any stage did not compile.
pub fn compile_all(
    sources: Vec<(ShaderStage, String, String)>,
) -> Result<Vec<CompiledStage>, ShaderError> {
    let mut compiled = Vec::with_capacity(sources.len());
    let mut first_error = None;
    for (stage, label, source) in sources {
        match CompiledStage::compile(stage, label, source) {
            Ok(c) => compiled.push(c),
            Err(e) => {
                tracing::error!("{e}");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(compiled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
        @vertex
        fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(position, 1.0);
        }
    "#;

    const BROKEN_FRAGMENT: &str = r#"
        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return undeclared_color
        }
    "#;

    #[test]
    fn compiles_valid_vertex_stage() {
        let stage = CompiledStage::compile(ShaderStage::Vertex, "test.vert", VERTEX).unwrap();
        assert_eq!(stage.entry_point().map(|ep| ep.name.as_str()), Some("vs_main"));
        assert_eq!(stage.stage(), ShaderStage::Vertex);
    }

    #[test]
    fn syntax_error_reports_diagnostic() {
        let err = CompiledStage::compile(ShaderStage::Fragment, "broken.frag", BROKEN_FRAGMENT)
            .unwrap_err();
        match err {
            ShaderError::Compile {
                stage,
                label,
                diagnostic,
            } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(label, "broken.frag");
                assert!(!diagnostic.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn type_error_is_a_compile_error() {
        let src = r#"
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return 1.0;
            }
        "#;
        let err = CompiledStage::compile(ShaderStage::Fragment, "typed.frag", src).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { .. }));
    }

    #[test]
    fn geometry_stage_unsupported() {
        let err = CompiledStage::compile(ShaderStage::Geometry, "g", VERTEX).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::UnsupportedStage {
                stage: ShaderStage::Geometry
            }
        ));
    }

    #[test]
    fn entry_point_must_match_stage() {
        let stage = CompiledStage::compile(ShaderStage::Fragment, "wrong", VERTEX).unwrap();
        assert!(stage.entry_point().is_none());
    }

    #[test]
    fn compile_all_returns_first_failure() {
        let err = compile_all(vec![
            (ShaderStage::Vertex, "v".into(), VERTEX.into()),
            (ShaderStage::Fragment, "f".into(), BROKEN_FRAGMENT.into()),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_source(dir.path().join("absent.wgsl")).unwrap_err();
        assert!(matches!(err, ShaderError::Read { .. }));
    }
}
