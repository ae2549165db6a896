pub mod program;
pub mod shader;

use thiserror::Error;

use self::program::*;
use self::shader::*;
use crate::gl_api::device::Device;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Program(#[from] ProgramError),
}

/// Builds a vertex + fragment program from source text. Each stage is
/// created, sourced and compiled before the next one is started.
pub fn simple_pipeline<'d, D: Device + ?Sized>(
    device: &'d D,
    vert: &str,
    frag: &str,
) -> Result<Program<'d, D>, PipelineError> {
    let vert_shader = compile_stage(device, ShaderType::Vertex, vert)?;
    let frag_shader = compile_stage(device, ShaderType::Fragment, frag)?;

    Ok(ProgramBuilder::new(device, vert_shader, frag_shader).build()?)
}

fn compile_stage<'d, D: Device + ?Sized>(
    device: &'d D,
    shader_type: ShaderType,
    source: &str,
) -> ShaderResult<CompiledShader<'d, D>> {
    let shader = Shader::new(device, shader_type)?;
    shader.source(source)?;
    shader.compile()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl_api::soft::{Call, SoftDevice};
    use crate::scene::{FRAGMENT_SHADER, VERTEX_SHADER};
    use gl;

    #[test]
    fn builds_the_triangle_pipeline() {
        let device = SoftDevice::new(8, 8);
        let program = simple_pipeline(&device, VERTEX_SHADER, FRAGMENT_SHADER).unwrap();
        assert_ne!(program.id(), 0);

        let trace = device.trace();
        assert!(trace.contains(&Call::CreateShader(gl::VERTEX_SHADER)));
        assert!(trace.contains(&Call::CreateShader(gl::FRAGMENT_SHADER)));
    }

    #[test]
    fn shaders_are_released_after_link() {
        let device = SoftDevice::new(8, 8);
        let _program = simple_pipeline(&device, VERTEX_SHADER, FRAGMENT_SHADER).unwrap();

        let trace = device.trace();
        let link = trace.iter().position(|c| matches!(c, Call::LinkProgram(_))).unwrap();
        let deletes = trace
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, Call::DeleteShader(_)))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        assert_eq!(deletes.len(), 2);
        assert!(deletes.iter().all(|&i| i > link));
    }

    #[test]
    fn invalid_source_reports_a_log() {
        let device = SoftDevice::new(8, 8);
        let broken = "#version 330 core\nvoid main() {\n    gl_position = vec4(0.0);\n";
        match simple_pipeline(&device, broken, FRAGMENT_SHADER) {
            Err(PipelineError::Shader(ShaderError::Compile { stage, log })) => {
                assert_eq!(stage, ShaderType::Vertex);
                assert!(!log.trim().is_empty());
            }
            other => panic!("expected a compile error, got {:?}", other.map(|p| p.id())),
        }
        assert!(device.draws().is_empty());
        assert!(!device.trace().iter().any(|c| matches!(c, Call::CreateProgram(_))));
    }

    #[test]
    fn broken_fragment_stage_is_reported_as_fragment() {
        let device = SoftDevice::new(8, 8);
        let broken = "#version 330 core\nout vec4 FragColor;\nvoid main() {\n";
        match simple_pipeline(&device, VERTEX_SHADER, broken) {
            Err(PipelineError::Shader(ShaderError::Compile { stage, .. })) => {
                assert_eq!(stage, ShaderType::Fragment)
            }
            other => panic!("expected a compile error, got {:?}", other.map(|p| p.id())),
        };
    }

    #[test]
    fn stages_are_compiled_one_after_another() {
        let device = SoftDevice::new(8, 8);
        let _program = simple_pipeline(&device, VERTEX_SHADER, FRAGMENT_SHADER).unwrap();
        let trace = device.trace();
        let vertex_compile = trace.iter().position(|c| matches!(c, Call::CompileShader(_))).unwrap();
        let fragment_create = trace
            .iter()
            .position(|c| *c == Call::CreateShader(gl::FRAGMENT_SHADER))
            .unwrap();
        let program_create = trace.iter().position(|c| matches!(c, Call::CreateProgram(_))).unwrap();
        assert!(vertex_compile < fragment_create);
        assert!(fragment_create < program_create);
    }

    #[test]
    fn missing_version_is_rejected() {
        let device = SoftDevice::new(8, 8);
        let frag = "out vec4 FragColor;\nvoid main() { FragColor = vec4(1.0, 1.0, 1.0, 1.0); }\n";
        let err = simple_pipeline(&device, VERTEX_SHADER, frag).map(|p| p.id()).unwrap_err();
        assert!(err.to_string().contains("#version"), "{}", err);
    }

    #[test]
    fn failed_compile_leaks_nothing() {
        let device = SoftDevice::new(8, 8);
        let _ = simple_pipeline(&device, VERTEX_SHADER, "#version 330 core\nvoid main() {");
        assert_eq!(device.live_objects(), 0);
    }

    #[test]
    fn fragment_source_in_a_vertex_stage_fails_to_link() {
        let device = SoftDevice::new(8, 8);
        let a = Shader::new(&device, ShaderType::Vertex).unwrap();
        a.source(VERTEX_SHADER).unwrap();
        let b = Shader::new(&device, ShaderType::Vertex).unwrap();
        b.source(FRAGMENT_SHADER).unwrap();

        let raw = RawProgram::new(&device).unwrap();
        raw.attach_shader(&a.compile().unwrap()).unwrap();
        raw.attach_shader(&b.compile().unwrap()).unwrap();
        match raw.link() {
            Err(ProgramError::Link(log)) => assert!(!log.is_empty()),
            other => panic!("expected a link error, got {:?}", other.map(|p| p.id())),
        };
    }
}
