//! GLSL compilation and linking

use glow::HasContext;

/// Compile one shader stage
///
/// Returns the driver's info log on failure.
fn compile_stage(gl: &glow::Context, stage: u32, source: &str) -> Result<glow::Shader, String> {
    // SAFETY: the context is current on this thread for the backend's lifetime.
    unsafe {
        let shader = gl.create_shader(stage)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if gl.get_shader_compile_status(shader) {
            Ok(shader)
        } else {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            Err(log)
        }
    }
}

fn stage_name(stage: u32) -> &'static str {
    match stage {
        glow::VERTEX_SHADER => "vertex",
        glow::FRAGMENT_SHADER => "fragment",
        _ => "unknown",
    }
}

/// Compile both stages and link them into a program
///
/// Diagnostics are logged at error level; the returned message names the
/// failing step.
pub(super) fn link_program(gl: &glow::Context, vertex_source: &str, fragment_source: &str) -> Result<glow::Program, String> {
    let mut shaders = Vec::with_capacity(2);
    for (stage, source) in [(glow::VERTEX_SHADER, vertex_source), (glow::FRAGMENT_SHADER, fragment_source)] {
        match compile_stage(gl, stage, source) {
            Ok(shader) => shaders.push(shader),
            Err(info_log) => {
                log::error!("Compilation of {} shader failed:\n{}", stage_name(stage), info_log);
                // SAFETY: see above.
                unsafe {
                    for shader in shaders {
                        gl.delete_shader(shader);
                    }
                }
                return Err(format!("{} shader failed to compile", stage_name(stage)));
            }
        }
    }

    // SAFETY: see above.
    unsafe {
        let program = gl.create_program()?;
        for &shader in &shaders {
            gl.attach_shader(program, shader);
        }
        gl.link_program(program);
        for shader in shaders {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }

        if gl.get_program_link_status(program) {
            Ok(program)
        } else {
            log::error!("Failed to link shader program:\n{}", gl.get_program_info_log(program));
            gl.delete_program(program);
            Err("program failed to link".to_string())
        }
    }
}
