use cgmath::Matrix4;
use glow::HasContext;

use crate::renderer::RenderError;

pub const LIT_VERTEX: &str = include_str!("../shaders/lit.vert");
pub const LIT_FRAGMENT: &str = include_str!("../shaders/lit.frag");
pub const LINE_VERTEX: &str = include_str!("../shaders/line.vert");
pub const LINE_FRAGMENT: &str = include_str!("../shaders/line.frag");

#[derive(Debug)]
pub struct ShaderProgram {
    pub name: &'static str,
    pub program: glow::NativeProgram,
}

impl ShaderProgram {
    pub fn compile(
        gl: &glow::Context,
        name: &'static str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, RenderError> {
        unsafe {
            let vertex = compile_stage(gl, name, glow::VERTEX_SHADER, vertex_source)?;
            let fragment = match compile_stage(gl, name, glow::FRAGMENT_SHADER, fragment_source) {
                Ok(fragment) => fragment,
                Err(e) => {
                    gl.delete_shader(vertex);
                    return Err(e);
                }
            };

            let program = gl.create_program().map_err(RenderError::Resource)?;
            gl.attach_shader(program, vertex);
            gl.attach_shader(program, fragment);
            gl.link_program(program);

            gl.delete_shader(vertex);
            gl.delete_shader(fragment);

            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(RenderError::Link { name, log });
            }

            log::debug!("Linked shader program {}", name);
            Ok(Self { name, program })
        }
    }

    pub fn bind(&self, gl: &glow::Context) {
        unsafe { gl.use_program(Some(self.program)) }
    }

    // Uniforms the driver optimised away are silently skipped.

    pub fn set_mat4(&self, gl: &glow::Context, uniform: &str, matrix: &Matrix4<f32>) {
        unsafe {
            let location = gl.get_uniform_location(self.program, uniform);
            let values: &[f32; 16] = matrix.as_ref();
            gl.uniform_matrix_4_f32_slice(location.as_ref(), false, values);
        }
    }

    pub fn set_vec3(&self, gl: &glow::Context, uniform: &str, value: [f32; 3]) {
        unsafe {
            let location = gl.get_uniform_location(self.program, uniform);
            gl.uniform_3_f32(location.as_ref(), value[0], value[1], value[2]);
        }
    }

    pub fn set_vec4(&self, gl: &glow::Context, uniform: &str, value: [f32; 4]) {
        unsafe {
            let location = gl.get_uniform_location(self.program, uniform);
            gl.uniform_4_f32(location.as_ref(), value[0], value[1], value[2], value[3]);
        }
    }

    pub fn delete(&self, gl: &glow::Context) {
        unsafe { gl.delete_program(self.program) }
    }
}

unsafe fn compile_stage(
    gl: &glow::Context,
    name: &'static str,
    stage: u32,
    source: &str,
) -> Result<glow::NativeShader, RenderError> {
    let shader = gl.create_shader(stage).map_err(RenderError::Resource)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(RenderError::Shader {
            name,
            stage: if stage == glow::VERTEX_SHADER {
                "vertex"
            } else {
                "fragment"
            },
            log,
        });
    }

    Ok(shader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_sources_declare_expected_uniforms() {
        for source in [LIT_VERTEX, LIT_FRAGMENT, LINE_VERTEX, LINE_FRAGMENT] {
            assert!(source.starts_with("#version 330 core"));
        }
        assert!(LIT_VERTEX.contains("uniform mat4 u_mvp;"));
        assert!(LIT_FRAGMENT.contains("uniform vec3 u_sun_direction;"));
        assert!(LINE_VERTEX.contains("a_color"));
    }
}
