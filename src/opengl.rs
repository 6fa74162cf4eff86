use glow::HasContext;

use crate::renderer::RenderError;

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub index: u32,
    pub size: i32,
    pub offset: usize,
}

impl Layout {
    pub fn new(index: u32, size: i32, offset: usize) -> Self {
        Self {
            index,
            size,
            offset,
        }
    }
}

/// Two tightly packed vec3 attributes: position then normal (or colour for lines).
pub fn vec3_pair_layouts() -> Vec<Layout> {
    vec![
        Layout::new(0, 3, 0),
        Layout::new(1, 3, 3 * std::mem::size_of::<f32>()),
    ]
}

pub fn stride_of(layouts: &[Layout]) -> i32 {
    layouts
        .iter()
        .map(|l| l.offset + l.size as usize * std::mem::size_of::<f32>())
        .max()
        .unwrap_or(0) as i32
}

#[derive(Debug, Clone)]
pub struct RenderData {
    pub vao: glow::NativeVertexArray,
    pub vbo: glow::NativeBuffer,
    pub ebo: Option<glow::NativeBuffer>,
    pub stride: i32,
    pub layouts: Vec<Layout>,

    pub vertex_count: i32,
    pub index_count: i32,
}

impl RenderData {
    pub fn new(
        gl: &glow::Context,
        vertices: &[f32],
        indices: &[u32],
        layouts: Vec<Layout>,
    ) -> Result<Self, RenderError> {
        let stride = stride_of(&layouts);
        let floats_per_vertex = (stride as usize / std::mem::size_of::<f32>()).max(1);

        unsafe {
            let vao = gl.create_vertex_array().map_err(RenderError::Resource)?;
            gl.bind_vertex_array(Some(vao));

            let vbo = gl.create_buffer().map_err(RenderError::Resource)?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(vertices),
                glow::STATIC_DRAW,
            );

            let ebo = if indices.is_empty() {
                None
            } else {
                let ebo = gl.create_buffer().map_err(RenderError::Resource)?;
                gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
                gl.buffer_data_u8_slice(
                    glow::ELEMENT_ARRAY_BUFFER,
                    bytemuck::cast_slice(indices),
                    glow::STATIC_DRAW,
                );
                Some(ebo)
            };

            for layout in &layouts {
                gl.vertex_attrib_pointer_f32(
                    layout.index,
                    layout.size,
                    glow::FLOAT,
                    false,
                    stride,
                    layout.offset as i32,
                );
                gl.enable_vertex_attrib_array(layout.index);
            }

            gl.bind_vertex_array(None);

            Ok(Self {
                vao,
                vbo,
                ebo,
                stride,
                layouts,

                vertex_count: (vertices.len() / floats_per_vertex) as i32,
                index_count: indices.len() as i32,
            })
        }
    }

    pub fn draw(&self, gl: &glow::Context, mode: u32) {
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            if self.ebo.is_some() {
                gl.draw_elements(mode, self.index_count, glow::UNSIGNED_INT, 0);
            } else {
                gl.draw_arrays(mode, 0, self.vertex_count);
            }
            gl.bind_vertex_array(None);
        }
    }

    pub fn delete(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
            if let Some(ebo) = self.ebo {
                gl.delete_buffer(ebo);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_covers_both_attributes() {
        let layouts = vec3_pair_layouts();
        assert_eq!(layouts[1].offset, 12);
        assert_eq!(stride_of(&layouts), 24);
        assert_eq!(stride_of(&[]), 0);
    }
}
