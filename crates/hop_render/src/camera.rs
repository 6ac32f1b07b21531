use glam::Mat4;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Fixed-viewport orthographic camera. The simulation lives in a y-down
/// 800x600 coordinate space (row 0 of the level grid is the top of the
/// screen); the projection maps that space onto the window regardless of the
/// window's actual pixel size.
pub struct ScreenCamera {
    pub world_width: f32,
    pub world_height: f32,
}

impl ScreenCamera {
    pub fn new(world_width: f32, world_height: f32) -> Self {
        Self {
            world_width,
            world_height,
        }
    }

    pub fn build_uniform(&self) -> CameraUniform {
        // bottom = world_height, top = 0 flips the axis so +y is downward.
        let proj = Mat4::orthographic_rh(0.0, self.world_width, self.world_height, 0.0, -1.0, 1.0);

        CameraUniform {
            view_proj: proj.to_cols_array_2d(),
        }
    }
}
