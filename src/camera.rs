use cgmath::{point3, vec3, InnerSpace, Matrix4, Point3, SquareMatrix, Vector3};

#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub name: String,

    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,

    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,

    pub fov: f32, // in deg
    pub aspect_ratio: f32,
    pub width: u32,
    pub height: u32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl PerspectiveCamera {
    pub fn new(
        name: String,
        position: Point3<f32>,
        fov: f32,
        width: u32,
        height: u32,
        near_plane: f32,
        far_plane: f32,
    ) -> Self {
        let mut camera = Self {
            name,

            view: Matrix4::identity(),
            projection: Matrix4::identity(),

            position,
            target: point3(0.0, 0.0, 0.0),
            up: vec3(0.0, 1.0, 0.0),

            fov,
            aspect_ratio: 1.0,
            width: 1,
            height: 1,

            near_plane,
            far_plane,
        };

        camera.set_viewport_size(width, height);
        camera
    }

    pub fn set_position(&mut self, position: Point3<f32>) {
        self.position = position;
    }

    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    /// Keeps the aspect ratio in sync with the output size. Zero sizes
    /// (minimised windows) are clamped to one pixel.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.aspect_ratio = self.width as f32 / self.height as f32;
    }

    pub fn orientation(&self) -> Vector3<f32> {
        let direction = self.target - self.position;
        if direction.magnitude2() > f32::EPSILON {
            direction.normalize()
        } else {
            vec3(0.0, 0.0, -1.0)
        }
    }

    pub fn update_matrices(&mut self) {
        self.view = Matrix4::look_at_rh(self.position, self.position + self.orientation(), self.up);
        self.projection = cgmath::perspective(
            cgmath::Deg(self.fov),
            self.aspect_ratio,
            self.near_plane,
            self.far_plane,
        );
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view
    }
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub damping: Option<f32>,
    pub auto_rotate: Option<f32>, // deg per second
    pub sensitivity: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    yaw_velocity: f32,
    pitch_velocity: f32,
    zoom_velocity: f32,
}

impl OrbitControls {
    pub fn new(target: Point3<f32>) -> Self {
        Self {
            target,
            damping: None,
            auto_rotate: None,
            sensitivity: 0.005,
            min_distance: 0.5,
            max_distance: 100.0,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            zoom_velocity: 0.0,
        }
    }

    pub fn with_damping(mut self, factor: f32) -> Self {
        self.damping = Some(factor.clamp(0.0, 1.0));
        self
    }

    pub fn with_auto_rotate(mut self, deg_per_second: f32) -> Self {
        self.auto_rotate = Some(deg_per_second);
        self
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw_velocity -= dx * self.sensitivity;
        self.pitch_velocity -= dy * self.sensitivity;
    }

    pub fn zoom(&mut self, amount: f32) {
        self.zoom_velocity += amount;
    }

    pub fn update(&mut self, camera: &mut PerspectiveCamera, dt: f32) {
        let mut yaw = self.yaw_velocity;
        let pitch = self.pitch_velocity;

        if let Some(speed) = self.auto_rotate {
            yaw += speed.to_radians() * dt;
        }

        let offset = camera.position - self.target;
        let radius = (offset.magnitude() * (1.0 - self.zoom_velocity))
            .clamp(self.min_distance, self.max_distance);

        // Spherical coordinates around +Y
        let mut theta = offset.x.atan2(offset.z) + yaw;
        let mut phi = (offset.y / offset.magnitude().max(f32::EPSILON))
            .clamp(-1.0, 1.0)
            .acos()
            + pitch;
        phi = phi.clamp(0.01, std::f32::consts::PI - 0.01);
        theta %= std::f32::consts::TAU;

        camera.position = self.target
            + vec3(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
        camera.look_at(self.target);

        match self.damping {
            Some(factor) => {
                self.yaw_velocity *= 1.0 - factor;
                self.pitch_velocity *= 1.0 - factor;
                self.zoom_velocity *= 1.0 - factor;
            }
            None => {
                self.yaw_velocity = 0.0;
                self.pitch_velocity = 0.0;
                self.zoom_velocity = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::MetricSpace;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(
            "Test Camera".to_string(),
            point3(0.0, 0.0, 10.0),
            75.0,
            800,
            600,
            0.1,
            1000.0,
        )
    }

    #[test]
    fn resize_updates_aspect_ratio() {
        let mut camera = camera();
        assert!((camera.aspect_ratio - 800.0 / 600.0).abs() < 1e-6);
        camera.set_viewport_size(1920, 1080);
        assert!((camera.aspect_ratio - 1920.0 / 1080.0).abs() < 1e-6);
        camera.set_viewport_size(0, 0);
        assert_eq!(camera.aspect_ratio, 1.0);
    }

    #[test]
    fn auto_rotate_keeps_distance() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(point3(0.0, 0.0, 0.0)).with_auto_rotate(90.0);
        controls.update(&mut camera, 1.0);

        let distance = camera.position.distance(point3(0.0, 0.0, 0.0));
        assert!((distance - 10.0).abs() < 1e-3);
        assert!((camera.position.x - 10.0).abs() < 1e-3);
    }

    #[test]
    fn damping_decays_velocity() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(point3(0.0, 0.0, 0.0)).with_damping(0.5);
        controls.rotate(100.0, 0.0);
        controls.update(&mut camera, 0.016);
        let first = camera.position;
        controls.update(&mut camera, 0.016);
        assert_ne!(first, camera.position);
    }

    #[test]
    fn without_damping_motion_stops_after_one_update() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(point3(0.0, 0.0, 0.0));
        controls.rotate(100.0, 0.0);
        controls.update(&mut camera, 0.016);
        let first = camera.position;
        controls.update(&mut camera, 0.016);
        assert!(first.distance(camera.position) < 1e-4);
    }
}
