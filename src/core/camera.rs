use glam::{Mat4, Vec2, Vec3};

/// Pitch is kept strictly inside the poles, the basis derivation degenerates at +-90.
pub const PITCH_LIMIT: f32 = 89.0;
pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 45.0;
/// Where [`Camera::default`] starts, three units back from the origin.
pub const DEFAULT_POSITION: Vec3 = Vec3::new(0.0, 0.0, 3.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Tunables a [`Camera`] starts out with.
///
/// Defaults look down `-Z` with `+Y` up, move three units per second, turn a quarter
/// degree per pointer unit and start with a 45 degree field of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    /// Fixed reference "up", should be unit length
    pub world_up: Vec3,
    /// Degrees, rotation about `world_up`. -90 faces `-Z`
    pub yaw: f32,
    /// Degrees, rotation about the camera's right axis
    pub pitch: f32,
    /// World units per second
    pub movement_speed: f32,
    /// Degrees per pointer unit
    pub mouse_sensitivity: f32,
    /// Vertical field of view in degrees
    pub zoom: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            world_up: Vec3::Y,
            yaw: -90.0,
            pitch: 0.0,
            movement_speed: 3.0,
            mouse_sensitivity: 0.25,
            zoom: MAX_ZOOM,
        }
    }
}

/// Free flying camera driven by yaw/pitch angles.
///
/// `front`, `right` and `up` are never written directly, they are re-derived from the
/// angles every time one of them changes so the three stay orthonormal.
#[derive(Debug, Clone)]
pub struct Camera {
    /// The world position of the camera
    position: Vec3,
    /// The direction the camera is facing
    front: Vec3,
    /// The Up Vector of the camera
    up: Vec3,
    /// The right vector of the camera
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    movement_speed: f32,
    mouse_sensitivity: f32,
    zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(DEFAULT_POSITION, CameraConfig::default())
    }
}

impl Camera {
    pub fn new(position: Vec3, config: CameraConfig) -> Self {
        let mut out = Camera {
            position,
            front: Vec3::NEG_Z,
            up: config.world_up,
            right: Vec3::X,
            world_up: config.world_up,
            yaw: config.yaw,
            pitch: config.pitch,
            movement_speed: config.movement_speed,
            mouse_sensitivity: config.mouse_sensitivity,
            zoom: config.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        };
        out.update_camera_vectors();
        out
    }

    /// Moves along `front` or `right`, scaled by the time since the previous frame.
    pub fn move_discrete(&mut self, direction: CameraMovement, elapsed_seconds: f32) {
        // max() also swallows NaN
        let velocity = self.movement_speed * elapsed_seconds.max(0.0);
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Applies a pointer delta to yaw and pitch.
    pub fn look(&mut self, x_delta: f32, y_delta: f32, constrain_pitch: bool) {
        self.yaw += x_delta * self.mouse_sensitivity;
        self.pitch += y_delta * self.mouse_sensitivity;

        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        self.update_camera_vectors();
    }

    /// Positive `delta` narrows the field of view.
    pub fn zoom_by(&mut self, delta: f32) {
        let delta = if delta.is_finite() { delta } else { 0.0 };
        self.zoom = (self.zoom - delta).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// OpenGL clip space perspective using `zoom` as the vertical field of view.
    pub fn projection_matrix(&self, aspect_ratio: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.zoom.to_radians(), aspect_ratio, near, far)
    }

    pub fn set_movement_speed(&mut self, speed: f32) {
        self.movement_speed = speed;
    }

    pub fn set_mouse_sensitivity(&mut self, sensitivity: f32) {
        self.mouse_sensitivity = sensitivity;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn movement_speed(&self) -> f32 {
        self.movement_speed
    }

    pub fn mouse_sensitivity(&self) -> f32 {
        self.mouse_sensitivity
    }

    fn update_camera_vectors(&mut self) {
        let (sin_yaw, cos_yaw) = self.yaw.to_radians().sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.to_radians().sin_cos();

        self.front = Vec3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch).normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

/// Turns absolute pointer positions into look deltas.
///
/// The first sample after creation (or [`MouseLook::reset`]) only primes the tracker so the
/// camera does not jump to wherever the cursor entered the window. Y is inverted because
/// window coordinates grow downwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct MouseLook {
    last: Option<Vec2>,
}

impl MouseLook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delta(&mut self, pos: Vec2) -> Vec2 {
        let last = self.last.replace(pos).unwrap_or(pos);
        Vec2::new(pos.x - last.x, last.y - pos.y)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
