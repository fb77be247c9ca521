//! Camera, projection and damped orbit controls.
//!
//! The camera always looks at a target point. [`OrbitController`] collects
//! mouse input as pending spherical motion and bleeds a fixed fraction of it
//! into the camera on every frame, which gives the drifting, inertial feel of
//! orbit controls with damping.

use std::f32::consts::{PI, TAU};

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector2, Vector3};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle away from the poles so `look_at` stays defined.
const POLAR_EPSILON: f32 = 1e-4;

/// Pixels per wheel "line" for touchpads that report pixel deltas.
const PIXELS_PER_LINE: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P) -> Self {
        Self {
            position: position.into(),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    /// World-space ray through a point given in normalised device coordinates
    /// (`x` right, `y` up, both in `-1..=1`).
    pub fn ray_from_ndc(&self, ndc: Vector2<f32>, projection: &Projection) -> Ray {
        let half_height = (projection.fovy.0 / 2.0).tan();
        let view_dir = Vector3::new(
            ndc.x * half_height * projection.aspect,
            ndc.y * half_height,
            -1.0,
        );
        let camera_to_world = self
            .view_matrix()
            .invert()
            .unwrap_or_else(Matrix4::identity);
        let direction = (camera_to_world * view_dir.extend(0.0)).truncate().normalize();
        Ray {
            origin: self.position,
            direction,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Camera block shared by every pipeline (bind group 0).
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 4],
    pub viewport: [f32; 2],
    // Uniforms require 16 byte spacing
    _padding: [f32; 2],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view: Matrix4::identity().into(),
            proj: Matrix4::identity().into(),
            view_proj: Matrix4::identity().into(),
            position: [0.0; 4],
            viewport: [1.0, 1.0],
            _padding: [0.0; 2],
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        let view = camera.view_matrix();
        let proj = projection.calc_matrix();
        self.view = view.into();
        self.proj = proj.into();
        self.view_proj = (proj * view).into();
        self.position = camera.position.to_homogeneous().into();
    }

    pub fn update_viewport(&mut self, width: u32, height: u32) {
        self.viewport = [width.max(1) as f32, height.max(1) as f32];
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drag {
    Rotate,
    Pan,
}

/// Damped orbit controls: left drag rotates, right drag pans and the wheel
/// zooms. Input only accumulates pending motion; [`update`](Self::update)
/// moves the camera.
#[derive(Clone, Debug)]
pub struct OrbitController {
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    fovy: Rad<f32>,
    viewport_height: f32,
    theta_delta: f32,
    phi_delta: f32,
    scale: f32,
    pan_delta: Vector2<f32>,
    pan_offset: Vector3<f32>,
    drag: Option<Drag>,
    cursor: Option<PhysicalPosition<f64>>,
}

impl OrbitController {
    pub fn new(config: &CameraConfig, viewport_height: u32) -> Self {
        Self {
            damping: config.damping.clamp(0.0, 1.0),
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            fovy: config.fov_y.into(),
            viewport_height: viewport_height.max(1) as f32,
            theta_delta: 0.0,
            phi_delta: 0.0,
            scale: 1.0,
            pan_delta: Vector2::new(0.0, 0.0),
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            drag: None,
            cursor: None,
        }
    }

    pub fn resize(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Feeds a window event into the controller. Returns `true` when the event
    /// changed pending camera motion.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (state, button) {
                    (ElementState::Pressed, MouseButton::Left) => Some(Drag::Rotate),
                    (ElementState::Pressed, MouseButton::Right) => Some(Drag::Pan),
                    (ElementState::Released, _) => None,
                    _ => self.drag,
                };
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.cursor.replace(*position);
                match (self.drag, previous) {
                    (Some(drag), Some(previous)) => {
                        let dx = (position.x - previous.x) as f32;
                        let dy = (position.y - previous.y) as f32;
                        match drag {
                            Drag::Rotate => self.rotate(dx, dy),
                            Drag::Pan => self.pan(dx, dy),
                        }
                        true
                    }
                    _ => false,
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => (pos.y / PIXELS_PER_LINE) as f32,
                };
                self.zoom(lines);
                lines != 0.0
            }
            WindowEvent::Resized(size) => {
                self.resize(size.height);
                false
            }
            _ => false,
        }
    }

    /// Queues rotation for a drag of `dx`/`dy` pixels. A drag across the full
    /// viewport height turns the camera by a full circle.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.theta_delta -= TAU * dx / self.viewport_height * self.rotate_speed;
        self.phi_delta -= TAU * dy / self.viewport_height * self.rotate_speed;
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pan_delta += Vector2::new(dx, dy) * self.pan_speed;
    }

    /// Positive `lines` (wheel away from the user) move the camera closer.
    pub fn zoom(&mut self, lines: f32) {
        if lines != 0.0 {
            self.scale *= 0.95f32.powf(self.zoom_speed * lines);
        }
    }

    /// Whether any motion is still pending.
    pub fn is_moving(&self) -> bool {
        const REST: f32 = 1e-6;
        self.theta_delta.abs() > REST
            || self.phi_delta.abs() > REST
            || self.pan_offset.magnitude2() > REST * REST
            || self.pan_delta.magnitude2() > 0.0
            || self.scale != 1.0
    }

    /// Applies one frame of damped motion to `camera`.
    pub fn update(&mut self, camera: &mut Camera) {
        let offset = camera.position - camera.target;
        let mut radius = offset.magnitude();
        if radius <= f32::EPSILON {
            return;
        }
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        self.pan_offset += self.pan_to_world(camera, radius);
        self.pan_delta = Vector2::new(0.0, 0.0);

        theta += self.theta_delta * self.damping;
        phi += self.phi_delta * self.damping;
        phi = phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
        self.scale = 1.0;

        camera.target += self.pan_offset * self.damping;
        let offset = Vector3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        camera.position = camera.target + offset;

        let keep = 1.0 - self.damping;
        self.theta_delta *= keep;
        self.phi_delta *= keep;
        self.pan_offset *= keep;
    }

    /// Converts queued pan pixels into a world-space target offset in the
    /// camera's screen plane, so the point under the cursor follows the drag.
    fn pan_to_world(&self, camera: &Camera, distance: f32) -> Vector3<f32> {
        if self.pan_delta.magnitude2() == 0.0 {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        let target_distance = distance * (self.fovy.0 / 2.0).tan();
        let left = 2.0 * self.pan_delta.x * target_distance / self.viewport_height;
        let up = 2.0 * self.pan_delta.y * target_distance / self.viewport_height;
        let forward = (camera.target - camera.position).normalize();
        let right = forward.cross(camera.up).normalize();
        let screen_up = right.cross(forward);
        -right * left + screen_up * up
    }
}

/// The camera together with its GPU-side uniform.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}
