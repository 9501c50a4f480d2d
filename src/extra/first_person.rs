//! First-person camera control over a [`Camera`].

use super::Ctx;
use crate::scene::{normalize_or_zero, Camera};
use crate::Vector3;

/// Walks the camera through the scene from the keyboard and mouse.
///
/// Movement strafes along the rows of the camera's rotation matrix scaled by
/// `camera.speed`, arrows turn at `turn_rate` radians per second, and mouse
/// motion nudges yaw and pitch directly. The camera's rotation matrix is
/// rebuilt from yaw and pitch after every update.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FirstPersonController {
    pub mouse_sensitivity: f32,
    /// Radians per second for arrow-key turning.
    pub turn_rate: f32,
    /// Increment applied by the speed-up/down keys.
    pub speed_step: f32,
    /// Pitch is clamped to this magnitude in radians.
    pub pitch_limit: f32,
}

impl Default for FirstPersonController {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 0.01,
            turn_rate: 1.0,
            speed_step: 0.1,
            pitch_limit: 1.5,
        }
    }
}

impl FirstPersonController {
    /// Applies one frame of input. `dt` is the frame time in seconds.
    pub fn update(&self, ctx: &Ctx, camera: &mut Camera, dt: f32) {
        let input = &ctx.input;
        let step = camera.speed * dt;

        let row = |i: usize| {
            Vector3::new(
                camera.rotation[(i, 0)],
                camera.rotation[(i, 1)],
                camera.rotation[(i, 2)],
            )
        };
        let forward = normalize_or_zero(-row(2));
        let right = normalize_or_zero(row(0));

        if input.forward {
            camera.position += forward * step;
        }
        if input.back {
            camera.position -= forward * step;
        }
        if input.left {
            camera.position -= right * step;
        }
        if input.right {
            camera.position += right * step;
        }
        if input.rise {
            camera.position.y += step;
        }
        if input.sink {
            camera.position.y -= step;
        }

        let turn = self.turn_rate * dt;
        if input.yaw_left {
            camera.yaw += turn;
        }
        if input.yaw_right {
            camera.yaw -= turn;
        }
        if input.pitch_up {
            camera.pitch += turn;
        }
        if input.pitch_down {
            camera.pitch -= turn;
        }

        if input.speed_up {
            camera.speed += self.speed_step;
        }
        if input.speed_down && camera.speed >= self.speed_step {
            camera.speed -= self.speed_step;
        }

        camera.yaw -= input.mouse_delta.x * self.mouse_sensitivity;
        camera.pitch -= input.mouse_delta.y * self.mouse_sensitivity;
        camera.pitch = camera.pitch.clamp(-self.pitch_limit, self.pitch_limit);

        camera.rebuild_rotation();
    }
}
