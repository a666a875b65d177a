use glam::Mat4;

/// 2D vector type used throughout Jetflyer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Creates a unit vector pointing in the given direction (angle in radians).
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    /// Rotates the vector around the origin by `angle` radians.
    ///
    /// Positive angles rotate toward positive y, which is downward in the
    /// top-left-origin screen space used by the renderer.
    pub fn rotate(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::MulAssign<f32> for Vec2 {
    fn mul_assign(&mut self, rhs: f32) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

/// Orthographic projection mapping screen pixels (origin top-left, y down)
/// to clip space.
pub fn screen_projection(width: u32, height: u32) -> Mat4 {
    Mat4::orthographic_rh_gl(0.0, width as f32, height as f32, 0.0, -1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn rotate_quarter_turn_maps_x_to_y() {
        let v = Vec2::new(1.0, 0.0).rotate(std::f32::consts::FRAC_PI_2);
        assert!(approx_eq(v.x, 0.0));
        assert!(approx_eq(v.y, 1.0));
    }

    #[test]
    fn rotate_preserves_length() {
        let v = Vec2::new(3.0, -4.0);
        assert!(approx_eq(v.rotate(1.234).length(), 5.0));
    }

    #[test]
    fn from_angle_matches_rotation_of_unit_x() {
        let angle = 0.73;
        let a = Vec2::from_angle(angle);
        let b = Vec2::new(1.0, 0.0).rotate(angle);
        assert!(approx_eq(a.x, b.x));
        assert!(approx_eq(a.y, b.y));
    }

    #[test]
    fn screen_projection_maps_corners_to_clip_space() {
        let proj = screen_projection(800, 600);
        let top_left = proj * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let bottom_right = proj * glam::Vec4::new(800.0, 600.0, 0.0, 1.0);
        assert!(approx_eq(top_left.x, -1.0));
        assert!(approx_eq(top_left.y, 1.0));
        assert!(approx_eq(bottom_right.x, 1.0));
        assert!(approx_eq(bottom_right.y, -1.0));
    }
}
