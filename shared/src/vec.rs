//! Minimal vector math for positions, arena bounds, and colors.

/// Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    /// Value along the x-axis. Positive direction is to the right.
    pub x: f32,
    /// Value along the y-axis. Positive direction is up.
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Vec2 {
        Vec2 { x, y }
    }

    /// Returns the scaled vector.
    pub fn scale(self, scalar: f32) -> Vec2 {
        Vec2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

/// Represents a vector in 3D space; doubles as an RGB color.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Vec3 {
        Vec3 { x, y, z }
    }

    /// Returns the magnitude of the vector.
    pub fn magnitude(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Returns the normalized vector, or zero when the magnitude is zero.
    pub fn normalize(self) -> Vec3 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vec3::default()
        } else {
            Vec3::new(self.x / mag, self.y / mag, self.z / mag)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_vec2_scale() {
        let v = Vec2::new(1.5, -2.0).scale(2.0);
        assert_approx_eq!(v.x, 3.0);
        assert_approx_eq!(v.y, -4.0);
    }

    #[test]
    fn test_vec3_normalize() {
        let v = Vec3::new(3.0, 0.0, 4.0).normalize();
        assert_approx_eq!(v.magnitude(), 1.0);
        assert_approx_eq!(v.x, 0.6);
        assert_approx_eq!(v.z, 0.8);
    }

    #[test]
    fn test_vec3_normalize_zero() {
        assert_eq!(Vec3::default().normalize(), Vec3::default());
    }
}
