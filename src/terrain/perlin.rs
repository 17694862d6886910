//! Seeded 3D gradient noise with fractal layering
//!
//! Classic improved Perlin noise over a seeded permutation, summed over
//! octaves. Used to synthesize terrain fields for tests and demos.

use glam::Vec3;

/// Octave settings for fractal noise
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerlinConfig {
    /// Frequency of the first octave (lower = larger features)
    pub base_frequency: f32,
    pub octaves: usize,
    /// Amplitude kept from one octave to the next
    pub persistence: f32,
    /// Frequency gained from one octave to the next
    pub lacunarity: f32,
}

impl Default for PerlinConfig {
    fn default() -> Self {
        Self {
            base_frequency: 1.6,
            octaves: 5,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

// Ken Perlin's reference permutation; the seed is folded into the lookups
const PERM: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209, 76,
    132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173,
    186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212, 207, 206,
    59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44, 154, 163,
    70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232,
    178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162,
    241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157, 184, 84, 204,
    176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29, 24, 72, 243, 141,
    128, 195, 78, 66, 215, 61, 156, 180,
];

/// One seeded fractal noise field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractalNoise {
    key: [u8; 3],
    config: PerlinConfig,
}

impl FractalNoise {
    pub fn new(seed: u32, config: PerlinConfig) -> Self {
        let mixed = seed.wrapping_mul(0x9E37_79B9).rotate_left(13) ^ seed;
        let bytes = mixed.to_le_bytes();
        Self {
            key: [bytes[0], bytes[1] ^ bytes[3], bytes[2]],
            config,
        }
    }

    /// Fractal noise normalized to `[0, 1]`
    pub fn sample(&self, position: Vec3) -> f32 {
        (self.sample_signed(position) + 1.0) * 0.5
    }

    /// Fractal noise in roughly `[-1, 1]`
    pub fn sample_signed(&self, position: Vec3) -> f32 {
        let mut total = 0.0;
        let mut norm = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.config.base_frequency;
        for _ in 0..self.config.octaves.max(1) {
            total += self.gradient_noise(position * frequency) * amplitude;
            norm += amplitude;
            amplitude *= self.config.persistence;
            frequency *= self.config.lacunarity;
        }
        (total / norm).clamp(-1.0, 1.0)
    }

    #[inline]
    fn corner_hash(&self, x: i32, y: i32, z: i32) -> u8 {
        let a = PERM[((x as u8) ^ self.key[0]) as usize];
        let b = PERM[(a.wrapping_add((y as u8) ^ self.key[1])) as usize];
        PERM[(b.wrapping_add((z as u8) ^ self.key[2])) as usize]
    }

    /// Single-octave improved Perlin noise in `[-1, 1]`
    fn gradient_noise(&self, p: Vec3) -> f32 {
        let cell = p.floor();
        let (x, y, z) = (cell.x as i32, cell.y as i32, cell.z as i32);
        let f = p - cell;
        let (u, v, w) = (fade(f.x), fade(f.y), fade(f.z));

        let corner = |dx: i32, dy: i32, dz: i32| {
            let h = self.corner_hash(x + dx, y + dy, z + dz);
            grad(h, f.x - dx as f32, f.y - dy as f32, f.z - dz as f32)
        };

        let near = lerp(
            lerp(corner(0, 0, 0), corner(1, 0, 0), u),
            lerp(corner(0, 1, 0), corner(1, 1, 0), u),
            v,
        );
        let far = lerp(
            lerp(corner(0, 0, 1), corner(1, 0, 1), u),
            lerp(corner(0, 1, 1), corner(1, 1, 1), u),
            v,
        );
        lerp(near, far, w)
    }
}

/// Dot product with one of the 12 cube-edge gradients
#[inline]
fn grad(hash: u8, x: f32, y: f32, z: f32) -> f32 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = match h {
        0..=3 => y,
        12 | 14 => x,
        _ => z,
    };
    let u = if h & 1 == 0 { u } else { -u };
    let v = if h & 2 == 0 { v } else { -v };
    u + v
}

/// 6t^5 - 15t^4 + 10t^3
#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_field() {
        let a = FractalNoise::new(42, PerlinConfig::default());
        let b = FractalNoise::new(42, PerlinConfig::default());
        let p = Vec3::new(0.5, 0.7, 0.3);
        assert_eq!(a.sample(p), b.sample(p));
    }

    #[test]
    fn test_output_ranges() {
        let noise = FractalNoise::new(12345, PerlinConfig::default());
        for i in 0..200 {
            let t = i as f32 * 0.37;
            let p = Vec3::new(t.sin() * 3.0, t * 0.1, t.cos() * 3.0);
            let unit = noise.sample(p);
            let signed = noise.sample_signed(p);
            assert!((0.0..=1.0).contains(&unit), "{} at {:?}", unit, p);
            assert!((-1.0..=1.0).contains(&signed));
        }
    }

    #[test]
    fn test_seeds_differ() {
        let a = FractalNoise::new(42, PerlinConfig::default());
        let b = FractalNoise::new(999, PerlinConfig::default());
        let differs = (0..16).any(|i| {
            let p = Vec3::new(i as f32 * 0.31, 0.45, i as f32 * 0.17);
            a.sample(p) != b.sample(p)
        });
        assert!(differs);
    }

    #[test]
    fn test_lattice_points_are_zero() {
        let noise = FractalNoise::new(7, PerlinConfig::default());
        // Gradient noise vanishes on integer lattice points
        assert_eq!(noise.gradient_noise(Vec3::new(3.0, -2.0, 5.0)), 0.0);
    }
}
