//! 1D gradient (Perlin) noise для camera shake.
//!
//! Таблица перестановок строится из детерминированного RNG (ChaCha8),
//! поэтому при одинаковом seed тряска воспроизводится тик-в-тик.

use rand::seq::SliceRandom;
use rand::Rng;

/// 1D Perlin noise c таблицей на 256 градиентов
#[derive(Debug, Clone)]
pub struct PerlinNoise {
    perm: [u8; 256],
}

impl Default for PerlinNoise {
    fn default() -> Self {
        // Тождественная таблица; нормальная инициализация — from_rng
        Self {
            perm: core::array::from_fn(|i| i as u8),
        }
    }
}

impl PerlinNoise {
    pub fn from_rng(rng: &mut impl Rng) -> Self {
        let mut perm: [u8; 256] = core::array::from_fn(|i| i as u8);
        perm.shuffle(rng);
        Self { perm }
    }

    /// Градиент решётки в [-1, 1]
    #[inline]
    fn grad(&self, i: i32) -> f32 {
        let h = self.perm[(i & 255) as usize];
        h as f32 / 127.5 - 1.0
    }

    /// Сэмпл в точке `t`; непрерывный, ноль в узлах решётки, |v| <= 2
    pub fn sample(&self, t: f32) -> f32 {
        let floor = t.floor();
        let f = t - floor;
        let i = floor as i32;

        // Quintic fade (классическая кривая Перлина)
        let u = f * f * f * (f * (f * 6.0 - 15.0) + 10.0);

        let v0 = self.grad(i) * f;
        let v1 = self.grad(i + 1) * (f - 1.0);

        2.0 * (v0 + u * (v1 - v0))
    }
}
