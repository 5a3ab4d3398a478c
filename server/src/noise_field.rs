//! Coherent noise sampled over the whole maze grid
//!
//! Raw values come from layered Perlin octaves. Normalization to `[0, 1]`
//! needs the global minimum and maximum, so the field is produced in one
//! batch over every cell and is only readable once that pass completes.

use crate::generation::GenerationError;
use noise::{NoiseFn, Perlin};

/// Fractal noise parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseParams {
    /// Cells per unit of noise space at the first octave.
    pub scale: f64,
    pub octaves: u32,
    /// Amplitude multiplier applied per octave.
    pub persistence: f64,
    /// Frequency multiplier applied per octave.
    pub lacunarity: f64,
    pub seed: u32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            scale: 10.0,
            octaves: 2,
            persistence: 0.5,
            lacunarity: 2.0,
            seed: 0,
        }
    }
}

impl NoiseParams {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(GenerationError::InvalidNoise(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if self.octaves == 0 {
            return Err(GenerationError::InvalidNoise(
                "at least one octave is required".to_string(),
            ));
        }
        if !self.persistence.is_finite() || !self.lacunarity.is_finite() {
            return Err(GenerationError::InvalidNoise(
                "persistence and lacunarity must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Normalized scalar field, one value per maze cell, row-major.
#[derive(Debug, Clone)]
pub struct NoiseField {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl NoiseField {
    pub fn generate(
        width: usize,
        height: usize,
        params: &NoiseParams,
    ) -> Result<Self, GenerationError> {
        params.validate()?;

        let perlin = Perlin::new(params.seed);
        let mut values = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                values.push(fractal_sample(&perlin, x as f64, y as f64, params));
            }
        }

        normalize(&mut values);
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Wraps precomputed, already normalized values.
    #[cfg(test)]
    pub(crate) fn from_values(width: usize, height: usize, values: Vec<f64>) -> Self {
        assert_eq!(values.len(), width * height);
        Self {
            width,
            height,
            values,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Normalized value at `(x, y)`, always in `[0, 1]`.
    pub fn sample(&self, x: usize, y: usize) -> f64 {
        self.values[y * self.width + x]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

fn fractal_sample(perlin: &Perlin, x: f64, y: f64, params: &NoiseParams) -> f64 {
    let mut value = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    for _ in 0..params.octaves {
        let nx = x / params.scale * frequency;
        let ny = y / params.scale * frequency;
        value += perlin.get([nx, ny]) * amplitude;
        amplitude *= params.persistence;
        frequency *= params.lacunarity;
    }
    value
}

/// Min-max rescales in place. A constant field maps to 0.5 everywhere.
fn normalize(values: &mut [f64]) {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });

    let range = max - min;
    if range.is_nan() || range <= f64::EPSILON {
        values.iter_mut().for_each(|v| *v = 0.5);
        return;
    }

    for v in values.iter_mut() {
        *v = ((*v - min) / range).clamp(0.0, 1.0);
    }
}
