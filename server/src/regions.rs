//! Region partitioning of the thresholded noise field
//!
//! Cells whose normalized noise is below the threshold form the active mask.
//! Active cells are grouped into 4-connected components, and each component
//! gets one [`RegionStyle`] drawn uniformly. Inactive cells belong to no
//! region and read back as [`RegionStyle::Normal`].

use crate::noise_field::NoiseField;
use log::debug;
use rand::Rng;
use std::collections::VecDeque;

pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Wall-density policy applied to every cell of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionStyle {
    Normal,
    Dense,
    Wide,
    Long,
    Open,
    ExtraWide,
}

impl RegionStyle {
    pub const ALL: [RegionStyle; 6] = [
        RegionStyle::Normal,
        RegionStyle::Dense,
        RegionStyle::Wide,
        RegionStyle::Long,
        RegionStyle::Open,
        RegionStyle::ExtraWide,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Per-cell region labels plus the style of each labelled region.
#[derive(Debug, Clone)]
pub struct RegionMap {
    width: usize,
    height: usize,
    labels: Vec<Option<u32>>,
    styles: Vec<RegionStyle>,
}

impl RegionMap {
    /// Labels the connected components of `field < threshold`.
    pub fn partition<R: Rng + ?Sized>(field: &NoiseField, threshold: f64, rng: &mut R) -> Self {
        let width = field.width();
        let height = field.height();
        let active: Vec<bool> = field.values().iter().map(|v| *v < threshold).collect();

        let mut labels: Vec<Option<u32>> = vec![None; width * height];
        let mut styles = Vec::new();
        let mut queue = VecDeque::new();

        for start in 0..active.len() {
            if !active[start] || labels[start].is_some() {
                continue;
            }

            let label = styles.len() as u32;
            styles.push(RegionStyle::random(rng));
            labels[start] = Some(label);
            queue.push_back(start);

            while let Some(index) = queue.pop_front() {
                let x = index % width;
                let y = index / width;

                for neighbor in neighbors(x, y, width, height) {
                    if active[neighbor] && labels[neighbor].is_none() {
                        labels[neighbor] = Some(label);
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        debug!(
            "Partitioned {}x{} field into {} regions at threshold {}",
            width,
            height,
            styles.len(),
            threshold
        );

        Self {
            width,
            height,
            labels,
            styles,
        }
    }

    /// One region covering every cell.
    pub fn uniform(width: usize, height: usize, style: RegionStyle) -> Self {
        let labels = if width * height == 0 {
            Vec::new()
        } else {
            vec![Some(0); width * height]
        };

        Self {
            width,
            height,
            labels,
            styles: vec![style],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn region_count(&self) -> usize {
        self.styles.len()
    }

    pub fn label_at(&self, x: usize, y: usize) -> Option<u32> {
        self.labels[y * self.width + x]
    }

    pub fn region_style(&self, label: u32) -> Option<RegionStyle> {
        self.styles.get(label as usize).copied()
    }

    /// Style governing `(x, y)`; unlabelled cells are `Normal`.
    pub fn style_at(&self, x: usize, y: usize) -> RegionStyle {
        self.label_at(x, y)
            .and_then(|label| self.region_style(label))
            .unwrap_or(RegionStyle::Normal)
    }
}

fn neighbors(x: usize, y: usize, width: usize, height: usize) -> impl Iterator<Item = usize> {
    let up = (y > 0).then(|| (y - 1) * width + x);
    let down = (y + 1 < height).then(|| (y + 1) * width + x);
    let left = (x > 0).then(|| y * width + x - 1);
    let right = (x + 1 < width).then(|| y * width + x + 1);
    [up, down, left, right].into_iter().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise_field::NoiseParams;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn partitioned(seed: u32) -> (NoiseField, RegionMap) {
        let params = NoiseParams {
            seed,
            ..NoiseParams::default()
        };
        let field = NoiseField::generate(60, 40, &params).unwrap();
        let mut rng = StdRng::seed_from_u64(seed as u64);
        let regions = RegionMap::partition(&field, DEFAULT_THRESHOLD, &mut rng);
        (field, regions)
    }

    #[test]
    fn test_every_active_cell_is_labelled() {
        let (field, regions) = partitioned(7);

        for y in 0..field.height() {
            for x in 0..field.width() {
                let active = field.sample(x, y) < DEFAULT_THRESHOLD;
                assert_eq!(
                    regions.label_at(x, y).is_some(),
                    active,
                    "cell ({}, {}) labelling does not match the mask",
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn test_adjacent_active_cells_share_label() {
        let (field, regions) = partitioned(11);

        for y in 0..field.height() {
            for x in 0..field.width() {
                let Some(label) = regions.label_at(x, y) else {
                    continue;
                };
                if x + 1 < field.width() {
                    if let Some(right) = regions.label_at(x + 1, y) {
                        assert_eq!(label, right);
                    }
                }
                if y + 1 < field.height() {
                    if let Some(below) = regions.label_at(x, y + 1) {
                        assert_eq!(label, below);
                    }
                }
            }
        }
    }

    #[test]
    fn test_labels_are_dense_and_styled() {
        let (_, regions) = partitioned(3);
        assert!(regions.region_count() > 0);

        let mut seen = HashSet::new();
        for y in 0..regions.height() {
            for x in 0..regions.width() {
                if let Some(label) = regions.label_at(x, y) {
                    seen.insert(label);
                    assert!(regions.region_style(label).is_some());
                }
            }
        }
        assert_eq!(seen.len(), regions.region_count());
    }

    #[test]
    fn test_diagonal_cells_are_separate_regions() {
        // Checkerboard mask: no two active cells share an edge
        let mut values = Vec::new();
        for y in 0..4 {
            for x in 0..4 {
                values.push(if (x + y) % 2 == 0 { 0.0 } else { 1.0 });
            }
        }
        let field = NoiseField::from_values(4, 4, values);
        let mut rng = StdRng::seed_from_u64(0);
        let regions = RegionMap::partition(&field, DEFAULT_THRESHOLD, &mut rng);

        assert_eq!(regions.region_count(), 8);
        assert_ne!(regions.label_at(0, 0), regions.label_at(1, 1));
        assert_eq!(regions.label_at(1, 0), None);
        assert_eq!(regions.style_at(1, 0), RegionStyle::Normal);
    }

    #[test]
    fn test_uniform_map() {
        let regions = RegionMap::uniform(5, 3, RegionStyle::Open);
        assert_eq!(regions.region_count(), 1);
        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(regions.label_at(x, y), Some(0));
                assert_eq!(regions.style_at(x, y), RegionStyle::Open);
            }
        }
    }

    #[test]
    fn test_random_style_covers_enumeration() {
        let mut rng = StdRng::seed_from_u64(99);
        let drawn: HashSet<RegionStyle> = (0..500).map(|_| RegionStyle::random(&mut rng)).collect();
        assert_eq!(drawn.len(), RegionStyle::ALL.len());
    }
}
