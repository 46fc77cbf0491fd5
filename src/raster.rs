//! Single-channel camera frames and their conversion to network input.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Width and height of every frame the network sees.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: usize,
    pub height: usize,
}

impl FrameGeometry {
    pub fn new(width: usize, height: usize) -> Self {
        FrameGeometry { width, height }
    }

    /// Number of pixels, which is also the length of a feature vector.
    pub fn pixels(&self) -> usize {
        self.width * self.height
    }
}

impl Default for FrameGeometry {
    /// The drone camera: 200 x 80.
    fn default() -> Self {
        FrameGeometry::new(200, 80)
    }
}

/// A single-channel 8-bit frame, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    geometry: FrameGeometry,
    pixels: Vec<u8>,
}

impl Raster {
    /// Creates an all-black frame.
    pub fn new(geometry: FrameGeometry) -> Self {
        Raster {
            geometry,
            pixels: vec![0; geometry.pixels()],
        }
    }

    pub fn from_pixels(geometry: FrameGeometry, pixels: Vec<u8>) -> Result<Self> {
        Error::check_len(geometry.pixels(), pixels.len())?;
        Ok(Raster { geometry, pixels })
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.geometry.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.pixels[y * self.geometry.width + x] = value;
    }

    /// Number of pixels brighter than `threshold`.
    pub fn count_above(&self, threshold: u8) -> usize {
        self.pixels.iter().filter(|&&p| p > threshold).count()
    }
}

/// Turns a frame into the vector the network consumes.
pub trait Featurizer {
    fn featurize(&self, frame: &Raster) -> Result<Vec<f64>>;
}

/// Binary featurizer: every pixel brighter than `threshold` becomes `1.0`,
/// everything else `0.0`, in row-major order.
///
/// With `edges_only` set, the frame first goes through a Roberts cross edge
/// filter, so only outlines survive. All intermediate buffers live for one
/// call, so a featurizer can be shared freely.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ThresholdFeaturizer {
    geometry: FrameGeometry,
    threshold: u8,
    edges_only: bool,
}

impl ThresholdFeaturizer {
    /// A featurizer for frames of `geometry` that treats any non-black
    /// pixel as on.
    pub fn new(geometry: FrameGeometry) -> Self {
        ThresholdFeaturizer {
            geometry,
            threshold: 0,
            edges_only: false,
        }
    }

    pub fn threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn edges_only(mut self, edges_only: bool) -> Self {
        self.edges_only = edges_only;
        self
    }
}

impl Featurizer for ThresholdFeaturizer {
    fn featurize(&self, frame: &Raster) -> Result<Vec<f64>> {
        if frame.geometry() != self.geometry {
            return Err(Error::ShapeMismatch {
                expected: self.geometry.pixels(),
                got: frame.geometry().pixels(),
            });
        }
        let on = |p: &u8| if *p > self.threshold { 1.0 } else { 0.0 };
        if self.edges_only {
            Ok(roberts_cross(frame).iter().map(on).collect())
        } else {
            Ok(frame.pixels().iter().map(on).collect())
        }
    }
}

/// Applies the Roberts cross operator: each interior pixel becomes the
/// magnitude of its two diagonal differences, clamped to 255. The one pixel
/// border is copied unchanged.
pub fn roberts_cross(frame: &Raster) -> Vec<u8> {
    let FrameGeometry { width, height } = frame.geometry();
    let src = frame.pixels();
    let mut dst = src.to_vec();
    if width < 3 || height < 3 {
        return dst;
    }
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let centre = f64::from(src[y * width + x]);
            let down_right = f64::from(src[(y + 1) * width + x + 1]);
            let down_left = f64::from(src[(y + 1) * width + x - 1]);
            let g1 = centre - down_right;
            let g2 = centre - down_left;
            dst[y * width + x] = (g1 * g1 + g2 * g2).sqrt().clamp(0.0, 255.0) as u8;
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(geometry: FrameGeometry) -> Raster {
        let mut frame = Raster::new(geometry);
        for y in 2..6 {
            for x in 2..6 {
                frame.set(x, y, 255);
            }
        }
        frame
    }

    #[test]
    fn binary_row_major_features() {
        let geometry = FrameGeometry::new(3, 2);
        let frame = Raster::from_pixels(geometry, vec![0, 9, 0, 200, 0, 1]).unwrap();
        let features = ThresholdFeaturizer::new(geometry).featurize(&frame).unwrap();
        assert_eq!(features, [0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);

        let features = ThresholdFeaturizer::new(geometry)
            .threshold(100)
            .featurize(&frame)
            .unwrap();
        assert_eq!(features, [0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn black_frame_has_no_features() {
        let geometry = FrameGeometry::new(10, 4);
        let features = ThresholdFeaturizer::new(geometry)
            .edges_only(true)
            .featurize(&Raster::new(geometry))
            .unwrap();
        assert_eq!(features.len(), 40);
        assert!(features.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn wrong_geometry_is_rejected() {
        let featurizer = ThresholdFeaturizer::new(FrameGeometry::new(4, 4));
        assert!(matches!(
            featurizer.featurize(&Raster::new(FrameGeometry::new(4, 3))),
            Err(Error::ShapeMismatch { expected: 16, got: 12 })
        ));
        assert!(Raster::from_pixels(FrameGeometry::new(2, 2), vec![0; 3]).is_err());
    }

    #[test]
    fn edges_keep_only_outlines() {
        let geometry = FrameGeometry::new(8, 8);
        let frame = square(geometry);
        let edges = roberts_cross(&frame);
        // Interior of the square has no gradient.
        assert_eq!(edges[3 * 8 + 3], 0);
        // The bottom-right corner differs from its lower neighbours.
        assert_eq!(edges[5 * 8 + 5], 255);

        let plain = ThresholdFeaturizer::new(geometry).featurize(&frame).unwrap();
        let outline = ThresholdFeaturizer::new(geometry)
            .edges_only(true)
            .featurize(&frame)
            .unwrap();
        let on = |v: &[f64]| v.iter().filter(|&&f| f > 0.0).count();
        assert_eq!(on(&plain), 16);
        assert_eq!(outline[3 * 8 + 3], 0.0);
        assert!(on(&outline) > 0);
    }
}
