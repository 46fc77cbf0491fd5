//! Synthetic target renders used to generate training frames.

use crate::raster::{FrameGeometry, Raster};

/// Draws a target of a given size at a given horizontal position.
pub trait Renderer {
    /// Geometry of every frame this renderer produces.
    fn geometry(&self) -> FrameGeometry;

    /// Renders a target `size` pixels wide, centred on column `position`.
    fn render(&self, size: f64, position: f64) -> Raster;
}

/// Outline of the target vessel in its own coordinates: 97 units long, the
/// waterline at `y = 21`.
const OUTLINE: [(f64, f64); 19] = [
    (4.0, 21.0),
    (1.0, 15.0),
    (24.0, 15.0),
    (38.0, 0.0),
    (42.0, 6.0),
    (45.0, 5.0),
    (47.0, 6.0),
    (47.0, 10.0),
    (56.0, 7.0),
    (59.0, 10.0),
    (64.0, 6.0),
    (66.0, 10.0),
    (67.0, 8.0),
    (69.0, 9.0),
    (73.0, 14.0),
    (76.0, 14.0),
    (97.0, 16.0),
    (97.0, 19.0),
    (96.0, 21.0),
];

const OUTLINE_CENTRE: f64 = 95.0 / 2.0;
const OUTLINE_WATERLINE: f64 = 21.0;
/// A `size` of 100 draws the outline at its native scale.
const NATIVE_SIZE: f64 = 100.0;

/// Fills the target outline in white on a black frame, sitting on the
/// frame's bottom edge, as a night-time camera would see it.
#[derive(Copy, Clone, Debug)]
pub struct SilhouetteRenderer {
    geometry: FrameGeometry,
    intensity: u8,
}

impl SilhouetteRenderer {
    pub fn new(geometry: FrameGeometry) -> Self {
        SilhouetteRenderer {
            geometry,
            intensity: 255,
        }
    }

    /// The outline scaled for `size` and shifted to `position`.
    fn polygon(&self, size: f64, position: f64) -> Vec<(f64, f64)> {
        let scale = size / NATIVE_SIZE;
        let bottom = self.geometry.height as f64;
        OUTLINE
            .iter()
            .map(|&(x, y)| {
                (
                    position.round() + (x - OUTLINE_CENTRE) * scale,
                    bottom - (OUTLINE_WATERLINE - y) * scale,
                )
            })
            .collect()
    }
}

impl Renderer for SilhouetteRenderer {
    fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    fn render(&self, size: f64, position: f64) -> Raster {
        let mut frame = Raster::new(self.geometry);
        fill_polygon(&mut frame, &self.polygon(size, position), self.intensity);
        frame
    }
}

/// Even-odd scanline fill, sampling each pixel at its centre.
fn fill_polygon(frame: &mut Raster, polygon: &[(f64, f64)], value: u8) {
    let FrameGeometry { width, height } = frame.geometry();
    let mut crossings = Vec::with_capacity(polygon.len());
    for y in 0..height {
        let yc = y as f64 + 0.5;
        crossings.clear();
        for (i, &(x0, y0)) in polygon.iter().enumerate() {
            let (x1, y1) = polygon[(i + 1) % polygon.len()];
            if (y0 <= yc && yc < y1) || (y1 <= yc && yc < y0) {
                crossings.push(x0 + (yc - y0) / (y1 - y0) * (x1 - x0));
            }
        }
        crossings.sort_by(f64::total_cmp);
        for span in crossings.chunks_exact(2) {
            // Pixel x is inside when its centre x + 0.5 lies in the span.
            let first = (span[0] - 0.5).ceil().max(0.0);
            let last = (span[1] - 0.5).floor().min(width as f64 - 1.0);
            if first > last {
                continue;
            }
            for x in first as usize..=last as usize {
                frame.set(x, y, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_columns(frame: &Raster) -> Vec<usize> {
        let geometry = frame.geometry();
        (0..geometry.width)
            .filter(|&x| (0..geometry.height).any(|y| frame.get(x, y) > 0))
            .collect()
    }

    #[test]
    fn silhouette_sits_on_the_bottom_edge() {
        let geometry = FrameGeometry::default();
        let frame = SilhouetteRenderer::new(geometry).render(100.0, 100.0);
        assert!(frame.count_above(0) > 0);
        assert!((0..geometry.width).any(|x| frame.get(x, geometry.height - 1) > 0));
        // The mast tops out 21 units above the waterline.
        for y in 0..geometry.height - 22 {
            assert!((0..geometry.width).all(|x| frame.get(x, y) == 0));
        }
    }

    #[test]
    fn silhouette_is_centred_on_position() {
        let geometry = FrameGeometry::default();
        let frame = SilhouetteRenderer::new(geometry).render(60.0, 120.0);
        let columns = lit_columns(&frame);
        let first = *columns.first().unwrap() as f64;
        let last = *columns.last().unwrap() as f64;
        assert!(first >= 120.0 - 30.0 - 1.0);
        assert!(last <= 120.0 + 30.0 + 1.0);
        assert!(((first + last) / 2.0 - 120.0).abs() < 3.0);
    }

    #[test]
    fn larger_targets_light_more_pixels() {
        let renderer = SilhouetteRenderer::new(FrameGeometry::default());
        let small = renderer.render(30.0, 100.0).count_above(0);
        let large = renderer.render(150.0, 100.0).count_above(0);
        assert!(small > 0);
        assert!(large > small);
    }

    #[test]
    fn off_frame_target_is_clipped() {
        let renderer = SilhouetteRenderer::new(FrameGeometry::default());
        assert_eq!(renderer.render(50.0, -500.0).count_above(0), 0);
        let edge = renderer.render(100.0, 0.0);
        assert!(edge.count_above(0) > 0);
        assert!(lit_columns(&edge).iter().all(|&x| x <= 51));
    }
}
