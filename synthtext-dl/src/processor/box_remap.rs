//! Remapping of raw annotation boxes into the transformed canvas.

use crate::common::*;

/// Axis-aligned box given as two corner points in original-image pixel
/// coordinates. The corners are not guaranteed to be in min/max order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct RawBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl From<[f64; 4]> for RawBox {
    fn from([x0, y0, x1, y1]: [f64; 4]) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

impl From<RawBox> for [f64; 4] {
    fn from(RawBox { x0, y0, x1, y1 }: RawBox) -> Self {
        [x0, y0, x1, y1]
    }
}

/// A surviving box in canvas pixel units, clamped into `[0, image_size]`
/// and flip-adjusted, satisfying `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelBox {
    pub x0: R64,
    pub y0: R64,
    pub x1: R64,
    pub y1: R64,
}

impl PixelBox {
    /// Pixel area in canvas space.
    pub fn area(&self) -> R64 {
        (self.x1 - self.x0) * (self.y1 - self.y0)
    }

    /// Mirror along the vertical axis of a canvas of the given size.
    pub fn flip_horizontal(&self, image_size: usize) -> Self {
        let size = r64(image_size as f64);
        Self {
            x0: size - self.x1,
            y0: self.y0,
            x1: size - self.x0,
            y1: self.y1,
        }
    }
}

/// What resizing, cropping and flipping have been applied to the raw image.
///
/// The descriptor is fixed once per image. Every raw box of that image must
/// be remapped through the identical descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformInfo {
    /// Net scale from the true original size to the pre-crop image.
    pub performed_scale: R64,
    pub crop_x: i64,
    pub crop_y: i64,
    pub orig_h: i64,
    pub orig_w: i64,
    pub performed_flip: bool,
}

impl TransformInfo {
    /// Remap a raw annotation box into canvas coordinates and decide whether
    /// it survives. A discarded box is a normal outcome, not an error.
    ///
    /// The flip adjustment is applied strictly after clamping.
    pub fn remap_and_verify(
        &self,
        raw: &RawBox,
        image_size: usize,
        min_box_size: R64,
    ) -> Option<PixelBox> {
        let scale = self.performed_scale.raw();
        let x0 = raw.x0 * scale - self.crop_x as f64;
        let y0 = raw.y0 * scale - self.crop_y as f64;
        let x1 = raw.x1 * scale - self.crop_x as f64;
        let y1 = raw.y1 * scale - self.crop_y as f64;

        let rect = to_valid(x0, y0, x1, y1, image_size, min_box_size)?;

        if self.performed_flip {
            Some(rect.flip_horizontal(image_size))
        } else {
            Some(rect)
        }
    }
}

/// Clamp a transformed box into `[0, image_size]` and keep it only if enough
/// area remains. A box falling completely outside the canvas is rejected
/// before any area is computed.
///
/// The area threshold is inclusive: a fraction equal to `min_box_size` is
/// accepted.
fn to_valid(
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    image_size: usize,
    min_box_size: R64,
) -> Option<PixelBox> {
    let size = image_size as f64;

    if x0 > size || y0 > size || x1 < 0.0 || y1 < 0.0 {
        return None;
    }

    let x0 = x0.max(0.0);
    let y0 = y0.max(0.0);
    let x1 = x1.min(size);
    let y1 = y1.min(size);

    if (x1 - x0) * (y1 - y0) / (size * size) < min_box_size.raw() {
        return None;
    }

    Some(PixelBox {
        x0: r64(x0),
        y0: r64(y0),
        x1: r64(x1),
        y1: r64(y1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn identity_info() -> TransformInfo {
        TransformInfo {
            performed_scale: r64(1.0),
            crop_x: 0,
            crop_y: 0,
            orig_h: 512,
            orig_w: 512,
            performed_flip: false,
        }
    }

    #[test]
    fn uncropped_box_survives() {
        let raw = RawBox::from([100.0, 100.0, 300.0, 400.0]);
        let rect = identity_info()
            .remap_and_verify(&raw, 512, r64(0.01))
            .unwrap();

        assert_eq!(
            rect,
            PixelBox {
                x0: r64(100.0),
                y0: r64(100.0),
                x1: r64(300.0),
                y1: r64(400.0),
            }
        );
        assert_abs_diff_eq!(rect.area().raw(), 60000.0);
    }

    #[test]
    fn straddling_box_is_clamped_not_discarded() {
        let info = TransformInfo {
            crop_x: 150,
            crop_y: 150,
            ..identity_info()
        };
        let raw = RawBox::from([100.0, 100.0, 300.0, 400.0]);
        let rect = info.remap_and_verify(&raw, 512, r64(0.01)).unwrap();

        assert_eq!(
            rect,
            PixelBox {
                x0: r64(0.0),
                y0: r64(0.0),
                x1: r64(150.0),
                y1: r64(250.0),
            }
        );
        assert_abs_diff_eq!(rect.area().raw(), 37500.0);
    }

    #[test]
    fn fully_outside_box_is_rejected_without_clamping() {
        let raw = RawBox::from([-200.0, 100.0, -10.0, 400.0]);
        assert_eq!(identity_info().remap_and_verify(&raw, 512, r64(0.01)), None);
    }

    #[test]
    fn clamping_is_idempotent() {
        let first = to_valid(-50.0, -50.0, 150.0, 250.0, 512, r64(0.01)).unwrap();
        let second = to_valid(
            first.x0.raw(),
            first.y0.raw(),
            first.x1.raw(),
            first.y1.raw(),
            512,
            r64(0.01),
        )
        .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn flip_is_an_involution() {
        let rect = PixelBox {
            x0: r64(30.0),
            y0: r64(40.0),
            x1: r64(200.0),
            y1: r64(220.0),
        };
        assert_eq!(rect.flip_horizontal(512).flip_horizontal(512), rect);
    }

    #[test]
    fn flip_applies_after_clamping() {
        let info = TransformInfo {
            performed_flip: true,
            ..identity_info()
        };
        let raw = RawBox::from([-50.0, 0.0, 100.0, 100.0]);
        let rect = info.remap_and_verify(&raw, 512, r64(0.01)).unwrap();

        // clamped to (0, 0, 100, 100), then mirrored
        assert_eq!(
            rect,
            PixelBox {
                x0: r64(412.0),
                y0: r64(0.0),
                x1: r64(512.0),
                y1: r64(100.0),
            }
        );
    }

    #[test]
    fn area_threshold_is_inclusive() {
        // 50x50 of a 100x100 canvas is exactly a 0.25 fraction
        assert!(to_valid(0.0, 0.0, 50.0, 50.0, 100, r64(0.25)).is_some());
        assert!(to_valid(0.0, 0.0, 50.0, 50.0, 100, r64(0.2500001)).is_none());
    }
}
