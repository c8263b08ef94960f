//! The deterministic resize-and-center-crop image transform.

use crate::{common::*, processor::TransformInfo};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CenterCropInit {
    pub image_size: usize,
    pub random_crop: bool,
    pub random_flip: bool,
}

impl CenterCropInit {
    pub fn build(self) -> Result<CenterCrop> {
        let Self {
            image_size,
            random_crop,
            random_flip,
        } = self;

        ensure!(image_size > 0, "image_size must be positive");
        ensure!(!random_crop, "random crop mode is not supported");

        Ok(CenterCrop {
            image_size,
            random_flip,
        })
    }
}

/// The per-image geometric transform.
#[derive(Debug, Clone)]
pub struct CenterCrop {
    image_size: usize,
    random_flip: bool,
}

impl CenterCrop {
    /// Transform an image tensor in CHW layout with pixel values in 0-255.
    ///
    /// Returns the normalized square canvas together with the descriptor
    /// needed to remap annotation boxes consistently with the transformed
    /// pixels. The descriptor is immutable after this call.
    pub fn forward(&self, image: &Tensor, rng: &mut impl Rng) -> Result<(Tensor, TransformInfo)> {
        tch::no_grad(|| -> Result<_> {
            let (channels, orig_h, orig_w) = image.size3()?;
            ensure!(channels == 3, "expect 3 channels, but get {}", channels);
            let image_size = self.image_size as i64;

            // halve with a box filter while the shorter side is large enough,
            // to avoid aliasing from a single large downscale
            let mut scaled = image.to_kind(Kind::Float).view([1, channels, orig_h, orig_w]);
            let (mut cur_h, mut cur_w) = (orig_h, orig_w);
            while cur_h.min(cur_w) >= 2 * image_size {
                scaled = scaled.avg_pool2d(&[2, 2], &[2, 2], &[0, 0], false, true, None::<i64>);
                cur_h /= 2;
                cur_w /= 2;
            }

            // smooth resize so the shorter side equals the canvas size
            let scale = image_size as f64 / cur_h.min(cur_w) as f64;
            let new_h = (cur_h as f64 * scale).round() as i64;
            let new_w = (cur_w as f64 * scale).round() as i64;
            let resized = scaled
                .upsample_bicubic2d(&[new_h, new_w], false, None::<f64>, None::<f64>)
                .view([channels, new_h, new_w]);

            let crop_y = (new_h - image_size) / 2;
            let crop_x = (new_w - image_size) / 2;
            let cropped = resized.i((
                ..,
                crop_y..crop_y + image_size,
                crop_x..crop_x + image_size,
            ));

            let performed_flip = self.random_flip && rng.gen::<f64>() < 0.5;
            let cropped = if performed_flip {
                cropped.flip(&[2])
            } else {
                cropped
            };

            let output = cropped / 127.5 - 1.0;

            // the recorded scale is relative to the true original size, since
            // box annotations are expressed in original-image units
            let info = TransformInfo {
                performed_scale: r64(image_size as f64 / cmp::min(orig_h, orig_w) as f64),
                crop_x,
                crop_y,
                orig_h,
                orig_w,
                performed_flip,
            };

            Ok((output, info))
        })
    }
}
