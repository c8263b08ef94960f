//! Opaque embedding producers and region isolation.

mod cached;

pub use cached::*;

use crate::{common::*, processor::RawBox};

/// Embedding vector width shared by both modalities for this dataset.
pub const EMBEDDING_WIDTH: usize = 768;

/// Opaque producer of per-word text embeddings.
pub trait TextEmbedder: Debug + Send {
    /// The embedding vector width.
    fn width(&self) -> usize {
        EMBEDDING_WIDTH
    }

    /// Embed one word into a fixed-width vector.
    fn embed(&self, word: &str) -> Result<Tensor>;
}

/// Opaque producer of per-region image embeddings.
///
/// The region is always given in raw, untransformed image coordinates;
/// cropping and flipping of the canvas never affect it. Implementors that
/// feed the image to a vision model are expected to isolate the region with
/// [mask_outside_region] before encoding.
pub trait RegionEmbedder: Debug + Send {
    /// The embedding vector width.
    fn width(&self) -> usize {
        EMBEDDING_WIDTH
    }

    /// Embed the sub-image bounded by `region` of a raw CHW image.
    fn embed(&self, image: &Tensor, region: &RawBox) -> Result<Tensor>;
}

/// Suppress everything outside the region to a neutral gray fill, keeping
/// the pixels inside visible. The part of the region falling out of the
/// image bounds is ignored.
///
/// This is the building block [RegionEmbedder] implementors route the raw
/// image through, so the model only ever sees the annotated region.
pub fn mask_outside_region(image: &Tensor, region: &RawBox) -> Result<Tensor> {
    let (channels, height, width) = image.size3()?;

    let l = (region.x0.min(region.x1).floor() as i64).clamp(0, width);
    let r = (region.x0.max(region.x1).ceil() as i64).clamp(0, width);
    let t = (region.y0.min(region.y1).floor() as i64).clamp(0, height);
    let b = (region.y0.max(region.y1).ceil() as i64).clamp(0, height);

    let masked = Tensor::full(
        &[channels, height, width],
        127,
        (image.kind(), image.device()),
    );
    if l < r && t < b {
        let _ = masked.i((.., t..b, l..r)).f_copy_(&image.i((.., t..b, l..r)))?;
    }

    Ok(masked)
}
