//! The grounded training example builder.

use super::{AnnotationSource, TrainingExample, WordRecord};
use crate::{
    common::*,
    embedding::{RegionEmbedder, TextEmbedder},
    processor::{CenterCrop, CenterCropInit, DropoutMode, PixelBox},
};

/// Constructor options of [GroundedDataset].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundedDatasetInit {
    #[serde(default = "defaults::image_size")]
    pub image_size: usize,
    /// Minimum surviving-area fraction of the canvas, inclusive.
    #[serde(default = "defaults::min_box_size")]
    pub min_box_size: R64,
    #[serde(default = "defaults::max_boxes_per_data")]
    pub max_boxes_per_data: usize,
    #[serde(default = "defaults::prob_use_caption")]
    pub prob_use_caption: R64,
    #[serde(default)]
    pub random_drop_embedding: DropoutMode,
    #[serde(default)]
    pub random_crop: bool,
    #[serde(default = "defaults::random_flip")]
    pub random_flip: bool,
    /// Optional cap on the total number of examples.
    #[serde(default)]
    pub max_images: Option<usize>,
}

impl Default for GroundedDatasetInit {
    fn default() -> Self {
        Self {
            image_size: defaults::image_size(),
            min_box_size: defaults::min_box_size(),
            max_boxes_per_data: defaults::max_boxes_per_data(),
            prob_use_caption: defaults::prob_use_caption(),
            random_drop_embedding: DropoutMode::default(),
            random_crop: false,
            random_flip: defaults::random_flip(),
            max_images: None,
        }
    }
}

impl GroundedDatasetInit {
    /// Load options from a JSON5 file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let init = json5::from_str(&text)?;
        Ok(init)
    }

    pub fn build<S, T, I>(
        self,
        source: S,
        text_embedder: T,
        region_embedder: I,
    ) -> Result<GroundedDataset<S, T, I>>
    where
        S: AnnotationSource,
        T: TextEmbedder,
        I: RegionEmbedder,
    {
        ensure!(
            self.max_boxes_per_data > 0 && self.max_boxes_per_data <= 99,
            "are you sure setting max_boxes_per_data to {}?",
            self.max_boxes_per_data
        );
        ensure!(
            (0.0..=1.0).contains(&self.min_box_size.raw()),
            "min_box_size must be within 0..=1"
        );
        ensure!(
            (0.0..=1.0).contains(&self.prob_use_caption.raw()),
            "prob_use_caption must be within 0..=1"
        );
        ensure!(
            text_embedder.width() == region_embedder.width(),
            "text embedding width {} does not match image embedding width {}",
            text_embedder.width(),
            region_embedder.width()
        );

        let transform = CenterCropInit {
            image_size: self.image_size,
            random_crop: self.random_crop,
            random_flip: self.random_flip,
        }
        .build()?;

        Ok(GroundedDataset {
            init: self,
            transform,
            source,
            text_embedder,
            region_embedder,
        })
    }
}

mod defaults {
    use super::*;

    pub fn image_size() -> usize {
        512
    }

    pub fn min_box_size() -> R64 {
        r64(0.01)
    }

    pub fn max_boxes_per_data() -> usize {
        8
    }

    pub fn prob_use_caption() -> R64 {
        r64(1.0)
    }

    pub fn random_flip() -> bool {
        true
    }
}

/// The dataset producing fixed-shape grounded training examples.
#[derive(Debug)]
pub struct GroundedDataset<S, T, I>
where
    S: AnnotationSource,
    T: TextEmbedder,
    I: RegionEmbedder,
{
    init: GroundedDatasetInit,
    transform: CenterCrop,
    source: S,
    text_embedder: T,
    region_embedder: I,
}

impl<S, T, I> GroundedDataset<S, T, I>
where
    S: AnnotationSource,
    T: TextEmbedder,
    I: RegionEmbedder,
{
    /// The number of examples, honoring the optional `max_images` cap.
    pub fn num_examples(&self) -> usize {
        let total = self.source.num_records();
        match self.init.max_images {
            Some(cap) => cmp::min(total, cap),
            None => total,
        }
    }

    /// Build the example at `index` from scratch.
    ///
    /// Construction is all-or-nothing: any image, annotation or embedder
    /// failure aborts the whole example. Discarded boxes are not failures.
    pub fn nth(&self, index: usize, rng: &mut impl Rng) -> Result<TrainingExample> {
        ensure!(index < self.num_examples(), "invalid index {}", index);
        let WordRecord {
            ref path,
            ref word_boxes,
        } = *self.source.records()[index];

        let image = vision::image::load(path)
            .with_context(|| format!("failed to load image file '{}'", path.display()))?;
        let (image_tensor, info) = self.transform.forward(&image, rng)?;

        // every raw box goes through the identical descriptor
        let mut grounded = vec![];
        for word_box in word_boxes {
            let rect = match info.remap_and_verify(
                &word_box.rect,
                self.init.image_size,
                self.init.min_box_size,
            ) {
                Some(rect) => rect,
                None => continue,
            };
            let text_embedding = self.text_embedder.embed(&word_box.text)?;
            let image_embedding = self.region_embedder.embed(&image, &word_box.rect)?;
            grounded.push(GroundedBox {
                rect,
                word: word_box.text.clone(),
                text_embedding,
                image_embedding,
            });
        }

        if grounded.is_empty() {
            warn!("no grounding box survived for image '{}'", path.display());
        }

        let slots = select_top_k(
            grounded,
            self.init.max_boxes_per_data,
            self.init.image_size,
            self.text_embedder.width(),
        )?;
        let (image_masks, text_masks) = self
            .init
            .random_drop_embedding
            .apply(&slots.masks, rng);

        let caption = if rng.gen::<f64>() < self.init.prob_use_caption.raw() {
            slots.words.join(",")
        } else {
            String::new()
        };

        Ok(TrainingExample {
            id: index,
            image: image_tensor,
            boxes: slots.boxes,
            masks: Tensor::of_slice(&slots.masks),
            image_masks: Tensor::of_slice(&image_masks),
            text_masks: Tensor::of_slice(&text_masks),
            text_embeddings: slots.text_embeddings,
            image_embeddings: slots.image_embeddings,
            caption,
        })
    }
}

/// A box surviving transform and filtering, with its word and embeddings.
#[derive(Debug)]
struct GroundedBox {
    rect: PixelBox,
    word: String,
    text_embedding: Tensor,
    image_embedding: Tensor,
}

#[derive(Debug)]
struct SelectedSlots {
    boxes: Tensor,
    masks: Vec<f32>,
    words: Vec<String>,
    text_embeddings: Tensor,
    image_embeddings: Tensor,
}

/// Keep the `k` largest boxes by canvas area, first-seen order breaking
/// ties, and pack them into fixed-shape slots with coordinates normalized
/// to `[0, 1]`.
fn select_top_k(
    grounded: Vec<GroundedBox>,
    k: usize,
    image_size: usize,
    embedding_width: usize,
) -> Result<SelectedSlots> {
    let mut order: Vec<_> = (0..grounded.len()).collect();
    order.sort_by_key(|&index| Reverse(grounded[index].rect.area()));
    order.truncate(k);

    let boxes = Tensor::zeros(&[k as i64, 4], FLOAT_CPU);
    let text_embeddings = Tensor::zeros(&[k as i64, embedding_width as i64], FLOAT_CPU);
    let image_embeddings = Tensor::zeros(&[k as i64, embedding_width as i64], FLOAT_CPU);
    let mut masks = vec![0.0f32; k];
    let mut words = Vec::with_capacity(order.len());

    let size = image_size as f64;
    for (slot, &index) in order.iter().enumerate() {
        let GroundedBox {
            ref rect,
            ref word,
            ref text_embedding,
            ref image_embedding,
        } = grounded[index];
        let normalized: Vec<f32> = [rect.x0, rect.y0, rect.x1, rect.y1]
            .iter()
            .map(|coord| (coord.raw() / size) as f32)
            .collect();

        let _ = boxes
            .i((slot as i64, ..))
            .f_copy_(&Tensor::of_slice(&normalized))?;
        let _ = text_embeddings.i((slot as i64, ..)).f_copy_(text_embedding)?;
        let _ = image_embeddings
            .i((slot as i64, ..))
            .f_copy_(image_embedding)?;
        masks[slot] = 1.0;
        words.push(word.clone());
    }

    Ok(SelectedSlots {
        boxes,
        masks,
        words,
        text_embeddings,
        image_embeddings,
    })
}
