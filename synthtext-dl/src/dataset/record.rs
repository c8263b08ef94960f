use crate::{common::*, processor::RawBox};

/// One annotated word together with its raw corner box, kept in a single
/// record so the word, box and embeddings can never fall out of alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct WordBox {
    pub text: String,
    /// Corner box in original-image pixel coordinates.
    pub rect: RawBox,
}

/// The per-image annotation record, without image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct WordRecord {
    pub path: PathBuf,
    pub word_boxes: Vec<WordBox>,
}

/// The packaged training example.
///
/// Built fresh per request and owned by the caller. Every tensor has a
/// fixed shape independent of the number of surviving boxes.
#[derive(Debug)]
pub struct TrainingExample {
    pub id: usize,
    /// Normalized canvas in CHW layout, values in `[-1, 1]`.
    pub image: Tensor,
    /// `[max_boxes, 4]` boxes in `[0, 1]` coordinates, zero-filled pads.
    pub boxes: Tensor,
    /// `[max_boxes]` 0/1 real-vs-pad indicator.
    pub masks: Tensor,
    /// `[max_boxes]` image embedding availability after dropout.
    pub image_masks: Tensor,
    /// `[max_boxes]` text embedding availability after dropout.
    pub text_masks: Tensor,
    /// `[max_boxes, width]` per-slot text embeddings, zero-filled pads.
    pub text_embeddings: Tensor,
    /// `[max_boxes, width]` per-slot image embeddings, zero-filled pads.
    pub image_embeddings: Tensor,
    /// Comma-joined surviving words in selection order, possibly empty.
    pub caption: String,
}
