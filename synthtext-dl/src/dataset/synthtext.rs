//! The SynthText annotation source.

use super::{AnnotationSource, WordBox, WordRecord};
use crate::{common::*, processor::RawBox};

/// Annotations of the SynthText dataset.
///
/// Consumes a JSON index converted from the upstream `gt.mat`: one entry
/// per image carrying the image path relative to the dataset directory, the
/// split word list, and one corner box per word. The table is read once and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SynthTextAnnotations {
    pub dataset_dir: PathBuf,
    pub records: Vec<Arc<WordRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
struct IndexFile {
    images: Vec<IndexEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct IndexEntry {
    path: PathBuf,
    words: Vec<String>,
    boxes: Vec<RawBox>,
}

impl SynthTextAnnotations {
    /// Load the annotation index from `dataset_dir/index.json`.
    pub fn load(dataset_dir: impl AsRef<Path>) -> Result<Self> {
        let dataset_dir = dataset_dir.as_ref();
        let index_file = dataset_dir.join("index.json");
        let text = std::fs::read_to_string(&index_file).with_context(|| {
            format!("failed to read annotation index '{}'", index_file.display())
        })?;
        let index: IndexFile = serde_json::from_str(&text)
            .with_context(|| format!("malformed annotation index '{}'", index_file.display()))?;

        let records: Vec<_> = index
            .images
            .into_iter()
            .map(|entry| -> Result<_> {
                let IndexEntry { path, words, boxes } = entry;
                ensure!(
                    words.len() == boxes.len(),
                    "entry '{}' has {} words but {} boxes",
                    path.display(),
                    words.len(),
                    boxes.len()
                );

                let word_boxes: Vec<_> = izip!(words, boxes)
                    .map(|(word, rect)| -> Result<_> {
                        let text = word.trim().to_owned();
                        ensure!(!text.is_empty(), "empty word in entry '{}'", path.display());
                        Ok(WordBox { text, rect })
                    })
                    .try_collect()?;

                Ok(Arc::new(WordRecord {
                    path: dataset_dir.join(path),
                    word_boxes,
                }))
            })
            .try_collect()?;

        info!(
            "loaded {} annotated images from '{}'",
            records.len(),
            index_file.display()
        );

        Ok(Self {
            dataset_dir: dataset_dir.to_owned(),
            records,
        })
    }
}

impl AnnotationSource for SynthTextAnnotations {
    fn records(&self) -> &[Arc<WordRecord>] {
        &self.records
    }
}
