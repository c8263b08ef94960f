//! Precomputed text embedding table.

use super::{TextEmbedder, EMBEDDING_WIDTH};
use crate::common::*;

/// Text embeddings precomputed offline and stored in a JSON table keyed by
/// word, each value a base64-encoded little-endian f32 vector.
#[derive(Debug)]
pub struct CachedTextEmbedder {
    table: HashMap<String, Tensor>,
}

impl CachedTextEmbedder {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read embedding table '{}'", path.display()))?;
        let blobs: HashMap<String, String> = serde_json::from_str(&text)
            .with_context(|| format!("malformed embedding table '{}'", path.display()))?;

        let table: HashMap<String, Tensor> = blobs
            .into_iter()
            .map(|(word, blob)| -> Result<_> {
                let tensor = decode_embedding(&blob)
                    .with_context(|| format!("bad embedding for word '{}'", word))?;
                Ok((word, tensor))
            })
            .try_collect()?;

        info!(
            "loaded {} cached word embeddings from '{}'",
            table.len(),
            path.display()
        );

        Ok(Self { table })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl TextEmbedder for CachedTextEmbedder {
    fn embed(&self, word: &str) -> Result<Tensor> {
        let tensor = self
            .table
            .get(word)
            .ok_or_else(|| format_err!("no cached embedding for word '{}'", word))?;
        Ok(tensor.shallow_clone())
    }
}

fn decode_embedding(blob: &str) -> Result<Tensor> {
    let bytes = base64::decode(blob)?;
    ensure!(
        bytes.len() % 4 == 0,
        "blob length {} is not a multiple of 4",
        bytes.len()
    );

    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    ensure!(
        values.len() == EMBEDDING_WIDTH,
        "expect embedding width {}, but get {}",
        EMBEDDING_WIDTH,
        values.len()
    );

    Ok(Tensor::of_slice(&values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(values: &[f32]) -> String {
        let bytes: Vec<u8> = values
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect();
        base64::encode(&bytes)
    }

    #[test]
    fn blob_round_trip() -> Result<()> {
        let values: Vec<f32> = (0..EMBEDDING_WIDTH).map(|index| index as f32).collect();
        let tensor = decode_embedding(&encode(&values))?;

        assert_eq!(tensor.size(), &[EMBEDDING_WIDTH as i64]);
        assert_eq!(tensor.double_value(&[7]), 7.0);
        Ok(())
    }

    #[test]
    fn wrong_width_is_rejected() {
        let values = vec![0.0f32; EMBEDDING_WIDTH - 1];
        assert!(decode_embedding(&encode(&values)).is_err());
    }
}
