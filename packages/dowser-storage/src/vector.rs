//! Embeddings are stored as little-endian f32 BLOBs.

pub fn vec_to_blob(values: &[f32]) -> Vec<u8> {
	let mut out = Vec::with_capacity(values.len() * 4);

	for value in values {
		out.extend_from_slice(&value.to_le_bytes());
	}

	out
}

pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
	blob.chunks_exact(4)
		.map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
		.collect()
}
