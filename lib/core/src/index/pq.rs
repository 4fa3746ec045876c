//! Product quantization
//!
//! Splits a vector into equal segments and replaces each segment with the id of
//! its nearest codeword. Distances to a query are read from a per-query lookup
//! table (asymmetric distance computation).

use super::kmeans::KMeans;
use crate::{Error, Result};

/// Product quantizer with up to 256 codewords per segment
#[derive(Debug, Clone)]
pub struct ProductQuantizer {
    dim: usize,
    segments: usize,
    sub_dim: usize,
    codebook_size: usize,
    /// [segment][code][sub_dim], flattened
    codebooks: Vec<f32>,
}

impl ProductQuantizer {
    pub fn new(dim: usize, segments: usize, bits_per_code: u32) -> Result<Self> {
        if segments == 0 || dim % segments != 0 {
            return Err(Error::Configuration(format!(
                "segment count {} must evenly divide dimension {}",
                segments, dim
            )));
        }
        if !(1..=8).contains(&bits_per_code) {
            return Err(Error::Configuration(format!(
                "bits per code must be in 1..=8, got {}",
                bits_per_code
            )));
        }
        Ok(Self {
            dim,
            segments,
            sub_dim: dim / segments,
            codebook_size: 1 << bits_per_code,
            codebooks: Vec::new(),
        })
    }

    #[inline]
    pub fn segments(&self) -> usize {
        self.segments
    }

    #[inline]
    pub fn codebook_size(&self) -> usize {
        self.codebook_size
    }

    #[inline]
    pub fn is_trained(&self) -> bool {
        !self.codebooks.is_empty()
    }

    #[inline]
    fn codeword(&self, segment: usize, code: usize) -> &[f32] {
        let start = (segment * self.codebook_size + code) * self.sub_dim;
        &self.codebooks[start..start + self.sub_dim]
    }

    /// Train one codebook per segment on row-major vectors
    pub fn fit(&mut self, vectors: &[f32], seed: u64, iterations: usize) -> Result<()> {
        let n = super::batch_rows(self.dim, vectors)?;
        let mut codebooks = Vec::with_capacity(self.segments * self.codebook_size * self.sub_dim);

        for segment in 0..self.segments {
            let mut sub = Vec::with_capacity(n * self.sub_dim);
            for row in vectors.chunks_exact(self.dim) {
                sub.extend_from_slice(&row[segment * self.sub_dim..(segment + 1) * self.sub_dim]);
            }

            let mut kmeans = KMeans::new(self.sub_dim, self.codebook_size)?
                .with_seed(seed.wrapping_add(segment as u64))
                .with_iterations(iterations);
            kmeans.fit(&sub).map_err(|e| {
                Error::IndexBuild(format!("codebook for segment {}: {}", segment, e))
            })?;
            codebooks.extend_from_slice(kmeans.centroids());
        }

        self.codebooks = codebooks;
        Ok(())
    }

    /// Code of the nearest codeword per segment
    pub fn encode(&self, vector: &[f32]) -> Vec<u8> {
        (0..self.segments)
            .map(|segment| {
                let sub = &vector[segment * self.sub_dim..(segment + 1) * self.sub_dim];
                let mut best = (0usize, f32::INFINITY);
                for code in 0..self.codebook_size {
                    let d = crate::simd::l2_squared_simd(sub, self.codeword(segment, code));
                    if d < best.1 {
                        best = (code, d);
                    }
                }
                best.0 as u8
            })
            .collect()
    }

    /// Reconstruct the vector a code sequence stands for
    pub fn decode(&self, codes: &[u8]) -> Vec<f32> {
        codes
            .iter()
            .enumerate()
            .flat_map(|(segment, &code)| self.codeword(segment, code as usize).iter().copied())
            .collect()
    }

    /// Squared distance from each query segment to every codeword of that segment.
    /// Layout: `table[segment * codebook_size + code]`.
    pub fn distance_table(&self, query: &[f32]) -> Vec<f32> {
        let mut table = Vec::with_capacity(self.segments * self.codebook_size);
        for segment in 0..self.segments {
            let sub = &query[segment * self.sub_dim..(segment + 1) * self.sub_dim];
            for code in 0..self.codebook_size {
                table.push(crate::simd::l2_squared_simd(sub, self.codeword(segment, code)));
            }
        }
        table
    }

    #[inline]
    pub fn distance_with_table(&self, table: &[f32], codes: &[u8]) -> f32 {
        codes
            .iter()
            .enumerate()
            .map(|(segment, &code)| table[segment * self.codebook_size + code as usize])
            .sum()
    }
}
