use lp_core::{BinaryDescriptor, CoreError, CoreResult, Descriptors, FloatDescriptor, NormType};
use rayon::prelude::*;

/// Correspondence between a query and a train descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

/// Exact nearest-neighbour matcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BruteForceMatcher {
    pub norm: NormType,
    /// Keep only mutual nearest neighbours.
    pub cross_check: bool,
}

impl BruteForceMatcher {
    pub fn new(norm: NormType) -> Self {
        Self {
            norm,
            cross_check: false,
        }
    }

    pub fn with_cross_check(mut self, enable: bool) -> Self {
        self.cross_check = enable;
        self
    }

    /// One match per query descriptor (fewer with cross-check), ordered by query index.
    ///
    /// Ties resolve to the lowest train index. Float descriptors are compared
    /// with L2 and binary ones with Hamming regardless of `norm`; mixing kinds
    /// is an error.
    pub fn match_descriptors(&self, query: &Descriptors, train: &Descriptors) -> CoreResult<Vec<Match>> {
        if query.kind() != train.kind() {
            return Err(CoreError::DescriptorKindMismatch {
                left: query.kind(),
                right: train.kind(),
            });
        }
        if query.is_empty() || train.is_empty() {
            return Ok(Vec::new());
        }

        let matches = match (query, train) {
            (Descriptors::Float(q), Descriptors::Float(t)) => self.match_rows(q, t, l2_distance),
            (Descriptors::Binary(q), Descriptors::Binary(t)) => self.match_rows(q, t, hamming_distance),
            _ => Vec::new(),
        };
        Ok(matches)
    }

    fn match_rows<D: Sync>(&self, query: &[D], train: &[D], dist: fn(&D, &D) -> f32) -> Vec<Match> {
        let forward: Vec<Match> = query
            .par_iter()
            .enumerate()
            .filter_map(|(qi, q)| nearest(q, train, dist).map(|(ti, d)| Match {
                query_idx: qi,
                train_idx: ti,
                distance: d,
            }))
            .collect();

        if !self.cross_check {
            return forward;
        }

        let backward: Vec<Option<usize>> = train
            .par_iter()
            .map(|t| nearest(t, query, dist).map(|(qi, _)| qi))
            .collect();

        forward
            .into_iter()
            .filter(|m| backward[m.train_idx] == Some(m.query_idx))
            .collect()
    }
}

fn nearest<D>(needle: &D, haystack: &[D], dist: fn(&D, &D) -> f32) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, candidate) in haystack.iter().enumerate() {
        let d = dist(needle, candidate);
        match best {
            Some((_, bd)) if d >= bd => {}
            _ => best = Some((i, d)),
        }
    }
    best
}

pub fn l2_distance(a: &FloatDescriptor, b: &FloatDescriptor) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}

pub fn hamming_distance(a: &BinaryDescriptor, b: &BinaryDescriptor) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum::<u32>() as f32
}
