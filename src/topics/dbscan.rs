// Density-based clustering (DBSCAN) over dense vectors, Euclidean distance.
//
// A point is a core point when at least `min_samples` points (itself
// included) lie within `eps`. Clusters grow from core points in input order,
// so labels are deterministic for a given batch.

use std::collections::VecDeque;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterLabel {
    Cluster(usize),
    Noise,
}

impl ClusterLabel {
    pub fn is_noise(self) -> bool {
        matches!(self, ClusterLabel::Noise)
    }
}

pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn region_query(points: &[Vec<f32>], idx: usize, eps: f32) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| euclidean(&points[idx], p) <= eps)
        .map(|(i, _)| i)
        .collect()
}

pub fn dbscan(points: &[Vec<f32>], eps: f32, min_samples: usize) -> Vec<ClusterLabel> {
    let mut labels: Vec<Option<ClusterLabel>> = vec![None; points.len()];
    let mut next_cluster = 0;

    for i in 0..points.len() {
        if labels[i].is_some() {
            continue;
        }
        let neighbors = region_query(points, i, eps);
        if neighbors.len() < min_samples {
            labels[i] = Some(ClusterLabel::Noise);
            continue;
        }

        let cluster = ClusterLabel::Cluster(next_cluster);
        next_cluster += 1;
        labels[i] = Some(cluster);

        let mut queue: VecDeque<usize> = neighbors.into_iter().filter(|&j| j != i).collect();
        while let Some(j) = queue.pop_front() {
            match labels[j] {
                // border point previously marked as noise
                Some(ClusterLabel::Noise) => labels[j] = Some(cluster),
                Some(_) => continue,
                None => {
                    labels[j] = Some(cluster);
                    let expansion = region_query(points, j, eps);
                    if expansion.len() >= min_samples {
                        queue.extend(expansion);
                    }
                }
            }
        }
    }

    labels
        .into_iter()
        .map(|l| l.unwrap_or(ClusterLabel::Noise))
        .collect()
}
