// Variance-reduction regression tree shared by both ensembles.
// Split search sorts each feature once and scans candidate thresholds with
// running sums, so a node costs O(features * n log n).

use nalgebra::{DMatrix, DVector};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: 16,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    params: TreeParams,
    nodes: Vec<Node>,
    root: usize,
}

impl RegressionTree {
    pub fn new(params: TreeParams) -> Self {
        RegressionTree {
            params,
            nodes: Vec::new(),
            root: 0,
        }
    }

    /// Fit on the subset of rows named by `indices` (ensembles pass
    /// bootstrap draws here; a plain fit passes every row).
    pub fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>, indices: &[usize]) {
        self.nodes.clear();
        let mut indices = indices.to_vec();
        self.root = self.build(x, y, &mut indices, 0);
    }

    pub fn predict(&self, x: &DMatrix<f64>) -> DVector<f64> {
        DVector::from_iterator(x.nrows(), (0..x.nrows()).map(|row| self.predict_row(x, row)))
    }

    pub fn predict_row(&self, x: &DMatrix<f64>, row: usize) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let mut current = self.root;
        loop {
            match &self.nodes[current] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    current = if x[(row, *feature)] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn build(&mut self, x: &DMatrix<f64>, y: &DVector<f64>, indices: &mut [usize], depth: usize) -> usize {
        if indices.is_empty() {
            return self.push(Node::Leaf { value: 0.0 });
        }
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64;
        if depth >= self.params.max_depth || indices.len() < self.params.min_samples_split {
            return self.push(Node::Leaf { value: mean });
        }

        let (feature, threshold) = match self.best_split(x, y, indices) {
            Some(split) => split,
            None => return self.push(Node::Leaf { value: mean }),
        };

        let mid = partition_in_place(indices, |i| x[(i, feature)] <= threshold);
        let (left_rows, right_rows) = indices.split_at_mut(mid);
        let left = self.build(x, y, left_rows, depth + 1);
        let right = self.build(x, y, right_rows, depth + 1);
        self.push(Node::Split {
            feature,
            threshold,
            left,
            right,
        })
    }

    /// Best (feature, threshold) by summed squared error of the two sides;
    /// `None` when no candidate improves on the unsplit node.
    fn best_split(&self, x: &DMatrix<f64>, y: &DVector<f64>, indices: &[usize]) -> Option<(usize, f64)> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;

        let mut best: Option<(usize, f64)> = None;
        let mut best_sse = parent_sse - 1e-12;
        let mut order: Vec<usize> = Vec::with_capacity(n);

        for feature in 0..x.ncols() {
            order.clear();
            order.extend_from_slice(indices);
            order.sort_by(|&a, &b| {
                x[(a, feature)]
                    .partial_cmp(&x[(b, feature)])
                    .unwrap_or(Ordering::Equal)
            });

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 0..n - 1 {
                let yi = y[order[k]];
                left_sum += yi;
                left_sq += yi * yi;

                let here = x[(order[k], feature)];
                let next = x[(order[k + 1], feature)];
                if next <= here {
                    continue;
                }
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < self.params.min_samples_leaf || n_right < self.params.min_samples_leaf
                {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / n_left as f64)
                    + (right_sq - right_sum * right_sum / n_right as f64);
                if sse < best_sse {
                    best_sse = sse;
                    best = Some((feature, (here + next) / 2.0));
                }
            }
        }
        best
    }
}

fn partition_in_place(indices: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for i in 0..indices.len() {
        if pred(indices[i]) {
            indices.swap(mid, i);
            mid += 1;
        }
    }
    mid
}
