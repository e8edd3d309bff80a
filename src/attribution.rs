//! Exact SHAP values for tree ensembles (path-dependent TreeSHAP).
//!
//! Each tree is walked once per row while tracking, for every feature on the
//! current root-to-node path, the fraction of training cover that flows down
//! the path when the feature is unknown (`zero`) and whether the row itself
//! follows the path (`one`). At a leaf the permutation weights of the path give
//! each feature's share of the leaf value.

use serde::Serialize;

use crate::features::{FEATURE_COUNT, FEATURE_NAMES, FeatureRow};
use crate::risk_model::{Node, RegressionTree, TreeEnsemble, goes_left};

#[derive(Debug, Clone)]
pub struct Attribution {
    /// Model output when no feature is known.
    pub expected_value: f64,
    pub values: FeatureRow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorContribution {
    pub feature: &'static str,
    pub importance: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero: f64,
    one: f64,
    weight: f64,
}

pub fn shap_values(ensemble: &TreeEnsemble, x: &FeatureRow) -> Attribution {
    let w = ensemble.tree_weight();
    let mut values = [0.0; FEATURE_COUNT];
    let mut expected_value = ensemble.base_score();
    let mut per_tree = [0.0; FEATURE_COUNT];
    for tree in ensemble.trees() {
        per_tree.fill(0.0);
        tree_shap(tree, x, &mut per_tree);
        for (acc, v) in values.iter_mut().zip(&per_tree) {
            *acc += w * v;
        }
        expected_value += w * tree.expected_value();
    }
    Attribution {
        expected_value,
        values,
    }
}

/// Orders features by absolute contribution, largest first. Ties keep
/// training column order.
pub fn rank_factors(values: &FeatureRow, top_n: usize) -> Vec<FactorContribution> {
    let mut ranked: Vec<FactorContribution> = FEATURE_NAMES
        .iter()
        .zip(values)
        .map(|(name, v)| FactorContribution {
            feature: *name,
            importance: v.abs(),
            value: *v,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked.truncate(top_n);
    ranked
}

fn tree_shap(tree: &RegressionTree, x: &FeatureRow, phi: &mut FeatureRow) {
    recurse(tree, 0, x, phi, &[], 1.0, 1.0, None);
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &RegressionTree,
    node_idx: usize,
    x: &FeatureRow,
    phi: &mut FeatureRow,
    parent_path: &[PathElement],
    zero: f64,
    one: f64,
    feature: Option<usize>,
) {
    let mut path = parent_path.to_vec();
    extend_path(&mut path, zero, one, feature);

    match tree.nodes[node_idx] {
        Node::Leaf { value, .. } => {
            let depth = path.len() - 1;
            for i in 1..=depth {
                let w = unwound_path_sum(&path, i);
                let el = path[i];
                if let Some(f) = el.feature {
                    phi[f] += w * (el.one - el.zero) * value;
                }
            }
        }
        Node::Split {
            feature: split_feature,
            threshold,
            left,
            right,
            cover,
        } => {
            let (hot, cold) = if goes_left(x[split_feature], threshold) {
                (left, right)
            } else {
                (right, left)
            };
            let hot_zero = tree.nodes[hot].cover() / cover;
            let cold_zero = tree.nodes[cold].cover() / cover;

            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;
            if let Some(k) = path
                .iter()
                .position(|el| el.feature == Some(split_feature))
            {
                incoming_zero = path[k].zero;
                incoming_one = path[k].one;
                unwind_path(&mut path, k);
            }

            recurse(
                tree,
                hot,
                x,
                phi,
                &path,
                hot_zero * incoming_zero,
                incoming_one,
                Some(split_feature),
            );
            recurse(
                tree,
                cold,
                x,
                phi,
                &path,
                cold_zero * incoming_zero,
                0.0,
                Some(split_feature),
            );
        }
    }
}

fn extend_path(path: &mut Vec<PathElement>, zero: f64, one: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero,
        one,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].weight += one * path[i].weight * (i + 1) as f64 / denom;
        path[i].weight = zero * path[i].weight * (depth - i) as f64 / denom;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, path_index: usize) {
    let depth = path.len() - 1;
    let one = path[path_index].one;
    let zero = path[path_index].zero;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].weight;
    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = path[i].weight;
            path[i].weight = next_one_portion * denom / ((i + 1) as f64 * one);
            next_one_portion = tmp - path[i].weight * zero * (depth - i) as f64 / denom;
        } else {
            path[i].weight = path[i].weight * denom / (zero * (depth - i) as f64);
        }
    }
    for i in path_index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero = path[i + 1].zero;
        path[i].one = path[i + 1].one;
    }
    path.pop();
}

fn unwound_path_sum(path: &[PathElement], path_index: usize) -> f64 {
    let depth = path.len() - 1;
    let one = path[path_index].one;
    let zero = path[path_index].zero;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].weight;
    let mut total = 0.0;
    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = next_one_portion * denom / ((i + 1) as f64 * one);
            total += tmp;
            next_one_portion = path[i].weight - tmp * zero * ((depth - i) as f64 / denom);
        } else if zero != 0.0 {
            total += (path[i].weight / zero) / ((depth - i) as f64 / denom);
        }
    }
    total
}
