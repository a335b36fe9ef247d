use std::collections::HashMap;
use std::f32::consts::PI;

use super::angle::normalize_angle;
use super::builder::Skeleton;
use super::template::{template, Template};
use crate::pose::Part;

/// `reference` に対する `candidate` の類似度 (0.0〜1.0)
/// 親に対する相対角のみ比較するので位置・全体の回転には依存しない。
/// 片方にしかない関節はスキップ（減点しない）
pub fn compare(reference: &Skeleton, candidate: &Skeleton) -> f32 {
    compare_node(reference, candidate, template(), 1.0, None)
}

/// [`compare`] に加えて関節ごとのスコアも返す
pub fn compare_detailed(reference: &Skeleton, candidate: &Skeleton) -> (f32, HashMap<Part, f32>) {
    let mut scores = HashMap::new();
    let score = compare_node(reference, candidate, template(), 1.0, Some(&mut scores));
    (score, scores)
}

fn compare_node(
    reference: &Skeleton,
    candidate: &Skeleton,
    template: &Template,
    multiplier: f32,
    mut scores: Option<&mut HashMap<Part, f32>>,
) -> f32 {
    let delta = normalize_angle(
        candidate.value().angle_relative_to_parent - reference.value().angle_relative_to_parent,
    );
    // 親のスコアが子孫の上限になる
    let score = (1.0 - delta.abs() / PI).powi(2) * multiplier;
    if let Some(scores) = scores.as_deref_mut() {
        scores.insert(reference.value().part, score);
    }

    let mut total_weight = 0.0;
    let mut weighted = 0.0;
    for (part, child_template) in template.entries() {
        if let (Some(r), Some(c)) = (reference.child(part), candidate.child(part)) {
            let weight = *child_template.value();
            weighted += compare_node(r, c, child_template, score, scores.as_deref_mut()) * weight;
            total_weight += weight;
        }
    }

    if total_weight > 0.0 {
        weighted / total_weight
    } else {
        score
    }
}
