use std::f32::consts::FRAC_PI_2;

use super::angle::normalize_angle;
use super::template::{template, Template, REQUIRED_PARTS, ROOT_PART};
use super::tree::{Keyed, Tree};
use crate::pose::{Keypoint, Part, Pose};

/// スケルトン内の関節
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    pub part: Part,
    pub keypoint: Keypoint,
    /// 親関節からの向き（ラジアン）
    pub angle: f32,
    /// 親の向きに対する相対角 (-π, π]
    pub angle_relative_to_parent: f32,
}

impl Keyed<Part> for Joint {
    fn key(&self) -> Part {
        self.part
    }
}

/// テンプレート形状の関節ツリー（欠損あり）
pub type Skeleton = Tree<Part, Joint>;

/// 1人分の姿勢からスケルトンを構築
/// 必須部位が `min_confidence` 未満なら `None`。
/// 閾値未満の関節はその部分木ごと除外
pub fn build_skeleton(pose: &Pose, min_confidence: f32) -> Option<Skeleton> {
    let has_required = REQUIRED_PARTS
        .iter()
        .all(|&part| pose.get(part).is_valid(min_confidence));
    if !has_required {
        return None;
    }

    let mut root = Skeleton::new(Joint {
        part: ROOT_PART,
        keypoint: *pose.get(ROOT_PART),
        angle: FRAC_PI_2,
        angle_relative_to_parent: 0.0,
    });
    attach_children(&mut root, pose, template(), min_confidence);
    Some(root)
}

fn attach_children(node: &mut Skeleton, pose: &Pose, template: &Template, min_confidence: f32) {
    for (&part, child_template) in template.entries() {
        let keypoint = *pose.get(part);
        if !keypoint.is_valid(min_confidence) {
            continue;
        }
        let parent = *node.value();
        let angle = (keypoint.y - parent.keypoint.y).atan2(keypoint.x - parent.keypoint.x);
        let child = node.add_child(Joint {
            part,
            keypoint,
            angle,
            angle_relative_to_parent: normalize_angle(angle - parent.angle),
        });
        attach_children(child, pose, child_template, min_confidence);
    }
}

/// テスト用の直立姿勢（信頼度1.0）
#[cfg(test)]
pub(crate) fn standing_pose() -> Pose {
    let mut pose = Pose::default();
    let points = [
        (Part::Nose, 50.0, 10.0),
        (Part::LeftEye, 47.0, 8.0),
        (Part::RightEye, 53.0, 8.0),
        (Part::LeftEar, 44.0, 10.0),
        (Part::RightEar, 56.0, 10.0),
        (Part::LeftShoulder, 40.0, 30.0),
        (Part::RightShoulder, 60.0, 30.0),
        (Part::LeftElbow, 35.0, 50.0),
        (Part::RightElbow, 65.0, 50.0),
        (Part::LeftWrist, 33.0, 70.0),
        (Part::RightWrist, 67.0, 70.0),
        (Part::LeftHip, 43.0, 80.0),
        (Part::RightHip, 57.0, 80.0),
        (Part::LeftKnee, 42.0, 110.0),
        (Part::RightKnee, 58.0, 110.0),
        (Part::LeftAnkle, 42.0, 140.0),
        (Part::RightAnkle, 58.0, 140.0),
    ];
    for (part, x, y) in points {
        pose.set(part, Keypoint::new(x, y, 1.0));
    }
    pose
}
