use std::sync::OnceLock;

use super::tree::Tree;
use crate::pose::Part;

/// 体のトポロジーと各関節の重み
pub type Template = Tree<Part, f32>;

/// スケルトン構築に必須の部位
pub const REQUIRED_PARTS: [Part; 4] = [
    Part::LeftShoulder,
    Part::RightShoulder,
    Part::LeftElbow,
    Part::RightElbow,
];

/// ルート部位
pub const ROOT_PART: Part = Part::LeftShoulder;

static TEMPLATE: OnceLock<Template> = OnceLock::new();

/// 共有テンプレート（初回のみ構築）
pub fn template() -> &'static Template {
    TEMPLATE.get_or_init(build_template)
}

fn build_template() -> Template {
    let mut root = Template::new(1.0);
    root.add_child_with_key(Part::LeftElbow, 3.0)
        .add_child_with_key(Part::LeftWrist, 1.0);
    root.add_child_with_key(Part::LeftHip, 2.0)
        .add_child_with_key(Part::LeftKnee, 1.0)
        .add_child_with_key(Part::LeftAnkle, 1.0);

    let right_shoulder = root.add_child_with_key(Part::RightShoulder, 1.0);
    right_shoulder
        .add_child_with_key(Part::RightElbow, 3.0)
        .add_child_with_key(Part::RightWrist, 1.0);
    right_shoulder
        .add_child_with_key(Part::RightHip, 2.0)
        .add_child_with_key(Part::RightKnee, 1.0)
        .add_child_with_key(Part::RightAnkle, 1.0);

    root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight(path: &[Part]) -> Option<f32> {
        let mut node = template();
        for part in path {
            node = node.child(part)?;
        }
        Some(*node.value())
    }

    #[test]
    fn test_template_shape() {
        // ルート + 左5 + 右肩 + 右5
        assert_eq!(template().node_count(), 12);
        assert_eq!(weight(&[Part::LeftElbow]), Some(3.0));
        assert_eq!(weight(&[Part::LeftElbow, Part::LeftWrist]), Some(1.0));
        assert_eq!(weight(&[Part::LeftHip, Part::LeftKnee, Part::LeftAnkle]), Some(1.0));
        assert_eq!(weight(&[Part::RightShoulder]), Some(1.0));
        assert_eq!(weight(&[Part::RightShoulder, Part::RightHip]), Some(2.0));
        assert_eq!(weight(&[Part::RightElbow]), None);
    }

    #[test]
    fn test_template_is_shared() {
        assert!(std::ptr::eq(template(), template()));
    }

    #[test]
    fn test_face_parts_not_in_template() {
        assert!(template().child(&Part::Nose).is_none());
    }
}
