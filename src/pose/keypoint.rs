use serde::{Deserialize, Serialize};

/// MoveNet / PoseNet の 17 部位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(usize)]
pub enum Part {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl Part {
    pub const COUNT: usize = 17;

    pub const ALL: [Part; Part::COUNT] = [
        Part::Nose,
        Part::LeftEye,
        Part::RightEye,
        Part::LeftEar,
        Part::RightEar,
        Part::LeftShoulder,
        Part::RightShoulder,
        Part::LeftElbow,
        Part::RightElbow,
        Part::LeftWrist,
        Part::RightWrist,
        Part::LeftHip,
        Part::RightHip,
        Part::LeftKnee,
        Part::RightKnee,
        Part::LeftAnkle,
        Part::RightAnkle,
    ];

    /// 左右反対側の部位
    pub fn flipped(self) -> Self {
        use Part::*;
        match self {
            Nose => Nose,
            LeftEye => RightEye,
            RightEye => LeftEye,
            LeftEar => RightEar,
            RightEar => LeftEar,
            LeftShoulder => RightShoulder,
            RightShoulder => LeftShoulder,
            LeftElbow => RightElbow,
            RightElbow => LeftElbow,
            LeftWrist => RightWrist,
            RightWrist => LeftWrist,
            LeftHip => RightHip,
            RightHip => LeftHip,
            LeftKnee => RightKnee,
            RightKnee => LeftKnee,
            LeftAnkle => RightAnkle,
            RightAnkle => LeftAnkle,
        }
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// 信頼度が閾値以上かつ座標が有限か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold && self.x.is_finite() && self.y.is_finite()
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            confidence: 0.0,
        }
    }
}

/// JSON上の形式: `{"part": "leftElbow", "x": .., "y": .., "confidence": ..}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledKeypoint {
    pub part: Part,
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

/// 17キーポイントからなる姿勢（欠損は信頼度0）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<LabeledKeypoint>", into = "Vec<LabeledKeypoint>")]
pub struct Pose {
    pub keypoints: [Keypoint; Part::COUNT],
}

impl Pose {
    pub fn get(&self, part: Part) -> &Keypoint {
        &self.keypoints[part as usize]
    }

    pub fn set(&mut self, part: Part, keypoint: Keypoint) {
        self.keypoints[part as usize] = keypoint;
    }

    /// 左右ラベルを入れ替え（座標はそのまま）。
    /// カメラ映像がお手本写真に対して鏡像のときに使う
    pub fn flipped(&self) -> Pose {
        let mut flipped = Pose::default();
        for part in Part::ALL {
            flipped.set(part.flipped(), *self.get(part));
        }
        flipped
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            keypoints: [Keypoint::default(); Part::COUNT],
        }
    }
}

impl From<Vec<LabeledKeypoint>> for Pose {
    fn from(labeled: Vec<LabeledKeypoint>) -> Self {
        let mut pose = Pose::default();
        for kp in labeled {
            pose.set(kp.part, Keypoint::new(kp.x, kp.y, kp.confidence));
        }
        pose
    }
}

impl From<Pose> for Vec<LabeledKeypoint> {
    fn from(pose: Pose) -> Self {
        Part::ALL
            .iter()
            .map(|&part| {
                let kp = pose.get(part);
                LabeledKeypoint {
                    part,
                    x: kp.x,
                    y: kp.y,
                    confidence: kp.confidence,
                }
            })
            .collect()
    }
}
