pub mod keypoint;
pub mod source;

pub use keypoint::{Keypoint, LabeledKeypoint, Part, Pose};
pub use source::{PoseSource, ReplayPoseSource};
