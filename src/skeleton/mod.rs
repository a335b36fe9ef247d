//! キーポイントから関節角ツリーを構築し、2つのスケルトンの類似度を求める

pub mod angle;
pub mod builder;
pub mod compare;
pub mod template;
pub mod tree;

pub use angle::normalize_angle;
pub use builder::{build_skeleton, Joint, Skeleton};
pub use compare::{compare, compare_detailed};
pub use template::{template, Template, REQUIRED_PARTS};
pub use tree::{Keyed, Tree};
