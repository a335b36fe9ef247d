use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::SessionError;
use crate::pose::Pose;
use crate::skeleton::{build_skeleton, Skeleton};

/// ファイル上のお手本: idと写真から検出した姿勢
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceEntry {
    pub id: String,
    pub poses: Vec<Pose>,
}

/// お手本（集合写真なら複数スケルトン）
#[derive(Debug, Clone)]
pub struct Reference {
    pub id: String,
    pub skeletons: Vec<Skeleton>,
}

/// お手本の一覧（空でない）
#[derive(Debug, Clone)]
pub struct Catalog {
    references: Vec<Reference>,
}

impl Catalog {
    /// スケルトンのないお手本は除外。空ならエラー
    pub fn new(references: Vec<Reference>) -> Result<Self, SessionError> {
        let references: Vec<Reference> = references
            .into_iter()
            .filter(|r| {
                if r.skeletons.is_empty() {
                    warn!("reference {} has no usable skeleton, skipped", r.id);
                }
                !r.skeletons.is_empty()
            })
            .collect();
        if references.is_empty() {
            return Err(SessionError::Initialization(
                "no usable reference poses".to_string(),
            ));
        }
        Ok(Self { references })
    }

    /// 各エントリのスケルトンを構築（反転なし）
    pub fn from_entries(entries: Vec<ReferenceEntry>, min_confidence: f32) -> Result<Self, SessionError> {
        let references = entries
            .into_iter()
            .map(|entry| Reference {
                skeletons: entry
                    .poses
                    .iter()
                    .filter_map(|pose| build_skeleton(pose, min_confidence))
                    .collect(),
                id: entry.id,
            })
            .collect();
        Self::new(references)
    }

    /// JSONから読み込み: `[{"id": .., "poses": [..]}, ..]`
    pub fn load<P: AsRef<Path>>(path: P, min_confidence: f32) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let entries: Vec<ReferenceEntry> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse catalog {}", path.display()))?;
        let catalog = Self::from_entries(entries, min_confidence)?;
        info!("catalog loaded: {} references", catalog.len());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// 進行インデックスのお手本（一覧を循環）
    pub fn cycled(&self, index: usize) -> &Reference {
        &self.references[index % self.references.len()]
    }
}
