//! 数据目录扫描.
//!
//! 约定的目录结构为 `根目录/病人/检查/序列/*.dcm`. 扫描结果是一棵显式的树,
//! 只有包含至少一个 DICOM 文件的序列目录才成为叶子.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::consts::DICOM_EXTENSIONS;

/// 目录扫描错误.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 根路径不存在或不是目录.
    #[error("`{0}` 不是目录")]
    NotADirectory(PathBuf),

    /// 读取目录失败.
    #[error("读取目录失败: {0}")]
    Io(#[from] io::Error),
}

/// 目录扫描结果.
pub type ScanResult<T> = Result<T, ScanError>;

/// 目录树节点.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectoryNode {
    /// 序列目录.
    Leaf(PathBuf),

    /// 病人或检查目录, 子节点按名称排序.
    Branch(BTreeMap<String, DirectoryNode>),
}

impl DirectoryNode {
    /// 按名称顺序 (深度优先) 列出所有序列目录.
    pub fn series_paths(&self) -> Vec<&Path> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Path>) {
        match self {
            Self::Leaf(p) => out.push(p),
            Self::Branch(children) => children.values().for_each(|c| c.collect_into(out)),
        }
    }

    /// 按名称路径查找子节点, 例如 `["patient", "study", "series"]`.
    pub fn get<'s, I: IntoIterator<Item = &'s str>>(&self, names: I) -> Option<&DirectoryNode> {
        let mut node = self;
        for name in names {
            match node {
                Self::Branch(children) => node = children.get(name)?,
                Self::Leaf(_) => return None,
            }
        }
        Some(node)
    }

    /// 是否为叶子.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }
}

/// 按名称排序列出 `dir` 下的所有子目录.
fn sorted_subdirs(dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            out.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

/// `path` 的扩展名是否为 DICOM 扩展名 (区分大小写, 只接受 `dcm` 与 `DCM`).
#[inline]
pub fn is_dicom_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| DICOM_EXTENSIONS.contains(&e))
}

fn has_dicom_file(dir: &Path) -> io::Result<bool> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_dicom_file(&path) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// 扫描 `root` 下的 `病人/检查/序列` 三层结构.
///
/// 不含 DICOM 文件的序列目录被忽略; 病人与检查目录即使为空也会保留.
/// 根目录下的普通文件被忽略.
pub fn scan_directory<P: AsRef<Path>>(root: P) -> ScanResult<DirectoryNode> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut patients = BTreeMap::new();
    let mut leaves = 0usize;
    for (patient, patient_path) in sorted_subdirs(root)? {
        let mut studies = BTreeMap::new();
        for (study, study_path) in sorted_subdirs(&patient_path)? {
            let mut series = BTreeMap::new();
            for (name, series_path) in sorted_subdirs(&study_path)? {
                if has_dicom_file(&series_path)? {
                    series.insert(name, DirectoryNode::Leaf(series_path));
                    leaves += 1;
                }
            }
            studies.insert(study, DirectoryNode::Branch(series));
        }
        patients.insert(patient, DirectoryNode::Branch(studies));
    }
    log::info!("扫描 {}: {} 个病人, {leaves} 个序列", root.display(), patients.len());
    Ok(DirectoryNode::Branch(patients))
}
