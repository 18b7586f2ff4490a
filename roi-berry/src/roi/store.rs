//! ROI 的唯一持有者.

use std::fmt;

use itertools::Itertools;

use super::Roi;

/// 变更通知回调. 在每次成功的修改之后被同步调用, 参数为修改后的全部 ROI.
///
/// 回调中不得再次修改存储 (借用规则本身也不允许).
pub type RoiObserver = Box<dyn FnMut(&[Roi])>;

/// ROI 存储.
///
/// 维护以下性质:
///
/// - 对同一个 `(segment_index, series_key)` 至多存在一个 ROI.
///   插入同键 ROI 会移除旧记录并把新记录追加到末尾,
///   因此插入顺序不是稳定的显示顺序.
/// - 所有修改都是整条记录的移除或追加, 不存在部分字段修改.
/// - 每次成功的修改只触发一次变更通知; 失败 (越界, 空选择) 的修改不触发通知.
#[derive(Default)]
pub struct RoiStore {
    rois: Vec<Roi>,
    observers: Vec<RoiObserver>,
}

impl fmt::Debug for RoiStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoiStore")
            .field("rois", &self.rois)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl RoiStore {
    /// 创建空存储.
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册变更通知回调.
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&[Roi]) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    fn notify(&mut self) {
        let Self { rois, observers } = self;
        for observer in observers.iter_mut() {
            observer(rois);
        }
    }

    /// 移除与 `roi` 同键的旧记录 (至多一条), 再追加 `roi`. 不触发通知.
    fn upsert(&mut self, roi: Roi) {
        if let Some(i) = self.rois.iter().position(|r| r.same_key(&roi)) {
            self.rois.remove(i);
        }
        self.rois.push(roi);
    }

    /// 移除完全相同的重复记录, 保留首次出现的顺序. 不触发通知.
    fn dedup_quiet(&mut self) -> usize {
        let before = self.rois.len();
        self.rois = std::mem::take(&mut self.rois).into_iter().unique().collect();
        before - self.rois.len()
    }

    /// 插入 ROI. 同键的旧记录被替换. 总是成功.
    pub fn add(&mut self, roi: Roi) -> bool {
        self.upsert(roi);
        self.notify();
        true
    }

    /// 删除第 `index` 条记录并返回它. 越界时返回 `None`.
    pub fn delete(&mut self, index: usize) -> Option<Roi> {
        if index >= self.rois.len() {
            return None;
        }
        let roi = self.rois.remove(index);
        self.notify();
        Some(roi)
    }

    /// 删除给定切片上最后插入的 ROI. 切片上没有 ROI 时返回 `None`.
    pub fn delete_last_on_slice(&mut self, series_key: &str, slice_index: usize) -> Option<Roi> {
        let i = self
            .rois
            .iter()
            .rposition(|r| r.is_on(series_key, slice_index))?;
        self.delete(i)
    }

    /// 删除给定切片上的全部 ROI, 返回删除的个数. 只触发一次通知.
    pub fn clear_slice(&mut self, series_key: &str, slice_index: usize) -> usize {
        let before = self.rois.len();
        self.rois.retain(|r| !r.is_on(series_key, slice_index));
        let removed = before - self.rois.len();
        if removed > 0 {
            self.notify();
        }
        removed
    }

    /// 删除全部 ROI. 存储原本为空时返回 `false`.
    pub fn clear_all(&mut self) -> bool {
        if self.rois.is_empty() {
            return false;
        }
        self.rois.clear();
        self.notify();
        true
    }

    /// 移除完全相同的重复记录, 返回移除的个数. 有记录被移除时触发一次通知.
    pub fn dedup(&mut self) -> usize {
        let removed = self.dedup_quiet();
        if removed > 0 {
            self.notify();
        }
        removed
    }

    /// 批量插入 (逐条执行同键替换), 然后去重. 有记录插入时只触发一次通知.
    ///
    /// 返回插入的条数.
    pub fn extend<I>(&mut self, rois: I) -> usize
    where
        I: IntoIterator<Item = Roi>,
    {
        let mut count = 0;
        for roi in rois {
            self.upsert(roi);
            count += 1;
        }
        if count > 0 {
            self.dedup_quiet();
            self.notify();
        }
        count
    }

    /// 清空存储后批量插入并去重, 无论结果如何都只触发一次通知.
    ///
    /// 返回最终的记录数.
    pub fn replace_all<I>(&mut self, rois: I) -> usize
    where
        I: IntoIterator<Item = Roi>,
    {
        self.rois.clear();
        for roi in rois {
            self.upsert(roi);
        }
        self.dedup_quiet();
        self.notify();
        self.rois.len()
    }

    /// 给定序列给定切片上的全部 ROI, 按插入顺序排列.
    pub fn query(&self, series_key: &str, slice_index: usize) -> Vec<&Roi> {
        self.rois
            .iter()
            .filter(|r| r.is_on(series_key, slice_index))
            .collect()
    }

    /// 给定序列的全部 ROI, 按插入顺序排列.
    pub fn of_series(&self, series_key: &str) -> Vec<&Roi> {
        self.rois
            .iter()
            .filter(|r| r.series_key == series_key)
            .collect()
    }

    /// 第 `index` 条记录.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Roi> {
        self.rois.get(index)
    }

    /// 记录条数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rois.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    /// 按插入顺序遍历全部记录.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Roi> {
        self.rois.iter()
    }

    /// 全部记录.
    #[inline]
    pub fn as_slice(&self) -> &[Roi] {
        &self.rois
    }
}

impl<'a> IntoIterator for &'a RoiStore {
    type Item = &'a Roi;
    type IntoIter = std::slice::Iter<'a, Roi>;

    fn into_iter(self) -> Self::IntoIter {
        self.rois.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::RoiStore;
    use crate::roi::tests::sample_roi;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counted_store() -> (RoiStore, Rc<Cell<usize>>) {
        let mut store = RoiStore::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        store.subscribe(move |_| c.set(c.get() + 1));
        (store, count)
    }

    #[test]
    fn test_add_replaces_same_key() {
        let mut store = RoiStore::new();
        store.add(sample_roi(1, "a", 0));
        store.add(sample_roi(2, "a", 0));
        assert_eq!(store.len(), 2);

        let mut newer = sample_roi(1, "a", 5);
        newer.center_x = 0.75;
        store.add(newer.clone());
        assert_eq!(store.len(), 2);
        // 被替换的记录移到末尾.
        assert_eq!(store.get(0).map(|r| r.segment_index), Some(2));
        assert_eq!(store.get(1), Some(&newer));

        // 其他序列的同段索引不冲突.
        store.add(sample_roi(1, "b", 0));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_delete_bounds() {
        let (mut store, count) = counted_store();
        assert!(store.delete(0).is_none());
        assert!(!store.clear_all());
        assert_eq!(store.clear_slice("a", 0), 0);
        assert!(store.delete_last_on_slice("a", 0).is_none());
        assert_eq!(count.get(), 0);

        store.add(sample_roi(1, "a", 0));
        assert!(store.delete(1).is_none());
        assert!(store.delete(0).is_some());
        assert!(store.is_empty());
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_delete_last_on_slice() {
        let mut store = RoiStore::new();
        store.add(sample_roi(1, "a", 0));
        store.add(sample_roi(2, "a", 1));
        store.add(sample_roi(3, "a", 0));
        let removed = store.delete_last_on_slice("a", 0).unwrap();
        assert_eq!(removed.segment_index, 3);
        assert_eq!(store.len(), 2);
        assert_eq!(store.query("a", 0).len(), 1);
    }

    #[test]
    fn test_clear_slice_notifies_once() {
        let (mut store, count) = counted_store();
        store.add(sample_roi(1, "a", 0));
        store.add(sample_roi(2, "a", 0));
        store.add(sample_roi(3, "a", 1));
        count.set(0);
        assert_eq!(store.clear_slice("a", 0), 2);
        assert_eq!(count.get(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.query("a", 0).is_empty());
    }

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        let (mut store, count) = counted_store();
        // 不同序列保证不触发同键替换.
        let a = sample_roi(1, "a", 0);
        let b = sample_roi(2, "b", 0);
        store.rois = vec![a.clone(), b.clone(), a.clone(), b.clone(), a.clone()];
        assert_eq!(store.dedup(), 3);
        assert_eq!(store.as_slice(), &[a, b]);
        assert_eq!(count.get(), 1);

        assert_eq!(store.dedup(), 0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_extend_and_replace_all() {
        let (mut store, count) = counted_store();
        let n = store.extend(vec![
            sample_roi(1, "a", 0),
            sample_roi(2, "a", 1),
            sample_roi(1, "a", 2),
        ]);
        assert_eq!(n, 3);
        assert_eq!(store.len(), 2);
        assert_eq!(count.get(), 1);

        assert_eq!(store.extend(Vec::new()), 0);
        assert_eq!(count.get(), 1);

        let n = store.replace_all(vec![sample_roi(4, "b", 0)]);
        assert_eq!(n, 1);
        assert_eq!(count.get(), 2);
        assert_eq!(store.of_series("a").len(), 0);
        assert_eq!(store.of_series("b").len(), 1);
    }

    #[test]
    fn test_query_order() {
        let mut store = RoiStore::new();
        for seg in [3, 1, 2] {
            store.add(sample_roi(seg, "a", 7));
        }
        let got: Vec<u32> = store.query("a", 7).iter().map(|r| r.segment_index).collect();
        assert_eq!(got, vec![3, 1, 2]);
        assert!(store.query("a", 8).is_empty());
        assert!(store.query("b", 7).is_empty());
    }
}
