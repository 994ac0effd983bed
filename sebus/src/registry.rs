//! 分发注册表（Registry）
//!
//! 事件类型 -> 有序处理器列表（bucket）。分发时只读取这里。
//! - bucket 采用写时复制：每次变更生成新的 `Arc<[..]>` 整体替换，
//!   已交给发布方的快照不会被修改；
//! - 排序模式下，插入后在同一临界区内按优先级升序稳定排序，
//!   非排序模式不付出任何排序开销。
//!
use crate::descriptor::HandlerDescriptor;
use crate::event_type::EventType;
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// bucket 在某一时刻的只读快照
pub type Snapshot = Arc<[Arc<HandlerDescriptor>]>;

#[derive(Clone)]
struct Bucket {
    event_type: EventType,
    handlers: Snapshot,
}

impl Bucket {
    fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            handlers: Arc::from(Vec::new()),
        }
    }

    fn replace(&mut self, handlers: Vec<Arc<HandlerDescriptor>>) {
        self.handlers = handlers.into();
    }

    fn retain(&mut self, keep: impl Fn(&HandlerDescriptor) -> bool) -> usize {
        let before = self.handlers.len();
        if self.handlers.iter().all(|d| keep(&**d)) {
            return 0;
        }
        let next: Vec<_> = self.handlers.iter().filter(|&d| keep(&**d)).cloned().collect();
        let removed = before - next.len();
        self.replace(next);
        removed
    }

    fn sort(&mut self) {
        let mut next = self.handlers.to_vec();
        sort_by_priority(&mut next);
        self.replace(next);
    }
}

// sort_by_key 是稳定排序，同优先级保持注册顺序
fn sort_by_priority(handlers: &mut [Arc<HandlerDescriptor>]) {
    handlers.sort_by_key(|d| d.priority());
}

pub struct Registry {
    buckets: DashMap<TypeId, Bucket>,
    sorted: AtomicBool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Registry {
    pub fn new(sorted: bool) -> Self {
        Self {
            buckets: DashMap::new(),
            sorted: AtomicBool::new(sorted),
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted.load(Ordering::Acquire)
    }

    /// 切换排序模式；开启时对现有全部 bucket 排序一次
    pub fn set_sorted(&self, sorted: bool) {
        let was = self.sorted.swap(sorted, Ordering::AcqRel);
        if sorted && !was {
            self.sort_all();
        }
    }

    /// 追加到对应 bucket（不存在则创建）；同一处理器已存在时不重复插入
    ///
    /// 写时复制本身就要整体复制 bucket，重复检查与复制同为 O(n)，
    /// 单个事件类型下注册 n 个订阅者的总代价为 O(n²)。
    pub fn insert(&self, descriptor: Arc<HandlerDescriptor>) -> bool {
        let event_type = descriptor.event_type();
        let mut bucket = self
            .buckets
            .entry(event_type.id())
            .or_insert_with(|| Bucket::new(event_type));

        if bucket.handlers.iter().any(|d| d.is_same_site(&descriptor)) {
            return false;
        }

        let mut next = Vec::with_capacity(bucket.handlers.len() + 1);
        next.extend(bucket.handlers.iter().cloned());
        next.push(descriptor);
        if self.is_sorted() {
            sort_by_priority(&mut next);
        }
        bucket.replace(next);
        true
    }

    /// 从所有 bucket 中移除满足条件的描述，返回移除数量
    pub fn remove(&self, predicate: impl Fn(&HandlerDescriptor) -> bool) -> usize {
        let mut removed = 0;
        for mut bucket in self.buckets.iter_mut() {
            removed += bucket.retain(|d| !predicate(d));
        }
        if removed > 0 {
            self.buckets.retain(|_, b| !b.handlers.is_empty());
        }
        removed
    }

    /// 仅在指定事件类型的 bucket 内移除
    pub fn remove_in(
        &self,
        event_type: TypeId,
        predicate: impl Fn(&HandlerDescriptor) -> bool,
    ) -> usize {
        let removed = match self.buckets.get_mut(&event_type) {
            Some(mut bucket) => bucket.retain(|d| !predicate(d)),
            None => return 0,
        };
        self.buckets
            .remove_if(&event_type, |_, b| b.handlers.is_empty());
        removed
    }

    /// 取得 bucket 当前快照；`None` 表示该类型没有任何处理器
    pub fn lookup(&self, event_type: TypeId) -> Option<Snapshot> {
        self.buckets.get(&event_type).map(|b| b.handlers.clone())
    }

    pub fn sort(&self, event_type: TypeId) {
        if let Some(mut bucket) = self.buckets.get_mut(&event_type) {
            bucket.sort();
        }
    }

    pub fn sort_all(&self) {
        for mut bucket in self.buckets.iter_mut() {
            bucket.sort();
        }
    }

    /// 清空某个事件类型的 bucket，返回移除数量
    pub fn clear_type(&self, event_type: TypeId) -> usize {
        self.buckets
            .remove(&event_type)
            .map_or(0, |(_, b)| b.handlers.len())
    }

    pub fn clear(&self) {
        self.buckets.clear();
    }

    pub fn len(&self, event_type: TypeId) -> usize {
        self.buckets.get(&event_type).map_or(0, |b| b.handlers.len())
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.handlers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn event_types(&self) -> Vec<EventType> {
        self.buckets.iter().map(|b| b.event_type).collect()
    }
}
