//! 释义缓存模块
//!
//! 页面生命周期内的LRU释义缓存，避免同一术语重复请求网关。

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::annotate::config::constants::DEFINITION_CACHE_SIZE;
use crate::annotate::gateway::DefineResult;

/// 缓存统计
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// 术语释义的内存缓存
pub struct DefinitionCache {
    entries: LruCache<String, DefineResult>,
    stats: CacheStats,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFINITION_CACHE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    /// 查缓存，术语按原样（区分大小写）做键
    pub fn get(&mut self, term: &str) -> Option<DefineResult> {
        match self.entries.get(term) {
            Some(result) => {
                self.stats.hits += 1;
                Some(result.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, term: String, result: DefineResult) {
        self.entries.put(term, result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl Default for DefinitionCache {
    fn default() -> Self {
        Self::new()
    }
}
