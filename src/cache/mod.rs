//! A bounded, thread-safe cache of [`LayoutPiece`] values keyed on the text
//! window, direction and paint that produced them.
//!
//! The value store is a [`DashMap`] (lock-striped, safe to hit from every
//! shaping thread concurrently); eviction order is tracked separately in a
//! [`parking_lot`]-guarded [`lru::LruCache`] of keys only, so the hot read
//! path (`get`) never takes the eviction lock unless it also needs to
//! record recency.

use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::layout_piece::{ComputeFlags, LayoutPiece};
use crate::paint::{FontPaint, FontStyle, RenderFlags};
use crate::{LAYOUT_CACHE_CAPACITY, MAX_PIECE_LENGTH};

/// Deep-copied cache key: the text window plus every paint field that
/// affects shaping output. Copying the window (bounded to
/// [`MAX_PIECE_LENGTH`] code units) on every lookup is simpler than a
/// zero-allocation borrowed-key scheme and cheap at that bound.
#[derive(Clone, Debug)]
pub struct LayoutCacheKey {
    text: Vec<u16>,
    is_rtl: bool,
    size_bits: u32,
    style: FontStyle,
    locale: &'static str,
    render_flags: RenderFlags,
    collection_ptr: usize,
}

impl LayoutCacheKey {
    fn build(buf: &[u16], start: usize, limit: usize, is_rtl: bool, paint: &FontPaint) -> Self {
        Self {
            text: buf[start..limit].to_vec(),
            is_rtl,
            size_bits: paint.size().to_bits(),
            style: paint.style,
            locale: paint.locale,
            render_flags: paint.render_flags,
            collection_ptr: Arc::as_ptr(&paint.font_collection) as usize,
        }
    }
}

impl PartialEq for LayoutCacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
            && self.is_rtl == other.is_rtl
            && self.size_bits == other.size_bits
            && self.style == other.style
            && self.locale == other.locale
            && self.render_flags == other.render_flags
            && self.collection_ptr == other.collection_ptr
    }
}

impl Eq for LayoutCacheKey {}

impl Hash for LayoutCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
        self.is_rtl.hash(state);
        self.size_bits.hash(state);
        self.style.hash(state);
        self.locale.hash(state);
        self.render_flags.hash(state);
        self.collection_ptr.hash(state);
    }
}

/// Bounded, thread-safe cache from [`LayoutCacheKey`] to a shaped
/// [`LayoutPiece`]. Windows longer than [`MAX_PIECE_LENGTH`] bypass the
/// cache entirely (both the deep-copy cost and the chance of reuse fall
/// off past word length).
pub struct LayoutCache {
    entries: DashMap<LayoutCacheKey, Arc<LayoutPiece>, ahash::RandomState>,
    order: Mutex<LruCache<LayoutCacheKey, ()>>,
}

impl LayoutCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            entries: DashMap::with_hasher(ahash::RandomState::default()),
            order: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the cached piece for this window/paint/direction if it
    /// already covers `flags`; otherwise invokes `shape` with whatever
    /// entry is cached (as a hint to splice from, possibly none) and
    /// stores the freshly built piece. Two threads racing to shape the
    /// same window just redo a little work — the later `insert` wins and
    /// neither ever observes a torn entry.
    pub fn get_or_shape<F>(
        &self,
        buf: &[u16],
        start: usize,
        limit: usize,
        is_rtl: bool,
        paint: &FontPaint,
        flags: ComputeFlags,
        shape: F,
    ) -> Arc<LayoutPiece>
    where
        F: FnOnce(Option<&LayoutPiece>) -> LayoutPiece,
    {
        if limit - start > MAX_PIECE_LENGTH {
            return Arc::new(shape(None));
        }

        let key = LayoutCacheKey::build(buf, start, limit, is_rtl, paint);

        let existing = self.entries.get(&key).map(|e| e.value().clone());
        if let Some(hit) = &existing {
            if hit.computed.contains(flags) {
                self.order.lock().get(&key);
                return hit.clone();
            }
        }

        let piece = Arc::new(shape(existing.as_deref()));
        self.insert(key, piece.clone());
        piece
    }

    fn insert(&self, key: LayoutCacheKey, piece: Arc<LayoutPiece>) {
        self.entries.insert(key.clone(), piece);
        let mut order = self.order.lock();
        if let Some((evicted_key, _)) = order.push(key.clone(), ()) {
            if evicted_key != key {
                log::trace!("evicting layout cache entry for a {}-unit window", evicted_key.text.len());
                self.entries.remove(&evicted_key);
            }
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.order.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Process-wide cache, built on first access and swappable thereafter
/// without ever blocking a reader on a lock (`Lazy` gives the one-time
/// double-checked construction, `ArcSwap` gives the lock-free swap).
static GLOBAL_CACHE: Lazy<ArcSwap<LayoutCache>> =
    Lazy::new(|| ArcSwap::from_pointee(LayoutCache::new(LAYOUT_CACHE_CAPACITY)));

/// Borrows the process-wide [`LayoutCache`], initialising it on first call.
pub fn global() -> Arc<LayoutCache> {
    GLOBAL_CACHE.load_full()
}

/// Atomically replaces the process-wide cache with an empty one of the
/// given capacity. Callers already holding an `Arc` from a prior [`global`]
/// call keep using that instance until they call [`global`] again.
pub fn reset_global(capacity: usize) {
    GLOBAL_CACHE.store(Arc::new(LayoutCache::new(capacity)));
}
