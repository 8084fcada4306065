use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;

#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub page_count: usize,
    pub metadata: DocumentMetadata,
}

/// Intrinsic page size in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// Height over width; degenerate pages fall back to US letter.
    pub fn aspect_ratio(&self) -> f32 {
        if self.width > 0.0 && self.height > 0.0 {
            self.height / self.width
        } else {
            11.0 / 8.5
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderRequest {
    /// 0-based page index.
    pub page_index: usize,
    /// Target width in pixels; height follows the page's aspect ratio.
    pub width: u32,
}

#[derive(Debug, Clone)]
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub trait DocumentBackend: Send + Sync {
    fn info(&self) -> &DocumentInfo;
    fn page_sizes(&self) -> Result<Vec<PageSize>>;
    fn render_page(&self, request: RenderRequest) -> Result<RenderImage>;
}

#[async_trait::async_trait]
pub trait DocumentProvider: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Arc<dyn DocumentBackend>>;
}

const CACHE_CAPACITY: usize = 8;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
struct CacheKey {
    page_index: usize,
    width: u32,
}

impl CacheKey {
    fn distance(&self, reference_page: usize) -> usize {
        self.page_index.abs_diff(reference_page)
    }
}

/// Rendered page bitmaps keyed by page and width.
///
/// When full, the entries farthest from the page being viewed are evicted.
pub struct PageCache {
    entries: Mutex<HashMap<CacheKey, Arc<RenderImage>>>,
    capacity: usize,
}

impl PageCache {
    pub fn new() -> Self {
        Self::with_capacity(CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn get_or_render(
        &self,
        backend: &dyn DocumentBackend,
        request: RenderRequest,
        reference_page: usize,
    ) -> Result<Arc<RenderImage>> {
        let key = CacheKey {
            page_index: request.page_index,
            width: request.width,
        };
        if let Some(image) = self.entries.lock().get(&key).cloned() {
            return Ok(image);
        }

        let image = Arc::new(backend.render_page(request)?);
        self.store(key, Arc::clone(&image), reference_page);
        Ok(image)
    }

    fn store(&self, key: CacheKey, image: Arc<RenderImage>, reference_page: usize) {
        let mut cache = self.entries.lock();
        cache.insert(key, image);

        if cache.len() > self.capacity {
            let mut keys: Vec<_> = cache.keys().copied().collect();
            keys.sort_by_key(|k| (k.width != key.width, k.distance(reference_page)));
            for stale in keys.into_iter().skip(self.capacity) {
                cache.remove(&stale);
            }
        }
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new()
    }
}
