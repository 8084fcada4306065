use std::convert::TryFrom;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use image::RgbaImage;
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use resume_core::{
    DocumentBackend, DocumentInfo, DocumentMetadata, DocumentProvider, PageSize, RenderImage,
    RenderRequest, RendererConfig,
};
use tracing::{debug, info, instrument, warn};

/// Pdfium-backed document provider.
///
/// Built once at start-up from an explicit [`RendererConfig`] and shared by
/// every document it opens; nothing about the engine lives in global state.
pub struct PdfiumRenderFactory {
    pdfium: Arc<Pdfium>,
}

impl PdfiumRenderFactory {
    pub fn new(config: &RendererConfig) -> Result<Self> {
        let pdfium = match config.library_path.as_deref() {
            Some(path) => bind_pdfium_at(path)?,
            None => bind_pdfium_default()?,
        };
        Ok(Self {
            pdfium: Arc::new(pdfium),
        })
    }
}

#[async_trait]
impl DocumentProvider for PdfiumRenderFactory {
    async fn open(&self, path: &Path) -> Result<Arc<dyn DocumentBackend>> {
        let absolute = path
            .canonicalize()
            .with_context(|| format!("failed to resolve path for {:?}", path))?;
        let document = PdfiumDocument::new(Arc::clone(&self.pdfium), absolute)?;
        Ok(Arc::new(document))
    }
}

struct PdfiumDocument {
    // Declared before `_pdfium` so it is dropped first.
    document: Mutex<PdfDocument<'static>>,
    info: DocumentInfo,
    page_sizes: Vec<PageSize>,
    _pdfium: Arc<Pdfium>,
}

impl PdfiumDocument {
    fn new(pdfium: Arc<Pdfium>, path: PathBuf) -> Result<Self> {
        let document = pdfium
            .load_pdf_from_file(&path, None)
            .with_context(|| format!("failed to open {:?}", path))?;
        // SAFETY: the document borrows the bindings inside `_pdfium`, which this
        // struct keeps alive in an `Arc` and drops after `document`.
        let document = unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };

        let info = read_document_info(&document, &path);
        let page_sizes = read_page_sizes(&document);
        info!(
            path = %path.display(),
            pages = info.page_count,
            title = info.metadata.title.as_deref().unwrap_or(""),
            author = info.metadata.author.as_deref().unwrap_or(""),
            keywords = %info.metadata.keywords.join(", "),
            "opened pdf"
        );

        Ok(Self {
            document: Mutex::new(document),
            info,
            page_sizes,
            _pdfium: pdfium,
        })
    }

    fn render_internal(
        &self,
        document: &PdfDocument<'_>,
        request: &RenderRequest,
    ) -> Result<RenderImage> {
        let page_index: PdfPageIndex = request
            .page_index
            .try_into()
            .map_err(|_| anyhow!("page {} is out of supported range", request.page_index))?;
        let page = document
            .pages()
            .get(page_index)
            .with_context(|| format!("page {} out of range", request.page_index))?;

        let width = i32::try_from(request.width.max(1)).unwrap_or(i32::MAX);
        let config = PdfRenderConfig::new()
            .set_target_width(width)
            .render_form_data(true)
            .render_annotations(true);
        let bitmap = page
            .render_with_config(&config)
            .with_context(|| format!("failed to render page {}", request.page_index))?;
        let image: RgbaImage = bitmap.as_image().to_rgba8();
        let (width, height) = image.dimensions();

        Ok(RenderImage {
            width,
            height,
            pixels: image.into_raw(),
        })
    }
}

impl DocumentBackend for PdfiumDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    fn page_sizes(&self) -> Result<Vec<PageSize>> {
        Ok(self.page_sizes.clone())
    }

    #[instrument(skip(self))]
    fn render_page(&self, request: RenderRequest) -> Result<RenderImage> {
        let document = self.document.lock();
        let image = self.render_internal(&document, &request)?;
        debug!(width = image.width, height = image.height, "rendered page");
        Ok(image)
    }
}

fn read_document_info(document: &PdfDocument<'_>, path: &Path) -> DocumentInfo {
    let page_count = usize::try_from(document.pages().len()).unwrap_or_default();
    let metadata = document.metadata();

    let title = metadata
        .get(PdfDocumentMetadataTagType::Title)
        .map(|t| t.value().to_owned());
    let author = metadata
        .get(PdfDocumentMetadataTagType::Author)
        .map(|t| t.value().to_owned());
    let keywords = metadata
        .get(PdfDocumentMetadataTagType::Keywords)
        .map(|t| split_keywords(t.value()))
        .unwrap_or_default();

    DocumentInfo {
        path: path.to_path_buf(),
        page_count,
        metadata: DocumentMetadata {
            title,
            author,
            keywords,
        },
    }
}

fn read_page_sizes(document: &PdfDocument<'_>) -> Vec<PageSize> {
    document
        .pages()
        .iter()
        .map(|page| PageSize {
            width: page.width().value,
            height: page.height().value,
        })
        .collect()
}

fn split_keywords(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .map(str::to_owned)
        .collect()
}

pub type PdfRenderFactory = PdfiumRenderFactory;

fn bind_pdfium_at(path: &Path) -> Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(path)
        .map_err(|err| anyhow!("failed to load pdfium from {}: {}", path.display(), err))?;
    Ok(Pdfium::new(bindings))
}

fn bind_pdfium_default() -> Result<Pdfium> {
    let mut errors = Vec::new();

    let cwd_path = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&cwd_path) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => {
            warn!(path = %cwd_path.display(), %err, "no pdfium next to the binary");
            errors.push(format!("{}: {}", cwd_path.display(), err));
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; install it or set renderer.library_path ({})",
                errors.join(", ")
            ))
        }
    }
}
