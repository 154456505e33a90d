//! Integration tests for the page → crop → card pipeline.
//!
//! These run without a pdfium library: PDF pages come from an in-memory
//! decoder built on the public `DocumentDecoder` trait, and image inputs use
//! the real PNG path.

use futures::StreamExt;
use image::{ImageFormat, Rgba, RgbaImage};
use pdf2card::pipeline::decoder::decoder_for;
use pdf2card::pipeline::input::load_input;
use pdf2card::raster::scaled_size;
use pdf2card::{
    build_card, build_card_from_source, generate_thumbnails, rasterize_source_stream, CardJob, CardMakerError,
    CardMetadata, Completion, DocumentDecoder, OpenDocument, PageRasterizer, PipelineConfig,
    Point, RasterImage, RenderProgressCallback, SourceDocument, ThemeKey, ThumbnailError,
    ThumbnailGenerator, Workbench,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library logs to the test harness (`RUST_LOG=pdf2card=debug`).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A4-sized pages in points; listed pages fail to render.
struct ExamDecoder {
    pages: usize,
    broken: Vec<usize>,
}

struct ExamDocument<'a>(&'a ExamDecoder);

impl DocumentDecoder for ExamDecoder {
    fn open<'a>(
        &'a self,
        _name: &str,
        _bytes: &'a [u8],
    ) -> Result<Box<dyn OpenDocument + 'a>, CardMakerError> {
        Ok(Box::new(ExamDocument(self)))
    }
}

impl OpenDocument for ExamDocument<'_> {
    fn page_count(&self) -> usize {
        self.0.pages
    }

    fn page_size(&self, index: usize) -> Result<(f32, f32), CardMakerError> {
        if index >= self.0.pages {
            return Err(CardMakerError::PageOutOfRange {
                page: index + 1,
                total: self.0.pages,
            });
        }
        Ok((595.0, 842.0))
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<RasterImage, CardMakerError> {
        let (w, h) = self.page_size(index)?;
        if self.0.broken.contains(&index) {
            return Err(CardMakerError::Decode {
                page: index,
                detail: "bad xref entry".into(),
            });
        }
        let (pw, ph) = scaled_size(w, h, scale)?;
        // White page with a dark block standing in for printed text.
        let mut img = RgbaImage::from_pixel(pw, ph, Rgba([255, 255, 255, 255]));
        for y in ph / 4..ph / 2 {
            for x in pw / 8..pw * 7 / 8 {
                img.put_pixel(x, y, Rgba([20, 20, 20, 255]));
            }
        }
        Ok(RasterImage::new(img))
    }
}

fn exam(pages: usize) -> Arc<dyn DocumentDecoder> {
    Arc::new(ExamDecoder {
        pages,
        broken: vec![],
    })
}

fn pdf_source() -> SourceDocument {
    SourceDocument::from_bytes("2025_수능_수학.pdf", b"%PDF-1.7\n%fake".to_vec()).unwrap()
}

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    RgbaImage::from_pixel(w, h, Rgba([240, 240, 240, 255]))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

#[derive(Default)]
struct Counter {
    started: AtomicUsize,
    rendered: AtomicUsize,
    failed: AtomicUsize,
}

impl RenderProgressCallback for Counter {
    fn on_render_start(&self, _total: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_page_rendered(&self, _page: usize, _total: usize, _w: u32, _h: u32) {
        self.rendered.fetch_add(1, Ordering::SeqCst);
    }
    fn on_page_failed(&self, _page: usize, _total: usize, _error: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Rasterisation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn pages_render_at_scale_in_order() {
    let pages = PageRasterizer::new(exam(3), &PipelineConfig::default())
        .rasterize(&pdf_source())
        .await
        .unwrap();
    assert_eq!(pages.len(), 3);
    for (i, p) in pages.iter().enumerate() {
        assert_eq!(p.index, i);
        assert_eq!((p.image.width(), p.image.height()), (1190, 1684));
        assert_eq!(p.label, format!("페이지 {}", i + 1));
    }
}

#[tokio::test]
async fn broken_page_aborts_with_its_index() {
    let counter = Arc::new(Counter::default());
    let config = PipelineConfig::builder()
        .render_scale(0.5)
        .thumbnail_scale(0.1)
        .progress_callback(counter.clone())
        .build()
        .unwrap();
    let decoder = Arc::new(ExamDecoder {
        pages: 4,
        broken: vec![2],
    });
    let err = PageRasterizer::new(decoder, &config)
        .rasterize(&pdf_source())
        .await
        .unwrap_err();
    assert!(matches!(err, CardMakerError::Decode { page: 2, .. }));
    assert_eq!(counter.rendered.load(Ordering::SeqCst), 2);
    assert_eq!(counter.failed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn thumbnails_mark_broken_pages_and_continue() {
    let decoder = Arc::new(ExamDecoder {
        pages: 4,
        broken: vec![1],
    });
    let thumbs = ThumbnailGenerator::new(decoder, &PipelineConfig::default())
        .generate(&pdf_source())
        .await
        .unwrap();
    assert_eq!(thumbs.len(), 4);
    assert!(matches!(
        thumbs[1].result,
        Err(ThumbnailError::RenderFailed { page: 1, .. })
    ));
    for i in [0, 2, 3] {
        let t = thumbs[i].result.as_ref().unwrap();
        assert_eq!((t.width, t.height), (179, 253));
        assert!(t.data_url().starts_with("data:image/jpeg;base64,"));
    }
}

#[tokio::test]
async fn stream_delivers_pages_as_rendered() {
    let stream = rasterize_source_stream(exam(3), pdf_source(), &PipelineConfig::default());
    let indices: Vec<usize> = stream.map(|p| p.unwrap().index).collect().await;
    assert_eq!(indices, vec![0, 1, 2]);
}

// ── Image input ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn png_input_is_a_single_labelled_page() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("문제22.png");
    std::fs::write(&path, png_bytes(300, 200)).unwrap();

    let config = PipelineConfig::builder().render_scale(1.0).build().unwrap();
    let source = load_input(&path).await.unwrap();
    let decoder = decoder_for(&source, &config).unwrap();
    let pages = PageRasterizer::new(decoder, &config)
        .rasterize(&source)
        .await
        .unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].label, "문제22.png");
    assert_eq!((pages[0].image.width(), pages[0].image.height()), (300, 200));
}

#[tokio::test]
async fn png_file_to_card() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.png");
    std::fs::write(&path, png_bytes(800, 600)).unwrap();

    let config = PipelineConfig::builder().render_scale(1.0).build().unwrap();
    let job = CardJob {
        crops: vec!["1:0,0,672,300".parse().unwrap()],
        metadata: CardMetadata {
            problem_number: 30,
            theme_key: ThemeKey::Warm,
            ..CardMetadata::default()
        },
        trim: false,
    };
    let out = build_card(&path, &job, &config).await.unwrap();
    assert_eq!((out.merged.width(), out.merged.height()), (672, 300));
    // 82 header + 20 + 300 + 20 image panel + 1 + 56 + 50 + 40
    assert_eq!((out.card.width(), out.card.height()), (720, 569));
    assert_eq!(out.file_name, "수능_2025_30번_카드.png");
}

#[test]
fn png_thumbnail_outside_async_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.png");
    std::fs::write(&path, png_bytes(1000, 500)).unwrap();

    let thumbs = tokio_test::block_on(generate_thumbnails(&path, &PipelineConfig::default())).unwrap();
    assert_eq!(thumbs.len(), 1);
    let t = thumbs[0].result.as_ref().unwrap();
    assert_eq!((t.width, t.height), (300, 150));
    assert_eq!(thumbs[0].label, "scan.png");
}

#[tokio::test]
async fn unsupported_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"just text").unwrap();
    let err = load_input(&path).await.unwrap_err();
    assert!(matches!(err, CardMakerError::UnsupportedInput { .. }));

    let missing = load_input(dir.path().join("nope.pdf")).await.unwrap_err();
    assert!(matches!(missing, CardMakerError::FileNotFound { .. }));
}

// ── Cards ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn problem_across_two_pages_stacks_in_confirmation_order() {
    let config = PipelineConfig::builder().render_scale(1.0).build().unwrap();
    let job = CardJob {
        crops: vec!["2:50,100,400,200".parse().unwrap(), "1:50,100,300,120".parse().unwrap()],
        ..CardJob::default()
    };
    let out = build_card_from_source(exam(2), &pdf_source(), &job, &config)
        .await
        .unwrap();
    assert_eq!(out.crops[0].source_page_index, 1);
    assert_eq!(out.crops[1].source_page_index, 0);
    assert_eq!((out.merged.width(), out.merged.height()), (400, 200 + 16 + 120));
    // narrower crop is centred: (400 - 300 + 1) / 2 = 50
    let px = out.merged.pixels();
    assert_eq!(px.get_pixel(49, 216 + 60).0, [255, 255, 255, 255]);
    // page x 74 (start of the dark block) lands at 50 + 24
    assert_eq!(px.get_pixel(74, 216 + 115).0, [20, 20, 20, 255]);
    assert_eq!(px.get_pixel(73, 216 + 115).0, [255, 255, 255, 255]);
}

#[tokio::test]
async fn trimming_removes_page_margins() {
    let config = PipelineConfig::builder().render_scale(1.0).build().unwrap();
    let job = CardJob {
        crops: vec!["1:0,0,595,842".parse().unwrap()],
        trim: true,
        ..CardJob::default()
    };
    let out = build_card_from_source(exam(1), &pdf_source(), &job, &config)
        .await
        .unwrap();
    // dark block spans x 74..520, y 210..421; plus 20 px padding each side
    assert_eq!(out.merged.width(), 520 - 74 + 40);
    assert_eq!(out.merged.height(), 421 - 210 + 40);
}

// ── Interactive workbench ────────────────────────────────────────────────────

#[tokio::test]
async fn workbench_session_end_to_end() {
    init_tracing();
    let config = PipelineConfig::builder().render_scale(1.0).build().unwrap();
    let pages = PageRasterizer::new(exam(2), &config)
        .rasterize(&pdf_source())
        .await
        .unwrap();

    let mut wb = Workbench::new(config).unwrap();
    wb.add_pages(pages);
    assert_eq!(wb.pages().len(), 2);

    // first upload shows page 1; drag a selection and confirm
    assert!(wb.pointer_down(Point::new(40.0, 200.0)));
    wb.pointer_move(Point::new(560.0, 430.0));
    wb.pointer_up();
    assert_eq!(wb.tracker().native_size(), Some((520, 230)));
    wb.confirm_crop().unwrap();

    let request = wb.select_page(1).unwrap();
    assert_eq!(wb.finish_preview(request.ticket, request.run()), Completion::Applied);

    assert!(wb.pointer_down(Point::new(40.0, 10.0)));
    wb.pointer_move(Point::new(560.0, 110.0));
    wb.pointer_leave();
    wb.confirm_crop().unwrap();

    let merged = wb.merged().unwrap();
    assert_eq!((merged.width(), merged.height()), (520, 230 + 16 + 100));

    assert_eq!(wb.regenerate_card().await.unwrap(), Completion::Applied);
    let first = wb.card().unwrap().clone();

    let dark = CardMetadata {
        theme_key: ThemeKey::Dark,
        ..wb.metadata().clone()
    };
    wb.set_metadata(dark);
    assert!(wb.card_is_stale());
    wb.regenerate_card().await.unwrap();
    assert_ne!(wb.card().unwrap(), &first);
    assert_eq!(wb.card().unwrap().height(), first.height());
}
