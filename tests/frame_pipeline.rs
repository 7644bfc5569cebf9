// 头像帧完整流程集成测试
//
// 覆盖：上传 → 裁剪 → 合成 → 导出，以及换图、过期解码丢弃、导出落盘。

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};
use profile_frame::frame::{
    CANVAS_SIZE, CropRectangle, DirectorySink, EXPORT_FILENAME, FrameConfig, FrameError, FrameEvent, FrameHandler,
    FrameServiceState, FrameStage, ImageAsset, ImageSource, OVERLAY_PLACEMENT, ResampleProfile, TemplateOverlay,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn png_bytes(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, color);
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png).expect("png encode failed");
    cursor.into_inner()
}

/// 1200×400 模板：上半透明，下半不透明品牌色。
fn overlay() -> Arc<TemplateOverlay> {
    let img = RgbaImage::from_fn(1200, 400, |_, y| {
        if y < 200 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([0, 80, 160, 255])
        }
    });
    let asset = ImageAsset::from_rgba(img).expect("template should build");
    Arc::new(TemplateOverlay::from_asset(&asset))
}

fn handler_with(width: u32, height: u32) -> FrameHandler {
    let mut handler = FrameHandler::new(FrameConfig::default(), overlay());
    let photo = ImageAsset::from_rgba(RgbaImage::from_pixel(width, height, Rgba([220, 30, 30, 255])))
        .expect("photo should build");
    handler.replace_photo(Arc::new(photo));
    handler
}

#[test]
fn largest_centered_square_at_zoom_one() {
    init_logger();
    let mut handler = handler_with(2000, 1500);

    handler.set_zoom(1.0).expect("zoom should apply");
    handler.confirm().expect("confirm should succeed");

    assert_eq!(handler.confirmed_rectangle(), Some(CropRectangle::square(250, 0, 1500)));
    let cropped = handler.cropped().expect("cropped raster should exist");
    assert_eq!(cropped.pixels().dimensions(), (CANVAS_SIZE, CANVAS_SIZE));
}

#[test]
fn max_zoom_at_top_left_clamps_to_origin() {
    init_logger();
    let mut handler = handler_with(2000, 1500);

    handler.set_zoom(3.0).expect("zoom should apply");
    let rect = handler.set_pan(-10_000.0, -10_000.0).expect("pan should apply");

    assert_eq!(rect, CropRectangle::square(0, 0, 500));
}

#[test]
fn replacing_photo_after_composite_resets_to_loaded() {
    init_logger();
    let mut handler = handler_with(800, 600);
    handler.set_zoom(1.5).expect("zoom should apply");
    let first = handler.confirm().expect("confirm should succeed");
    assert_eq!(handler.stage(), FrameStage::Composited);

    handler
        .load(ImageSource::Bytes(png_bytes(320, 480, Rgba([10, 200, 10, 255]))))
        .expect("load should succeed");

    assert_eq!(handler.stage(), FrameStage::Loaded);
    assert!(handler.composited().is_none());
    assert!(matches!(handler.encode_current(EXPORT_FILENAME), Err(FrameError::NothingToExport)));
    assert_eq!(handler.session().asset().map(|a| a.natural_height()), Some(480));
    // 旧合成图只剩测试持有的引用
    assert_eq!(Arc::strong_count(&first), 1);
}

#[test]
fn export_decodes_back_to_canvas_sized_png() {
    init_logger();
    let mut handler = handler_with(640, 640);
    handler.set_zoom(1.0).expect("zoom should apply");
    handler.confirm().expect("confirm should succeed");

    let file = handler.encode_current(EXPORT_FILENAME).expect("export should succeed");

    assert_eq!(file.filename, "facebook-profile.png");
    assert_eq!(file.mime_type, "image/png");
    let decoded = image::load_from_memory_with_format(&file.bytes, ImageFormat::Png).expect("png should decode");
    assert_eq!(decoded.dimensions(), (CANVAS_SIZE, CANVAS_SIZE));
}

#[test]
fn overlay_lands_at_fixed_position_regardless_of_aspect() {
    init_logger();
    let placement_row = (OVERLAY_PLACEMENT.y + 300) as u32;

    for (w, h) in [(3000, 200), (200, 3000), (500, 500)] {
        let mut handler = handler_with(w, h);
        handler.set_resample_profile(ResampleProfile::Speed).expect("profile should apply");
        handler.set_zoom(2.0).expect("zoom should apply");
        let out = handler.confirm().expect("confirm should succeed");

        // 模板下半部分不透明，覆盖照片
        assert_eq!(*out.pixels().get_pixel(0, placement_row), Rgba([0, 80, 160, 255]));
        assert_eq!(*out.pixels().get_pixel(CANVAS_SIZE - 1, placement_row), Rgba([0, 80, 160, 255]));
        // 模板透明区域与模板上方均露出照片
        assert_eq!(*out.pixels().get_pixel(540, 100), Rgba([220, 30, 30, 255]));
        assert_eq!(*out.pixels().get_pixel(540, OVERLAY_PLACEMENT.y as u32 + 10), Rgba([220, 30, 30, 255]));
    }
}

#[test]
fn same_inputs_produce_identical_bytes() {
    init_logger();
    let export_once = || {
        let mut handler = handler_with(900, 700);
        handler.set_zoom(1.7).expect("zoom should apply");
        handler.set_pan(35.0, -12.0).expect("pan should apply");
        handler.confirm().expect("confirm should succeed");
        handler.encode_current(EXPORT_FILENAME).expect("export should succeed").bytes
    };

    assert_eq!(export_once(), export_once());
}

#[tokio::test]
async fn superseded_decode_is_discarded() {
    init_logger();
    let service = FrameServiceState::with_overlay(FrameConfig::default(), overlay());
    let loaded = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loaded);
    service
        .subscribe(move |event| {
            if matches!(event, FrameEvent::ImageLoaded { .. }) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .expect("subscribe should succeed");

    let (a, b) = tokio::join!(
        service.load(ImageSource::Bytes(png_bytes(300, 200, Rgba([1, 1, 1, 255])))),
        service.load(ImageSource::Bytes(png_bytes(200, 300, Rgba([2, 2, 2, 255])))),
    );

    // 先领取票据的请求一定过期，无论哪个先解码完成
    let cancelled = [&a, &b].iter().filter(|r| matches!(r, Err(FrameError::Cancelled(_)))).count();
    let succeeded = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!((cancelled, succeeded), (1, 1));
    assert_eq!(loaded.load(Ordering::SeqCst), 1);
    assert_eq!(service.stage().expect("stage should read"), FrameStage::Loaded);
}

#[tokio::test]
async fn service_exports_into_download_directory() {
    init_logger();
    let root = tempfile::tempdir().expect("tempdir failed");
    let sink = DirectorySink::new(root.path().join("downloads"));
    let service = FrameServiceState::with_overlay(FrameConfig::default(), overlay());

    let events = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&events);
    service
        .subscribe(move |event| {
            if let Ok(mut guard) = log.lock() {
                guard.push(event.to_payload().kind);
            }
        })
        .expect("subscribe should succeed");

    assert!(matches!(service.export(&sink).await, Err(FrameError::NothingToExport)));

    service
        .load(ImageSource::Bytes(png_bytes(500, 400, Rgba([90, 90, 90, 255]))))
        .await
        .expect("load should succeed");
    service.set_viewport(250.0).expect("viewport should apply");
    service.pan_by_display(20.0, 0.0).expect("pan should apply");
    service.confirm().expect("confirm should succeed");
    let file = service.export(&sink).await.expect("export should succeed");

    let written = std::fs::read(root.path().join("downloads").join(EXPORT_FILENAME)).expect("file should exist");
    assert_eq!(written, file.bytes);
    assert_eq!(service.stage().expect("stage should read"), FrameStage::Exported);

    let kinds = events.lock().expect("events lock poisoned").clone();
    assert_eq!(
        kinds,
        vec!["failed", "image-loaded", "rectangle-changed", "rectangle-changed", "composited", "exported"]
    );
}
