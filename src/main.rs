//! Demo driver for the thumbnail pipeline
//!
//! Scans a folder for images, requests a thumbnail for each of them
//! and drains the event channel the way the UI event loop would.

use std::path::{Path, PathBuf};
use std::time::Duration;

use walkdir::WalkDir;

use photo_organizer::{
    AssetKey, Priority, RequestorId, Settings, ThumbnailEvent, ThumbnailService,
};

/// Image file extensions the organizer picks up during a scan
const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp"];

fn main() {
    let folder = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .expect("Usage: photo-organizer <folder>");

    println!("🔍 Scanning folder: {}", folder.display());
    let assets = scan_folder(&folder);
    if assets.is_empty() {
        println!("No images found under {}", folder.display());
        return;
    }
    println!("⏳ Generating thumbnails for {} images...", assets.len());

    let settings = Settings::default();
    let (mut service, events) = ThumbnailService::with_file_decoder(settings);

    for (id, key) in assets.iter().enumerate() {
        service.request_thumbnail(RequestorId(id as u64), key.clone(), 0, Priority::Low, false);
    }

    let mut generated = 0usize;
    let mut failed = 0usize;
    for _ in 0..assets.len() {
        match events.recv_timeout(Duration::from_secs(60)) {
            Ok(ThumbnailEvent::Ready { thumbnail, .. }) => {
                generated += 1;
                if generated % 100 == 0 {
                    println!("⏳ Generated {} thumbnails...", generated);
                }
                let _ = thumbnail; // a real UI would hand this to the grid view
            }
            Ok(ThumbnailEvent::Failed { message, .. }) => {
                failed += 1;
                eprintln!("⚠️  {}", message);
            }
            Err(_) => {
                eprintln!("❌ Timed out waiting for thumbnail results");
                break;
            }
        }
    }

    let stats = service.cache_stats();
    println!(
        "✅ Done: {} thumbnails generated, {} failed",
        generated, failed
    );
    println!(
        "📊 Cache: {} decoded images held, {:.1}% hit rate, {} evictions",
        service.cached_image_count(),
        stats.hit_rate(),
        stats.evictions
    );

    service.shutdown();
}

/// Walk the directory tree and collect everything that looks like an
/// image file.
fn scan_folder(folder: &Path) -> Vec<AssetKey> {
    let mut assets = Vec::new();
    for entry in WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(extension) = path.extension() else {
            continue;
        };
        let ext = extension.to_string_lossy().to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            assets.push(AssetKey::from(path));
        }
    }
    assets
}
