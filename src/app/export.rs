use std::{fs, io, path::PathBuf};

use chrono::NaiveDateTime;
use image::{RgbaImage, codecs::png::PngEncoder};
use thiserror::Error;

#[derive(Debug)]
pub enum ExportOutcome {
    Saved(PathBuf),
    /// The user dismissed the save dialog; not an error, nothing was written.
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Derive the export filename. With a cover file present its stem is reused:
/// `<stem>_thumb_<YYYYMMDDHHmm>.png`; otherwise `thumbnail_<epoch-ms>.png`.
pub fn derive_file_name(cover_name: Option<&str>, now: NaiveDateTime) -> String {
    match cover_name {
        Some(name) => format!("{}_thumb_{}.png", stem(name), now.format("%Y%m%d%H%M")),
        None => format!("thumbnail_{}.png", now.and_utc().timestamp_millis()),
    }
}

/// Strip exactly the final `.suffix`, if any.
fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < name.len() => &name[..dot],
        _ => name,
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    image.write_with_encoder(PngEncoder::new(&mut bytes))?;
    Ok(bytes)
}

/// Interactive save: a PNG-filtered dialog pre-filled with the derived name.
/// Cancelling is a silent no-op. A failed write falls back to the user's
/// download directory so export still succeeds once bytes are in hand.
pub fn save(file_name: &str, bytes: &[u8]) -> Result<ExportOutcome, ExportError> {
    let Some(path) = rfd::FileDialog::new()
        .set_title("save thumbnail")
        .add_filter("PNG Images", &["png"])
        .set_file_name(file_name)
        .save_file()
    else {
        return Ok(ExportOutcome::Cancelled);
    };

    match fs::write(&path, bytes) {
        Ok(()) => Ok(ExportOutcome::Saved(path)),
        Err(err) => {
            log::error!(
                "writing {} failed ({err}), falling back to download directory",
                path.display()
            );
            fallback_download(file_name, bytes)
        }
    }
}

fn fallback_download(file_name: &str, bytes: &[u8]) -> Result<ExportOutcome, ExportError> {
    let dir = dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let path = dir.join(file_name);
    match fs::write(&path, bytes) {
        Ok(()) => Ok(ExportOutcome::Saved(path)),
        Err(source) => Err(ExportError::Write { path, source }),
    }
}
