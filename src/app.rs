mod compose;
mod export;
mod gui;
mod preset;

use std::fs;
use std::path::Path;

use image::RgbaImage;

use crate::app::compose::Surface;
use crate::app::export::ExportOutcome;
use crate::app::preset::{BUILTIN_SLOTS, PresetStore, SlotError, SlotKind, TOTAL_SLOTS};

/// The uploaded cover raster plus its original filename, kept for export
/// naming. Not persisted across sessions.
pub struct CoverImage {
    image: RgbaImage,
    file_name: String,
}

/// All mutable application state, owned in one place and threaded through the
/// gallery, compositor and exporter explicitly.
pub struct ThumbPaneApp {
    store: PresetStore,
    selected_slot: Option<u8>,
    background: Option<RgbaImage>,
    cover: Option<CoverImage>,
    surface: Surface,

    /// Slot number the next registration writes to.
    register_slot: u8,
    /// Modal message for validation failures and confirmations.
    notice: Option<String>,

    // egui texture caches, rebuilt lazily after state changes
    preview_tex: Option<egui::TextureHandle>,
    thumb_cache: Vec<Option<egui::TextureHandle>>,
}

impl ThumbPaneApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        ThumbPaneApp {
            store: PresetStore::load(cc.storage),
            selected_slot: None,
            background: None,
            cover: None,
            surface: compose::compose(None, None),
            register_slot: BUILTIN_SLOTS + 1,
            notice: None,
            preview_tex: None,
            thumb_cache: vec![None; TOTAL_SLOTS as usize],
        }
    }

    /// Full recompose of the output surface from the current state. Runs
    /// after every change to the selection or the cover.
    fn redraw(&mut self) {
        self.surface = compose::compose(
            self.background.as_ref(),
            self.cover.as_ref().map(|c| &c.image),
        );
        self.preview_tex = None;
    }

    /// Decode the raster backing a slot: bundled bytes for built-ins, the
    /// stored payload for registered slots, `None` for empty ones.
    fn decode_slot(&self, slot: u8) -> Option<Result<RgbaImage, SlotError>> {
        match self.store.kind(slot) {
            SlotKind::Builtin => preset::builtin_background(slot).map(|bytes| {
                image::load_from_memory(bytes)
                    .map(|img| img.to_rgba8())
                    .map_err(SlotError::from)
            }),
            SlotKind::UserRegistered => self.store.get(slot).map(preset::decode_payload),
            SlotKind::Empty => None,
        }
    }

    /// Exclusive selection: picking a slot replaces any previous selection.
    /// Decoding finishes before the recompose that depends on it.
    fn select_background(&mut self, slot: u8) {
        match self.decode_slot(slot) {
            Some(Ok(img)) => {
                self.selected_slot = Some(slot);
                self.background = Some(img);
                self.redraw();
            }
            Some(Err(err)) => {
                log::warn!("slot {slot} failed to decode: {err}");
                self.notice = Some(format!("could not load background: {err}"));
            }
            // Empty slots show a placeholder and are not selectable.
            None => {}
        }
    }

    fn register_background(&mut self, slot: u8, path: &Path) -> Result<(), String> {
        let bytes =
            fs::read(path).map_err(|err| format!("could not read {}: {err}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        self.store
            .register(slot, &bytes, preset::mime_for_extension(ext))
            .map_err(|err| err.to_string())?;
        self.thumb_cache[slot as usize - 1] = None;
        if self.selected_slot == Some(slot) {
            // The selection holds a decoded copy; refresh it from the store.
            self.select_background(slot);
        }
        Ok(())
    }

    fn set_cover(&mut self, path: &Path) {
        match image::open(path) {
            Ok(img) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "cover".to_owned());
                self.cover = Some(CoverImage {
                    image: img.to_rgba8(),
                    file_name,
                });
                self.redraw();
            }
            Err(err) => self.notice = Some(format!("failed to load image: {err}")),
        }
    }

    fn export(&mut self) {
        if self.background.is_none() && self.cover.is_none() {
            self.notice = Some("select a background or cover image first".to_owned());
            return;
        }
        let file_name = export::derive_file_name(
            self.cover.as_ref().map(|c| c.file_name.as_str()),
            chrono::Local::now().naive_local(),
        );
        let bytes = match export::encode_png(self.surface.image()) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("export encoding failed: {err}");
                self.notice = Some(err.to_string());
                return;
            }
        };
        match export::save(&file_name, &bytes) {
            Ok(ExportOutcome::Saved(path)) => {
                log::info!("exported {}", path.display());
                self.notice = Some(format!("exported {}", path.display()));
            }
            Ok(ExportOutcome::Cancelled) => {}
            Err(err) => {
                log::error!("export failed: {err}");
                self.notice = Some(err.to_string());
            }
        }
    }
}
