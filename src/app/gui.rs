use eframe::{App, Frame};
use egui::{Color32, ColorImage, RichText, TextureHandle, TextureOptions};
use image::{RgbaImage, imageops};

use crate::app::ThumbPaneApp;
use crate::app::preset::{PresetStore, TOTAL_SLOTS};

const THUMB_SIZE: egui::Vec2 = egui::vec2(176.0, 99.0);
const THUMB_MAX_SIDE: u32 = 256;

impl App for ThumbPaneApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, PresetStore::STORAGE_KEY, &self.store);
    }

    fn update(&mut self, ctx: &egui::Context, frame: &mut Frame) {
        if let Some(msg) = self.notice.clone() {
            let mut close = false;
            egui::Window::new("thumbpane")
                .collapsible(false)
                .movable(true)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(msg);
                    if ui.button("close").clicked() {
                        close = true;
                    }
                });
            if close {
                self.notice = None;
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("backgrounds");
                ui.add_space(4.0);
                self.preset_grid(ctx, ui);

                ui.separator();
                ui.horizontal(|ui| {
                    ui.label("slot");
                    ui.add(egui::DragValue::new(&mut self.register_slot).range(1..=TOTAL_SLOTS));
                    if ui.button("register background…").clicked() {
                        self.prompt_register(frame);
                    }
                });

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("upload cover…").clicked() {
                        self.prompt_cover();
                    }
                    if ui.button("export PNG").clicked() {
                        self.export();
                    }
                });
                if let Some(cover) = &self.cover {
                    ui.label(RichText::new(&cover.file_name).small().weak());
                }

                ui.separator();
                ui.heading("preview");
                ui.add_space(4.0);
                let tex = self.preview_texture(ctx);
                let response = ui.add(
                    egui::Image::from_texture(&tex)
                        .maintain_aspect_ratio(true)
                        .max_width(ui.available_width()),
                );
                if self.surface.is_placeholder() {
                    ui.painter().text(
                        response.rect.center(),
                        egui::Align2::CENTER_CENTER,
                        "select a background and cover image",
                        egui::FontId::proportional(15.0),
                        Color32::WHITE,
                    );
                }
            });
        });
    }
}

impl ThumbPaneApp {
    /// All ten slots in fixed order, two per row. Built-ins and registered
    /// slots show a thumbnail; unregistered ones an explicit placeholder.
    fn preset_grid(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        egui::Grid::new("preset_grid")
            .num_columns(2)
            .spacing([8.0, 8.0])
            .show(ui, |ui| {
                for slot in 1..=TOTAL_SLOTS {
                    let selected = self.selected_slot == Some(slot);
                    let clicked = ui
                        .vertical(|ui| {
                            ui.label(RichText::new(slot.to_string()).small().weak());
                            match self.slot_thumbnail(ctx, slot) {
                                Some(tex) => ui
                                    .add(
                                        egui::ImageButton::new(
                                            egui::Image::from_texture(&tex)
                                                .fit_to_exact_size(THUMB_SIZE),
                                        )
                                        .selected(selected),
                                    )
                                    .clicked(),
                                None => {
                                    ui.add_sized(
                                        THUMB_SIZE,
                                        egui::Button::selectable(selected, "unregistered"),
                                    );
                                    false
                                }
                            }
                        })
                        .inner;
                    if clicked {
                        self.select_background(slot);
                    }
                    if slot % 2 == 0 {
                        ui.end_row();
                    }
                }
            });
    }

    fn slot_thumbnail(&mut self, ctx: &egui::Context, slot: u8) -> Option<TextureHandle> {
        let idx = slot as usize - 1;
        if self.thumb_cache[idx].is_none() {
            let img = match self.decode_slot(slot)? {
                Ok(img) => img,
                Err(err) => {
                    log::warn!("slot {slot} thumbnail failed to decode: {err}");
                    return None;
                }
            };
            let thumb = downscale(&img, THUMB_MAX_SIDE);
            self.thumb_cache[idx] = Some(ctx.load_texture(
                format!("slot_{slot}"),
                color_image(&thumb),
                TextureOptions::LINEAR,
            ));
        }
        self.thumb_cache[idx].clone()
    }

    fn preview_texture(&mut self, ctx: &egui::Context) -> TextureHandle {
        let surface = &self.surface;
        self.preview_tex
            .get_or_insert_with(|| {
                ctx.load_texture("preview", color_image(surface.image()), TextureOptions::LINEAR)
            })
            .clone()
    }

    fn prompt_register(&mut self, frame: &mut Frame) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("choose a background to register")
            .add_filter("image files", &["png", "jpg", "jpeg", "webp", "gif", "bmp"])
            .pick_file()
        else {
            return;
        };
        let slot = self.register_slot;
        match self.register_background(slot, &path) {
            Ok(()) => {
                // Durable immediately, not just on the next autosave.
                if let Some(storage) = frame.storage_mut() {
                    self.store.persist(storage);
                }
                self.notice = Some(format!("registered background to slot {slot}"));
            }
            Err(err) => self.notice = Some(err),
        }
    }

    fn prompt_cover(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_title("choose a cover image")
            .add_filter("image files", &["png", "jpg", "jpeg", "webp", "gif", "bmp"])
            .pick_file()
        {
            self.set_cover(&path);
        }
    }
}

fn color_image(img: &RgbaImage) -> ColorImage {
    ColorImage::from_rgba_unmultiplied(
        [img.width() as usize, img.height() as usize],
        img.as_raw(),
    )
}

fn downscale(img: &RgbaImage, max_side: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w <= max_side && h <= max_side {
        return img.clone();
    }
    let scale = (max_side as f32 / w as f32).min(max_side as f32 / h as f32);
    let new_w = (w as f32 * scale).round() as u32;
    let new_h = (h as f32 * scale).round() as u32;
    imageops::resize(img, new_w, new_h, imageops::FilterType::Lanczos3)
}
