use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of gallery slots, fixed order 1..=10.
pub const TOTAL_SLOTS: u8 = 10;
/// Slots 1..=6 ship with the app and are never written.
pub const BUILTIN_SLOTS: u8 = 6;

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("slot number must be between 1 and {TOTAL_SLOTS}, got {0}")]
    OutOfRange(u8),
    #[error("slot {0} is a built-in background and cannot be overwritten")]
    Reserved(u8),
    #[error("image payload is not valid base64: {0}")]
    Payload(#[from] base64::DecodeError),
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKind {
    Builtin,
    UserRegistered,
    Empty,
}

/// User-registered backgrounds, slots 7..=10 only. Persisted as one record
/// under [`PresetStore::STORAGE_KEY`]; an absent record is an empty store.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct PresetStore {
    slots: BTreeMap<u8, String>,
}

impl PresetStore {
    pub const STORAGE_KEY: &'static str = "user_backgrounds";

    pub fn load(storage: Option<&dyn eframe::Storage>) -> Self {
        storage
            .and_then(|s| eframe::get_value(s, Self::STORAGE_KEY))
            .unwrap_or_default()
    }

    pub fn persist(&self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, Self::STORAGE_KEY, self);
        storage.flush();
    }

    pub fn get(&self, slot: u8) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    /// Overwrite-only write. Callers are expected to validate the slot first;
    /// use [`PresetStore::register`] for the user-facing path.
    pub fn set(&mut self, slot: u8, payload: String) {
        self.slots.insert(slot, payload);
    }

    /// Validated registration: range-checked, built-ins rejected, and the
    /// bytes must decode as an image before anything is stored.
    pub fn register(&mut self, slot: u8, bytes: &[u8], mime: &str) -> Result<(), SlotError> {
        if !(1..=TOTAL_SLOTS).contains(&slot) {
            return Err(SlotError::OutOfRange(slot));
        }
        if slot <= BUILTIN_SLOTS {
            return Err(SlotError::Reserved(slot));
        }
        image::load_from_memory(bytes)?;
        self.set(slot, encode_payload(bytes, mime));
        Ok(())
    }

    pub fn kind(&self, slot: u8) -> SlotKind {
        if (1..=BUILTIN_SLOTS).contains(&slot) {
            SlotKind::Builtin
        } else if self.slots.contains_key(&slot) {
            SlotKind::UserRegistered
        } else {
            SlotKind::Empty
        }
    }
}

/// Encode raw image bytes as a data-URI-style string so the store holds plain
/// string values.
pub fn encode_payload(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", general_purpose::STANDARD.encode(bytes))
}

/// Decode a stored payload back into a drawable raster. The mime prefix is
/// advisory only; the actual format is sniffed from the bytes.
pub fn decode_payload(payload: &str) -> Result<RgbaImage, SlotError> {
    let encoded = payload
        .split_once("base64,")
        .map(|(_, data)| data)
        .unwrap_or(payload);
    let bytes = general_purpose::STANDARD.decode(encoded)?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "image/png",
    }
}

macro_rules! include_backgrounds {
    ($($slot:literal),*) => {
        /// Encoded bytes of the bundled background for slots 1..=6.
        pub fn builtin_background(slot: u8) -> Option<&'static [u8]> {
            match slot {
                $($slot => Some(include_bytes!(concat!(
                    "../../assets/backgrounds/bg",
                    $slot,
                    ".png"
                ))),)*
                _ => None,
            }
        }
    };
}

include_backgrounds! { 1, 2, 3, 4, 5, 6 }

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(3, 2, image::Rgba([10, 200, 30, 255]));
        let mut bytes = Vec::new();
        img.write_with_encoder(image::codecs::png::PngEncoder::new(&mut bytes))
            .unwrap();
        bytes
    }

    #[test]
    fn builtin_slots_have_bundled_images() {
        for slot in 1..=BUILTIN_SLOTS {
            let bytes = builtin_background(slot).unwrap();
            assert!(image::load_from_memory(bytes).is_ok(), "bg{slot}.png");
        }
        assert!(builtin_background(7).is_none());
        assert!(builtin_background(0).is_none());
    }

    #[test]
    fn builtin_slots_ignore_store_contents() {
        let mut store = PresetStore::default();
        for slot in 1..=BUILTIN_SLOTS {
            store.set(slot, "garbage".to_owned());
            assert_eq!(store.kind(slot), SlotKind::Builtin);
        }
    }

    #[test]
    fn user_slots_mirror_the_store() {
        let mut store = PresetStore::default();
        for slot in 7..=TOTAL_SLOTS {
            assert_eq!(store.kind(slot), SlotKind::Empty);
        }
        store.register(8, &tiny_png(), "image/png").unwrap();
        assert_eq!(store.kind(8), SlotKind::UserRegistered);
        assert_eq!(store.kind(7), SlotKind::Empty);
    }

    #[test]
    fn register_rejects_out_of_range_and_reserved() {
        let mut store = PresetStore::default();
        assert!(matches!(
            store.register(0, &tiny_png(), "image/png"),
            Err(SlotError::OutOfRange(0))
        ));
        assert!(matches!(
            store.register(11, &tiny_png(), "image/png"),
            Err(SlotError::OutOfRange(11))
        ));
        assert!(matches!(
            store.register(3, &tiny_png(), "image/png"),
            Err(SlotError::Reserved(3))
        ));
        assert!(store.get(3).is_none());
    }

    #[test]
    fn register_rejects_undecodable_bytes() {
        let mut store = PresetStore::default();
        assert!(matches!(
            store.register(7, b"not an image", "image/png"),
            Err(SlotError::Decode(_))
        ));
        assert!(store.get(7).is_none());
    }

    #[test]
    fn payload_round_trip() {
        let bytes = tiny_png();
        let payload = encode_payload(&bytes, "image/png");
        assert!(payload.starts_with("data:image/png;base64,"));
        let img = decode_payload(&payload).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(0, 0), &image::Rgba([10, 200, 30, 255]));
    }

    #[test]
    fn register_overwrites_previous_payload() {
        let mut store = PresetStore::default();
        store.register(9, &tiny_png(), "image/png").unwrap();
        let first = store.get(9).unwrap().to_owned();

        let img = RgbaImage::from_pixel(5, 5, image::Rgba([0, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_with_encoder(image::codecs::png::PngEncoder::new(&mut bytes))
            .unwrap();
        store.register(9, &bytes, "image/png").unwrap();
        assert_ne!(store.get(9).unwrap(), first);
        assert_eq!(
            decode_payload(store.get(9).unwrap()).unwrap().dimensions(),
            (5, 5)
        );
    }
}
