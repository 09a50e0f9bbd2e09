use image::{imageops, RgbaImage};

use crate::maps_api::tile_retriever::BaseLayer;

/// Cache key for a raster tile: the imagery source plus its XYZ address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub layer: BaseLayer,
    pub zoom: u32,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn new(layer: BaseLayer, zoom: u32, x: u32, y: u32) -> Self {
        Self { layer, zoom, x, y }
    }
}

/// Share of the luminance mixed into each channel before inverting.
const GRAYSCALE_AMOUNT: f32 = 0.8;

/// Darken a tile the way the dark basemap is shown: 80% grayscale, then invert.
pub fn apply_dark_filter(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let luma = 0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32;
        for channel in pixel.0.iter_mut().take(3) {
            let mixed = *channel as f32 * (1.0 - GRAYSCALE_AMOUNT) + luma * GRAYSCALE_AMOUNT;
            *channel = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }
    imageops::invert(image);
}

pub struct MapTile {
    pub key: TileKey,
    image_size: [usize; 2],
    image_data: Vec<u8>,
    texture: Option<egui::TextureHandle>, // Uploaded lazily, the first time the tile is painted
}

impl MapTile {
    pub fn new(key: TileKey, image: RgbaImage) -> Self {
        let image_size = [image.width() as usize, image.height() as usize];
        Self {
            key,
            image_size,
            image_data: image.into_raw(),
            texture: None,
        }
    }

    pub fn texture(&mut self, ctx: &egui::Context) -> &egui::TextureHandle {
        let key = self.key;
        let image_size = self.image_size;
        let image_data = &self.image_data;
        self.texture.get_or_insert_with(|| {
            let color_image = egui::ColorImage::from_rgba_unmultiplied(image_size, image_data);
            ctx.load_texture(
                format!("tile_{:?}_{}_{}_{}", key.layer, key.zoom, key.x, key.y),
                color_image,
                egui::TextureOptions::LINEAR,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn dark_filter_inverts_white_to_black() {
        let mut image = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        apply_dark_filter(&mut image);
        assert!(image.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn dark_filter_keeps_alpha_and_mostly_desaturates() {
        let mut image = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 128]));
        apply_dark_filter(&mut image);
        let [r, g, b, a] = image.get_pixel(0, 0).0;
        assert_eq!(a, 128);
        // luma of pure red is ~54; 20% of the original channel survives the mix
        assert_eq!(r, 255 - 94);
        assert_eq!(g, 255 - 43);
        assert_eq!(b, g);
    }
}
