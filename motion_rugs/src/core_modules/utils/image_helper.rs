pub mod image_helper {
    use crate::core_modules::synthesizer::RugImage;
    use image::imageops::{self, FilterType};
    use image::{ExtendedColorType, ImageEncoder, ImageError};
    use std::fs::File;
    use std::io::BufWriter;
    use std::path::Path;

    /// Writes an RGBA buffer as a PNG file.
    pub fn save(path: &Path, width: u32, height: u32, buffer: &[u8]) -> Result<(), ImageError> {
        let output = BufWriter::new(File::create(path)?);
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder.write_image(buffer, width, height, ExtendedColorType::Rgba8)?;

        Ok(())
    }

    /// Writes a rug at one image pixel per rug cell.
    pub fn save_rug(path: &Path, rug: &RugImage) -> Result<(), ImageError> {
        save(path, rug.width(), rug.height(), rug.pixels.as_raw())
    }

    /// Writes a rug blown up `scale` times with nearest-neighbour sampling, so that
    /// rugs of a few dozen movers stay legible.
    pub fn save_rug_scaled(path: &Path, rug: &RugImage, scale: u32) -> Result<(), ImageError> {
        let scale = scale.max(1);
        let scaled = imageops::resize(&rug.pixels, rug.width() * scale, rug.height() * scale, FilterType::Nearest);
        save(path, scaled.width(), scaled.height(), scaled.as_raw())
    }

    /// `{strategy}-{feature}-{sequence:06}.png`
    pub fn rug_file_name(rug: &RugImage, sequence: u64) -> String {
        format!("{}-{}-{:06}.png", rug.strategy, rug.feature, sequence)
    }
}

#[cfg(test)]
mod tests {

    use super::image_helper::*;
    use crate::core_modules::curve::Strategy;
    use crate::core_modules::orderer::order_window;
    use crate::core_modules::quantizer::{ColorPalette, Deciles};
    use crate::core_modules::reading::{Frame, Reading};
    use crate::core_modules::synthesizer::{synthesize, RugImage};
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("motion_rugs_{}_{}", std::process::id(), name))
    }

    fn rug() -> RugImage {
        let frames: Vec<Frame> = (0..5)
            .map(|n| {
                Frame::new(
                    n,
                    (0..3)
                        .map(|i| Reading::new(10.1 + i as f64 * 0.02, 20.1).with_feature("Velocity", (n * 3 + i) as f64))
                        .collect(),
                )
            })
            .collect();
        let ordered = order_window(&frames, Strategy::Hilbert);
        let deciles = Deciles::from_values((0..15).map(f64::from).collect());
        synthesize(Strategy::Hilbert, "Velocity", &ordered, &deciles, &ColorPalette::default()).expect("render")
    }

    #[test]
    fn save_white_file() {
        let (width, height) = (50u32, 20u32);
        let buffer = vec![255u8; (width * height * 4) as usize];
        let path = scratch("white_file.png");

        save(&path, width, height, &buffer).expect("Error Saving File.");
        let loaded = image::open(&path).expect("Error Loading File.").to_rgba8();
        assert_eq!(loaded.dimensions(), (width, height));
        assert!(loaded.as_raw().iter().all(|&byte| byte == 255));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn saved_rug_reads_back_pixel_for_pixel() {
        let rug = rug();
        let path = scratch("rug.png");

        save_rug(&path, &rug).expect("Error Saving File.");
        let loaded = image::open(&path).expect("Error Loading File.").to_rgba8();
        assert_eq!(loaded, rug.pixels);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn scaled_rug_repeats_each_cell() {
        let rug = rug();
        let path = scratch("rug_scaled.png");

        save_rug_scaled(&path, &rug, 4).expect("Error Saving File.");
        let loaded = image::open(&path).expect("Error Loading File.").to_rgba8();
        assert_eq!(loaded.dimensions(), (20, 12));
        assert_eq!(loaded.get_pixel(9, 5), rug.pixels.get_pixel(2, 1));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn file_names_identify_strategy_feature_and_sequence() {
        assert_eq!(rug_file_name(&rug(), 42), "HilbertOrder-Velocity-000042.png");
    }
}
