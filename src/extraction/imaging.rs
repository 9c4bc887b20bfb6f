use image::imageops::FilterType;
use image::ImageFormat;
use std::io::Cursor;

use crate::error::AppResult;

/// 长或宽超过该值时等比缩放
pub const MAX_DIMENSION: u32 = 1500;

/// OCR 前的图片预处理：解码、等比缩放到 1500 像素以内、灰度化、重新编码为 PNG
pub fn preprocess(bytes: &[u8]) -> AppResult<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    let img = if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
        img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3)
    } else {
        img
    };
    let gray = img.grayscale();

    let mut out = Cursor::new(Vec::new());
    gray.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}
