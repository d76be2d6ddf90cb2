//! TIFF sidecar files.
//!
//! The extraction tool dumps every decoded image losslessly at its native
//! bit depth, and [`SidecarAsset`](crate::sidecar::SidecarAsset) reads them
//! back. Only the modes a [`RawImage`] can hold are supported.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::raw::{PixelMode, RawImage};
use crate::{IoError, IoResult};

/// Reads a TIFF file into a packed [`RawImage`].
///
/// # Example
///
/// ```rust,ignore
/// use hdrstack_io::tiff;
///
/// let raw = tiff::read_raw("IMG_0001_base.tiff")?;
/// println!("{} {}x{}", raw.mode(), raw.width(), raw.height());
/// ```
pub fn read_raw<P: AsRef<Path>>(path: P) -> IoResult<RawImage> {
    use tiff::decoder::{Decoder, DecodingResult};
    use tiff::ColorType;

    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);

    let mut decoder = Decoder::new(reader)
        .map_err(|e: tiff::TiffError| IoError::Decode(e.to_string()))?;

    let (width, height) = decoder.dimensions()
        .map_err(|e: tiff::TiffError| IoError::Decode(e.to_string()))?;
    let color_type = decoder.colortype()
        .map_err(|e: tiff::TiffError| IoError::Decode(e.to_string()))?;

    let result = decoder.read_image()
        .map_err(|e: tiff::TiffError| IoError::Decode(e.to_string()))?;

    match (color_type, result) {
        (ColorType::Gray(8), DecodingResult::U8(buf)) => RawImage::packed(PixelMode::L, width, height, buf),
        (ColorType::RGB(8), DecodingResult::U8(buf)) => RawImage::packed(PixelMode::Rgb, width, height, buf),
        (ColorType::RGBA(8), DecodingResult::U8(buf)) => RawImage::packed(PixelMode::Rgba, width, height, buf),
        (ColorType::Gray(16), DecodingResult::U16(buf)) => RawImage::from_u16(PixelMode::L16, width, height, &buf),
        (ColorType::RGB(16), DecodingResult::U16(buf)) => RawImage::from_u16(PixelMode::Rgb16, width, height, &buf),
        (ColorType::RGBA(16), DecodingResult::U16(buf)) => {
            RawImage::from_u16(PixelMode::Rgba16, width, height, &buf)
        }
        (ct, _) => Err(IoError::UnsupportedFormat(format!(
            "unsupported TIFF color type: {:?}",
            ct
        ))),
    }
}

/// Writes a [`RawImage`] uncompressed at its native bit depth.
///
/// Row padding is dropped.
pub fn write_raw<P: AsRef<Path>>(path: P, raw: &RawImage) -> IoResult<()> {
    use tiff::encoder::{colortype, TiffEncoder};

    let path = path.as_ref();
    let file = File::create(path).map_err(|e| IoError::write(path, e))?;
    let mut encoder = TiffEncoder::new(file)
        .map_err(|e: tiff::TiffError| IoError::Encode(e.to_string()))?;

    let (w, h) = (raw.width(), raw.height());
    let result = match raw.mode() {
        PixelMode::L => encoder.write_image::<colortype::Gray8>(w, h, &raw.packed_bytes()),
        PixelMode::Rgb => encoder.write_image::<colortype::RGB8>(w, h, &raw.packed_bytes()),
        PixelMode::Rgba => encoder.write_image::<colortype::RGBA8>(w, h, &raw.packed_bytes()),
        PixelMode::L16 => encoder.write_image::<colortype::Gray16>(w, h, &raw.samples_u16()),
        PixelMode::Rgb16 => encoder.write_image::<colortype::RGB16>(w, h, &raw.samples_u16()),
        PixelMode::Rgba16 => encoder.write_image::<colortype::RGBA16>(w, h, &raw.samples_u16()),
    };
    result.map_err(|e: tiff::TiffError| IoError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_modes() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            RawImage::packed(PixelMode::L, 3, 2, (0..6).collect()).unwrap(),
            RawImage::packed(PixelMode::Rgb, 2, 2, (0..12).map(|v| v * 20).collect()).unwrap(),
            RawImage::packed(PixelMode::Rgba, 1, 2, (0..8).collect()).unwrap(),
            RawImage::from_u16(PixelMode::L16, 2, 1, &[1, 65535]).unwrap(),
            RawImage::from_u16(PixelMode::Rgb16, 1, 1, &[0, 300, 65000]).unwrap(),
        ];
        for (i, raw) in cases.iter().enumerate() {
            let path = dir.path().join(format!("img_{}.tiff", i));
            write_raw(&path, raw).unwrap();
            let back = read_raw(&path).unwrap();
            assert_eq!(&back, raw, "case {}", i);
        }
    }

    #[test]
    fn test_padding_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let raw = RawImage::new(PixelMode::L, 2, 2, 4, vec![1, 2, 0, 0, 3, 4]).unwrap();
        let path = dir.path().join("padded.tiff");
        write_raw(&path, &raw).unwrap();
        let back = read_raw(&path).unwrap();
        assert_eq!(back.stride(), 2);
        assert_eq!(back.data(), &[1, 2, 3, 4]);
    }
}
