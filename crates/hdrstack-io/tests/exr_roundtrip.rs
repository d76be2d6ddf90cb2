//! EXR writer/reader round trips.

use approx::assert_relative_eq;
use hdrstack_core::{ChannelSpec, CompositeBuilder, CompositeImage, PixelBuffer};
use hdrstack_io::{read_composite, write_composite, ExrCompression, ExrOptions, IoError, Precision};

fn sample_composite() -> CompositeImage {
    let (w, h) = (5, 3);
    let n = (w * h) as usize;
    let hdr: Vec<f32> = (0..n * 3).map(|i| i as f32 * 0.37 + 0.001).collect();
    let mut builder = CompositeBuilder::new(w, h);
    builder
        .push_buffer(&ChannelSpec::rgb(None), &PixelBuffer::from_data(w, h, 3, hdr).unwrap())
        .unwrap();
    builder
        .push_buffer(&ChannelSpec::rgb(Some("sdr")), &PixelBuffer::filled(w, h, &[0.25, 0.5, 0.75]))
        .unwrap();
    builder
        .push_channel("depth.Y", (0..n).map(|i| 1.0 / (i as f32 + 1.0)).collect())
        .unwrap();
    builder.push_channel("mattes.skin.Y", vec![1.0; n]).unwrap();
    builder.push_channel("mattes.hair.Y", vec![0.0; n]).unwrap();
    builder.build()
}

#[test]
fn float_roundtrip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let image = sample_composite();

    for compression in [ExrCompression::None, ExrCompression::Rle, ExrCompression::Zip, ExrCompression::Piz] {
        let path = dir.path().join(format!("out_{:?}.exr", compression));
        let options = ExrOptions {
            precision: Precision::Float,
            compression,
        };
        write_composite(&image, &path, &options).unwrap();

        let back = read_composite(&path).unwrap();
        assert_eq!(back.dimensions(), image.dimensions());
        assert_eq!(
            back.channel_names(),
            vec!["R", "G", "B", "sdr.R", "sdr.G", "sdr.B", "depth.Y", "mattes.hair.Y", "mattes.skin.Y"]
        );
        for ch in image.channels() {
            let other = back.channel(&ch.name).unwrap();
            assert_eq!(other.samples, ch.samples, "{:?} {}", compression, ch.name);
        }
    }
}

#[test]
fn half_roundtrip_within_precision() {
    let dir = tempfile::tempdir().unwrap();
    let image = sample_composite();
    let path = dir.path().join("half.exr");
    let options = ExrOptions {
        precision: Precision::Half,
        ..Default::default()
    };
    write_composite(&image, &path, &options).unwrap();

    let back = read_composite(&path).unwrap();
    for ch in image.channels() {
        let other = back.channel(&ch.name).unwrap();
        for (a, b) in ch.samples.iter().zip(&other.samples) {
            assert_relative_eq!(*a, *b, max_relative = 1e-3, epsilon = 1e-4);
        }
    }
}

#[test]
fn failed_write_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing_dir").join("out.exr");
    let err = write_composite(&sample_composite(), &path, &ExrOptions::default()).unwrap_err();
    assert!(matches!(err, IoError::Write { .. }));
    assert!(!path.exists());

    let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[test]
fn overwrite_replaces_existing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.exr");
    std::fs::write(&path, b"stale").unwrap();
    write_composite(&sample_composite(), &path, &ExrOptions::default()).unwrap();
    assert_eq!(read_composite(&path).unwrap().channels().len(), 9);
}
