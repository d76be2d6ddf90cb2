//! Runs the `hdrstack` binary against extraction snapshots.

use hdrstack_io::{extract_to_dir, read_composite, MemoryAsset, PixelMode, RawImage};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const GAIN_TAG: &str = "urn:com:apple:photo:2020:aux:hdrgainmap";
const SKIN_TAG: &str = "urn:com:apple:photo:2020:aux:semanticskinmatte";

fn hdrstack(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hdrstack"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run hdrstack")
}

/// Writes a sidecar snapshot named `<stem>_metadata.json` into `dir`.
fn make_snapshot(dir: &Path, stem: &str) -> PathBuf {
    let base = RawImage::packed(PixelMode::Rgb, 4, 4, vec![255; 48]).unwrap();
    let gain = RawImage::packed(PixelMode::L, 2, 2, vec![255; 4]).unwrap();
    let skin = RawImage::packed(PixelMode::L, 4, 4, vec![128; 16]).unwrap();
    let asset = MemoryAsset::new(base)
        .with_aux(GAIN_TAG, 1, gain)
        .with_aux(SKIN_TAG, 2, skin)
        .with_headroom(2.0);
    extract_to_dir(&asset, stem, dir).unwrap().snapshot_path
}

#[test]
fn convert_writes_next_to_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = make_snapshot(dir.path(), "IMG_0001");
    let out_dir = dir.path().join("out");

    let out = hdrstack(&["convert", snapshot.to_str().unwrap(), "--output-dir", out_dir.to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let exr = out_dir.join("IMG_0001_acesCG.exr");
    let image = read_composite(&exr).unwrap();
    assert_eq!(
        image.channel_names(),
        vec![
            "R", "G", "B", "sdr.R", "sdr.G", "sdr.B", "gainmap.R", "gainmap.G", "gainmap.B",
            "mattes.skin.Y",
        ]
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("depth: absent"));
}

#[test]
fn convert_half_with_explicit_output() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = make_snapshot(dir.path(), "IMG_0002");
    let exr = dir.path().join("nested").join("x.exr");

    let out = hdrstack(&[
        "convert",
        snapshot.to_str().unwrap(),
        "-o",
        exr.to_str().unwrap(),
        "--half",
        "-c",
        "piz",
        "--headroom",
        "3",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let image = read_composite(&exr).unwrap();
    let r = image.sample("R", 0, 0).unwrap();
    assert!((r - 3.0).abs() < 1e-2, "R = {}", r);
}

#[test]
fn missing_input_fails_with_message() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.heic");
    let out = hdrstack(&["convert", missing.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("nope.heic"));
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn batch_counts_failures() {
    let dir = tempfile::tempdir().unwrap();
    make_snapshot(dir.path(), "A");
    make_snapshot(dir.path(), "B");
    std::fs::write(dir.path().join("C_metadata.json"), b"{ not json").unwrap();
    let out_dir = dir.path().join("out");
    let pattern = format!("{}/*_metadata.json", dir.path().display());

    let out = hdrstack(&["batch", &pattern, "-o", out_dir.to_str().unwrap(), "-j", "2"]);
    assert!(!out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Processed: 2 success, 1 failed"), "{}", stdout);
    assert!(out_dir.join("A_acesCG.exr").exists());
    assert!(out_dir.join("B_acesCG.exr").exists());
    assert!(!out_dir.join("C_acesCG.exr").exists());
}

#[test]
fn layers_json_lists_groups() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = make_snapshot(dir.path(), "IMG");
    let out = hdrstack(&["convert", snapshot.to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let exr = dir.path().join("IMG_acesCG.exr");
    let out = hdrstack(&["layers", exr.to_str().unwrap(), "--json"]);
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["width"], 4);
    let names: Vec<_> = v["layers"].as_array().unwrap().iter().map(|l| l["name"].clone()).collect();
    assert_eq!(
        names,
        vec![
            serde_json::Value::Null,
            "sdr".into(),
            "gainmap".into(),
            "mattes.skin".into()
        ]
    );
}
