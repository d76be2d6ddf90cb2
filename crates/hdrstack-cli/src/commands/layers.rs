//! Layer listing for written composites.
//!
//! Channels are grouped by their dotted prefix: `R,G,B` form the unnamed
//! default layer, `mattes.skin.Y` belongs to `mattes.skin`.

use crate::LayersArgs;
use anyhow::{Context, Result};
use hdrstack_core::channel::split_channel_name;
use hdrstack_core::CompositeImage;
use hdrstack_io::read_composite;
use serde_json::{json, Value};
use std::path::Path;

/// `(layer, components)` in channel order.
fn group_layers(image: &CompositeImage) -> Vec<(&str, Vec<&str>)> {
    let mut groups: Vec<(&str, Vec<&str>)> = image.layer_names().into_iter().map(|l| (l, Vec::new())).collect();
    for ch in image.channels() {
        let (layer, component) = split_channel_name(&ch.name);
        let layer = layer.unwrap_or("");
        if let Some((_, comps)) = groups.iter_mut().find(|(l, _)| *l == layer) {
            comps.push(component);
        }
    }
    groups
}

/// Lists the layers of each input file.
pub fn run(args: LayersArgs, verbose: u8) -> Result<()> {
    for path in &args.input {
        let image = read_composite(path).with_context(|| format!("Failed to read EXR: {}", path.display()))?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&layers_json(path, &image))?);
        } else {
            print_layers_text(path, &image, verbose);
        }

        if args.input.len() > 1 {
            println!();
        }
    }
    Ok(())
}

fn print_layers_text(path: &Path, image: &CompositeImage, verbose: u8) {
    println!("{}", path.display());
    println!("  Size: {}x{}", image.width(), image.height());
    println!("  Channels: {}", image.channels().len());

    for (idx, (layer, comps)) in group_layers(image).iter().enumerate() {
        let name = if layer.is_empty() { "(default)" } else { layer };
        println!("  [{}] {} ({})", idx, name, comps.join(","));
        if verbose > 0 {
            for comp in comps {
                let full = if layer.is_empty() { comp.to_string() } else { format!("{}.{}", layer, comp) };
                if let Some(ch) = image.channel(&full) {
                    let (min, max) = ch
                        .samples
                        .iter()
                        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
                    println!("      {}: min {:.4} max {:.4}", full, min, max);
                }
            }
        }
    }
}

fn layers_json(path: &Path, image: &CompositeImage) -> Value {
    let layers: Vec<Value> = group_layers(image)
        .into_iter()
        .map(|(layer, comps)| {
            json!({
                "name": if layer.is_empty() { Value::Null } else { Value::from(layer) },
                "channels": comps,
            })
        })
        .collect();
    json!({
        "file": path.display().to_string(),
        "width": image.width(),
        "height": image.height(),
        "layers": layers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdrstack_core::{ChannelSpec, CompositeBuilder, PixelBuffer};

    fn sample_image() -> CompositeImage {
        let rgb = PixelBuffer::filled(2, 2, &[1.0, 1.0, 1.0]);
        let luma = PixelBuffer::filled(2, 2, &[0.5]);
        let mut b = CompositeBuilder::new(2, 2);
        b.push_buffer(&ChannelSpec::rgb(None), &rgb).unwrap();
        b.push_buffer(&ChannelSpec::rgb(Some("sdr")), &rgb).unwrap();
        b.push_buffer(&[ChannelSpec::luma("depth")], &luma).unwrap();
        b.push_buffer(&[ChannelSpec::matte("skin")], &luma).unwrap();
        b.build()
    }

    #[test]
    fn test_grouping() {
        let image = sample_image();
        let groups = group_layers(&image);
        assert_eq!(
            groups,
            vec![
                ("", vec!["R", "G", "B"]),
                ("sdr", vec!["R", "G", "B"]),
                ("depth", vec!["Y"]),
                ("mattes.skin", vec!["Y"]),
            ]
        );
    }

    #[test]
    fn test_json_shape() {
        let v = layers_json(Path::new("a.exr"), &sample_image());
        assert_eq!(v["width"], 2);
        assert_eq!(v["layers"][0]["name"], Value::Null);
        assert_eq!(v["layers"][3]["name"], "mattes.skin");
        assert_eq!(v["layers"][3]["channels"][0], "Y");
    }
}
