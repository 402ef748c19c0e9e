use image::{DynamicImage, GrayImage, Luma};
use prodmatch_cli::{PipelineConfig, ProductMatcher, ScorerStrategy};
use std::time::Instant;

/// Bright and dark blocks over a gradient, shifted by `offset` pixels
fn label(width: u32, height: u32, offset: u32) -> DynamicImage {
    let img = GrayImage::from_fn(width, height, |x, y| {
        let (x, y) = (x + offset, y + offset / 2);
        let block = ((x / 12) * 73 + (y / 12) * 151).wrapping_mul(2_654_435_761) >> 13;
        let value = match block % 4 {
            0 => 220,
            1 => 35,
            _ => 70 + (x + y) * 50 / (width + height),
        };
        Luma([value as u8])
    });
    DynamicImage::ImageLuma8(img)
}

fn stripes(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, _| {
        Luma([if (x / 8) % 2 == 0 { 40 } else { 210 }])
    }))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("🔧 Pipeline Configuration Demo");
    println!("==============================\n");

    let dir = std::env::temp_dir().join("prodmatch-demo");
    std::fs::create_dir_all(&dir)?;

    // Demo 1: presets
    println!("📋 Demo 1: Configurations");
    let gradient = PipelineConfig::default();
    let legacy = PipelineConfig::default()
        .with_strategy(ScorerStrategy::RawPixelDistance)
        .without_alignment()
        .with_threshold(2000.0);
    let mut strict = PipelineConfig::default().with_threshold(0.5);
    strict.alignment.min_inliers_exclusive = 40;

    for cfg in [&gradient, &legacy, &strict] {
        println!("   • {}", cfg.summary());
    }

    // Demo 2: files on disk
    println!("\n📄 Demo 2: JSON and TOML");
    let json_path = dir.join("strict.json");
    let toml_path = dir.join("legacy.toml");
    strict.save_json(&json_path)?;
    legacy.save_toml(&toml_path)?;
    println!("   Saved {} and {}", json_path.display(), toml_path.display());

    let loaded_strict = PipelineConfig::load(&json_path)?;
    let loaded_legacy = PipelineConfig::load(&toml_path)?;
    assert_eq!(loaded_strict, strict);
    assert_eq!(loaded_legacy, legacy);
    println!("   ✅ Both files load back unchanged");

    // Demo 3: comparisons
    println!("\n🎯 Demo 3: Comparisons");
    let reference = label(320, 240, 0);
    let shifted = label(320, 240, 6);
    let other = stripes(320, 240);

    println!(
        "   {:<10} {:<14} {:>10} {:>8} {:<}",
        "Config", "Pair", "Distance", "Same", "Alignment"
    );
    println!("   {}", "-".repeat(70));

    for (name, cfg) in [("gradient", gradient), ("strict", loaded_strict), ("legacy", loaded_legacy)] {
        let matcher = ProductMatcher::new(cfg)?;
        for (pair, source) in [("identical", &reference), ("shifted", &shifted), ("stripes", &other)] {
            let start = Instant::now();
            let c = matcher.compare_detailed(source, &reference)?;
            println!(
                "   {:<10} {:<14} {:>10.4} {:>8} {} ({:.2?})",
                name,
                pair,
                c.result.distance,
                c.result.same,
                c.alignment.status,
                start.elapsed()
            );
        }
    }

    println!("\n🎉 Done. Files left in {}", dir.display());
    Ok(())
}
