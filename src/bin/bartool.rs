use clap::{Parser, Subcommand};
use rust_barcode::binarizer::Binarizer;
use rust_barcode::logger;
use rust_barcode::tools::synth::{render_ean13, render_micr_line};
use rust_barcode::tools::{
    bench_limit_from_env, binary_stats, dataset_iter, dataset_root_from_env, expected_values_path,
    grayscale_stats, load_gray, parse_expected_values, smoke_from_env,
};
use rust_barcode::{FilterKind, GrayImage, PixelSource, ScanConfig, Scanner};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "bartool", version, about = "rust_barcode CLI tools")]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a single image and print every symbol found
    Detect {
        #[arg(long)]
        image: PathBuf,
        /// Primary binarization filter
        #[arg(long)]
        filter: Option<String>,
        /// Extra scan angles in degrees, comma separated
        #[arg(long, value_delimiter = ',')]
        angles: Vec<f32>,
        /// Also scan mirrored rows
        #[arg(long)]
        mirrored: bool,
    },
    /// Print grayscale and binary stats of an image
    BinarizeStats {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        filter: Option<String>,
    },
    /// Compute reading rate on a labeled dataset
    ReadingRate {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        smoke: bool,
    },
    /// Render an EAN-13 symbol to an image file
    SynthEan13 {
        #[arg(long)]
        code: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 2)]
        module: usize,
        #[arg(long)]
        supplement: Option<String>,
    },
    /// Render an E-13B MICR line to an image file
    SynthMicr {
        #[arg(long)]
        text: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 3)]
        cell: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = logger::init_with_level(logger::level_from_verbosity(cli.verbose)) {
        eprintln!("Failed to install logger: {}", err);
    }

    match cli.command {
        Command::Detect {
            image,
            filter,
            angles,
            mirrored,
        } => detect_cmd(&image, filter.as_deref(), &angles, mirrored),
        Command::BinarizeStats { image, filter } => binarize_stats_cmd(&image, filter.as_deref()),
        Command::ReadingRate { root, limit, smoke } => reading_rate_cmd(root, limit, smoke),
        Command::SynthEan13 {
            code,
            out,
            module,
            supplement,
        } => synth_ean13_cmd(&code, supplement.as_deref(), module, &out),
        Command::SynthMicr { text, out, cell } => synth_micr_cmd(&text, cell, &out),
    }
}

fn parse_filter(name: Option<&str>) -> Option<FilterKind> {
    match name {
        None => Some(ScanConfig::default().filter),
        Some(name) => {
            let kind = FilterKind::parse(name);
            if kind.is_none() {
                eprintln!("Unknown filter: {}", name);
            }
            kind
        }
    }
}

fn detect_cmd(image: &Path, filter: Option<&str>, angles: &[f32], mirrored: bool) {
    let Some(filter) = parse_filter(filter) else {
        return;
    };
    let gray = match load_gray(image) {
        Ok(gray) => gray,
        Err(err) => {
            eprintln!("Failed to load image {}: {}", image.display(), err);
            return;
        }
    };

    let mut config = ScanConfig {
        filter,
        mirrored,
        ..Default::default()
    }
    .with_env_overrides();
    config.angles.extend_from_slice(angles);
    let scanner = match Scanner::new(config) {
        Ok(scanner) => scanner,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            return;
        }
    };

    let start = Instant::now();
    let results = scanner.decode(&gray);
    let elapsed = start.elapsed();
    println!("Image: {} ({}x{})", image.display(), gray.width(), gray.height());
    match results {
        Ok(results) => {
            println!("Found {} symbols in {:.2?}", results.len(), elapsed);
            for (i, found) in results.iter().enumerate() {
                let supplement = found.supplement.as_deref().unwrap_or("-");
                println!(
                    "  {} {}: value={} supplement={} confidence={:.2} rect=({}, {}, {}, {})",
                    found.format.name(),
                    i,
                    found.value,
                    supplement,
                    found.confidence,
                    found.rect.left,
                    found.rect.top,
                    found.rect.right,
                    found.rect.bottom
                );
            }
        }
        Err(err) => eprintln!("Scan failed after {:.2?}: {}", elapsed, err),
    }
}

fn binarize_stats_cmd(image: &Path, filter: Option<&str>) {
    let Some(filter) = parse_filter(filter) else {
        return;
    };
    let gray = match load_gray(image) {
        Ok(gray) => gray,
        Err(err) => {
            eprintln!("Failed to load image {}: {}", image.display(), err);
            return;
        }
    };

    println!("Image: {} ({}x{})", image.display(), gray.width(), gray.height());
    let gray_stats = grayscale_stats(&gray);
    println!(
        "Grayscale range: {}-{}, average: {}",
        gray_stats.min, gray_stats.max, gray_stats.avg
    );

    let config = ScanConfig::default();
    let start = Instant::now();
    let binary = Binarizer::new(&gray, filter, &config).to_matrix();
    let elapsed = start.elapsed();
    let stats = binary_stats(&binary);
    println!(
        "Binary ({:?}): black_pixels={} total={} black_ratio={:.2}% ({:.2?})",
        filter,
        stats.black_pixels,
        stats.total_pixels,
        stats.black_ratio * 100.0,
        elapsed
    );
}

fn reading_rate_cmd(root: Option<PathBuf>, limit: Option<usize>, smoke: bool) {
    let root = root.unwrap_or_else(dataset_root_from_env);
    let limit = limit.or_else(bench_limit_from_env);
    let smoke = smoke || smoke_from_env();

    if !root.exists() {
        eprintln!("Dataset root not found: {}", root.display());
        return;
    }

    let images: Vec<PathBuf> = dataset_iter(&root, limit, smoke).collect();
    if images.is_empty() {
        println!("No images found under {}", root.display());
        return;
    }

    let scanner = match Scanner::new(ScanConfig::default().with_env_overrides()) {
        Ok(scanner) => scanner,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            return;
        }
    };

    let mut total = 0usize;
    let mut successful = 0usize;
    let mut total_elapsed = std::time::Duration::default();

    for path in images {
        let expected = parse_expected_values(expected_values_path(&path));
        if expected.is_empty() {
            continue;
        }
        total += 1;

        let gray = match load_gray(&path) {
            Ok(gray) => gray,
            Err(_) => {
                println!("  [{}] {} -> load_failed", total, path.display());
                continue;
            }
        };
        let start = Instant::now();
        let values: Vec<String> = match scanner.decode(&gray) {
            Ok(results) => results.into_iter().map(|found| found.value).collect(),
            Err(err) => {
                println!("  [{}] {} -> {}", total, path.display(), err);
                continue;
            }
        };
        let elapsed = start.elapsed();
        total_elapsed += elapsed;

        let hit = expected.iter().all(|value| values.contains(value));
        if hit {
            successful += 1;
        }
        println!(
            "  [{}] {} -> {} ({:.2?})",
            total,
            path.display(),
            if hit { "hit" } else { "miss" },
            elapsed
        );
    }

    if total == 0 {
        println!("No labeled images found under {}", root.display());
        return;
    }
    let rate = (successful as f64 / total as f64) * 100.0;
    println!("Reading rate: {}/{} = {:.2}%", successful, total, rate);
    println!("Total time: {:.2?}", total_elapsed);
}

fn save_gray(gray: &GrayImage, out: &Path) {
    let Some(buffer) = image::GrayImage::from_raw(
        gray.width() as u32,
        gray.height() as u32,
        gray.as_bytes().to_vec(),
    ) else {
        eprintln!("Image buffer does not match {}x{}", gray.width(), gray.height());
        return;
    };
    match buffer.save(out) {
        Ok(()) => println!("Wrote {} ({}x{})", out.display(), gray.width(), gray.height()),
        Err(err) => eprintln!("Failed to write {}: {}", out.display(), err),
    }
}

fn synth_ean13_cmd(code: &str, supplement: Option<&str>, module: usize, out: &Path) {
    match render_ean13(code, supplement, module, 40 * module.max(1)) {
        Some(gray) => save_gray(&gray, out),
        None => eprintln!("Not a valid EAN-13 code or add-on: {}", code),
    }
}

fn synth_micr_cmd(text: &str, cell: usize, out: &Path) {
    let gray = render_micr_line(text, cell);
    save_gray(&gray, out);
}
