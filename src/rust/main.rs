use foodlens::{FoodClassifier, FoodPrediction, ModelManager, RuntimeConfig, WeightsSource};
use log::{info, warn};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(author, version, about = "Identify food in photos and look up approximate nutrients", long_about = None)]
struct Args {
    /// Image files to classify
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// ONNX weights file (defaults to model/model.onnx next to the executable)
    #[arg(long, env = "FOODLENS_MODEL")]
    model: Option<PathBuf>,

    /// Label list, one class per line (defaults to the bundled Food-101 list
    /// when food-101/meta/classes.txt is absent)
    #[arg(long, env = "FOODLENS_LABELS")]
    labels: Option<PathBuf>,

    /// JSON nutrient table extending the built-in one
    #[arg(long, env = "FOODLENS_NUTRIENTS")]
    nutrients: Option<PathBuf>,

    /// Fetch the weights from this URL if the local copy is missing or stale
    #[arg(long, requires = "sha256")]
    fetch_url: Option<String>,

    /// Expected SHA-256 of the weights file
    #[arg(long)]
    sha256: Option<String>,

    /// Intra-op threads for ONNX Runtime (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Print one JSON object per image
    #[arg(long)]
    json: bool,
}

async fn load_classifier(args: &Args) -> anyhow::Result<FoodClassifier> {
    let manager = ModelManager::new_default();
    info!("Resolving assets under {:?}", manager.base_dir());

    if let (Some(url), Some(sha256)) = (&args.fetch_url, &args.sha256) {
        manager.ensure_weights(&WeightsSource::new(url, sha256)).await?;
    }

    let mut builder = FoodClassifier::builder()
        .with_runtime_config(RuntimeConfig::default().with_intra_threads(args.threads));

    builder = match &args.labels {
        Some(path) => builder.with_labels(path)?,
        None if manager.has_labels() => builder.with_labels(manager.get_labels_path())?,
        None => {
            warn!("No label list found, using the bundled Food-101 classes");
            builder.with_builtin_labels()?
        }
    };

    let model_path = match &args.model {
        Some(path) => path.clone(),
        None => manager.require_weights()?,
    };
    builder = builder.with_model(model_path)?;

    if let Some(path) = &args.nutrients {
        builder = builder.with_nutrients_file(path)?;
    }

    Ok(builder.build()?)
}

fn print_result(args: &Args, image: &Path, prediction: &FoodPrediction) {
    if args.json {
        let line = serde_json::json!({
            "image": image.to_string_lossy(),
            "food": prediction.food,
            "nutrients": prediction.nutrients,
        });
        println!("{}", line);
    } else {
        let n = &prediction.nutrients;
        println!("{}", image.display());
        println!("  Food:     {}", prediction.food);
        println!("  Calories: {}", n.calories);
        println!("  Protein:  {}", n.protein);
        println!("  Carbs:    {}", n.carbs);
        println!("  Fats:     {}", n.fats);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let start_time = Instant::now();
    info!("Loading classifier...");
    let classifier = load_classifier(&args).await?;
    info!("Classifier ready (took {:.2?}): {:?}", start_time.elapsed(), classifier.info());

    let mut failures = 0;
    for image in &args.images {
        let started = Instant::now();
        match classifier.classify_path(image) {
            Ok(result) => {
                info!("Classified {:?} in {:.2?}", image, started.elapsed());
                print_result(&args, image, &FoodPrediction::from(result));
            }
            Err(e) if e.is_invalid_input() => {
                failures += 1;
                eprintln!("{}: not a valid image ({})", image.display(), e);
            }
            Err(e) => {
                failures += 1;
                eprintln!("{}: classification failed ({})", image.display(), e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} images could not be classified", failures, args.images.len());
    }
    Ok(())
}
