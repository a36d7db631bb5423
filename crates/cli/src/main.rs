mod ingress;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::thread;

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

use facemark_core::annotation::domain::annotation_style::LabelFormat;
use facemark_core::annotation::infrastructure::box_annotator::BoxAnnotator;
use facemark_core::codec::{self, TransportFormat};
use facemark_core::config::pipeline_settings::{OutputFormat, PipelineSettings};
use facemark_core::detection::infrastructure::mock_face_detector::MockFaceDetector;
use facemark_core::governor::resource_governor::ResourceGovernor;
use facemark_core::pipeline::pipeline_coordinator::PipelineCoordinator;
use facemark_core::pipeline::pipeline_error::PipelineError;
use facemark_core::pipeline::responses::UploadResponse;
use facemark_core::shared::geometry::Rect;

use ingress::{parse_rect, read_upload};

/// Face detection, annotation and cropping for still images.
#[derive(Parser)]
#[command(name = "facemark", version)]
struct Cli {
    /// Settings file (defaults to <config dir>/facemark/settings.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect faces and produce annotated copies.
    Detect(DetectArgs),
    /// Extract rectangular regions from an image.
    Crop(CropArgs),
    /// Print the effective settings as JSON.
    Settings {
        /// Also write them to this file.
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

#[derive(Args)]
struct DetectArgs {
    /// Input image files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write annotated images into this directory.
    #[arg(long)]
    annotated_dir: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    threshold: Option<f32>,

    /// Maximum calls processed at once.
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Calls allowed to wait for a slot (0 = reject when busy).
    #[arg(long)]
    queue: Option<usize>,

    /// Per-call budget in milliseconds, queue wait included.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Output image format: png or jpeg.
    #[arg(long, value_parser = parse_output_format)]
    format: Option<OutputFormat>,

    /// Label style: percent, indexed or none.
    #[arg(long, value_parser = parse_label_format)]
    label: Option<LabelFormat>,

    /// Include the encoded images in the JSON output.
    #[arg(long)]
    include_images: bool,
}

#[derive(Args)]
struct CropArgs {
    /// Input image file.
    input: PathBuf,

    /// Region to extract as x,y,width,height (repeatable).
    #[arg(long = "region", required = true, value_parser = parse_rect)]
    regions: Vec<Rect>,

    /// Directory for crop_<index> files.
    #[arg(long)]
    out_dir: PathBuf,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut settings = PipelineSettings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Detect(args) => {
            apply_overrides(&mut settings, &args);
            settings.validate()?;
            run_detect(&args, &settings)
        }
        Command::Crop(args) => {
            settings.validate()?;
            run_crop(&args, &settings)
        }
        Command::Settings { write } => {
            settings.validate()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if let Some(path) = write {
                settings.save(&path)?;
                log::info!("Settings written to {}", path.display());
            }
            Ok(())
        }
    }
}

fn run_detect(
    args: &DetectArgs,
    settings: &PipelineSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let uploads = args
        .inputs
        .iter()
        .map(|path| read_upload(path, settings.max_upload_bytes))
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(dir) = &args.annotated_dir {
        fs::create_dir_all(dir)?;
    }

    let governor = build_governor(settings)?;
    let format = settings.transport_format()?;

    let results: Vec<Result<UploadResponse, PipelineError>> = thread::scope(|scope| {
        let handles: Vec<_> = uploads
            .into_iter()
            .map(|bytes| {
                let governor = &governor;
                scope.spawn(move || governor.process_upload(bytes))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or(Err(PipelineError::WorkerFailed)))
            .collect()
    });

    let mut failures = 0;
    for (path, result) in args.inputs.iter().zip(results) {
        let record = match result {
            Ok(response) => {
                if let Some(dir) = &args.annotated_dir {
                    let out = annotated_path(dir, path, format);
                    fs::write(&out, codec::payload_bytes(&response.annotated_image)?)?;
                    log::info!("Annotated image written to {}", out.display());
                }
                detect_record(path, &response, args.include_images)?
            }
            Err(e) => {
                failures += 1;
                log::error!("{}: {e}", path.display());
                json!({
                    "input": path.display().to_string(),
                    "error": e.to_string(),
                    "overload": e.is_overload(),
                })
            }
        };
        println!("{record}");
    }
    println!("{}", json!({ "governor": governor.status() }));

    if failures > 0 {
        return Err(format!("{failures} of {} inputs failed", args.inputs.len()).into());
    }
    Ok(())
}

fn run_crop(
    args: &CropArgs,
    settings: &PipelineSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = read_upload(&args.input, settings.max_upload_bytes)?;
    let encoded = codec::encode(&codec::decode_bytes(&bytes)?, TransportFormat::Png)?;
    fs::create_dir_all(&args.out_dir)?;

    let governor = build_governor(settings)?;
    let format = settings.transport_format()?;
    let response = governor.process_crop(encoded, args.regions.clone())?;

    let mut written = Vec::new();
    for (index, image) in response.region_indices.iter().zip(&response.cropped_images) {
        let out = args
            .out_dir
            .join(format!("crop_{index}.{}", format.extension()));
        fs::write(&out, codec::payload_bytes(image)?)?;
        written.push(out.display().to_string());
    }
    log::info!(
        "Wrote {} crops to {}, skipped {}",
        written.len(),
        args.out_dir.display(),
        response.skipped_count
    );
    println!(
        "{}",
        json!({ "written": written, "skippedCount": response.skipped_count })
    );
    Ok(())
}

fn build_governor(
    settings: &PipelineSettings,
) -> Result<ResourceGovernor, Box<dyn std::error::Error>> {
    let detector = MockFaceDetector::new(settings.threshold()?)
        .with_min_dimension(settings.min_face_dimension);
    let coordinator = PipelineCoordinator::new(
        Arc::new(detector),
        Box::new(BoxAnnotator::new()),
        settings.annotation_style()?,
        settings.transport_format()?,
    );
    Ok(ResourceGovernor::new(
        Arc::new(coordinator),
        settings.governor_config(),
    )?)
}

fn apply_overrides(settings: &mut PipelineSettings, args: &DetectArgs) {
    if let Some(threshold) = args.threshold {
        settings.confidence_threshold = threshold;
    }
    if let Some(max_concurrent) = args.max_concurrent {
        settings.max_concurrent = max_concurrent;
    }
    if let Some(queue) = args.queue {
        settings.queue_capacity = queue;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        settings.call_timeout_ms = timeout_ms;
    }
    if let Some(format) = args.format {
        settings.output_format = format;
    }
    if let Some(label) = args.label {
        settings.label_format = label;
    }
}

/// JSON line for one successful input; encoded images only on request.
fn detect_record(
    path: &Path,
    response: &UploadResponse,
    include_images: bool,
) -> Result<Value, serde_json::Error> {
    let mut record = serde_json::to_value(response)?;
    if let Value::Object(map) = &mut record {
        if !include_images {
            map.remove("originalImage");
            map.remove("annotatedImage");
        }
        map.insert("input".into(), path.display().to_string().into());
    }
    Ok(record)
}

fn annotated_path(dir: &Path, input: &Path, format: TransportFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    dir.join(format!("{stem}_annotated.{}", format.extension()))
}

fn parse_output_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::ALL
        .iter()
        .copied()
        .find(|f| f.to_string().eq_ignore_ascii_case(s) || (s == "jpg" && *f == OutputFormat::Jpeg))
        .ok_or_else(|| format!("Output format must be 'png' or 'jpeg', got '{s}'"))
}

fn parse_label_format(s: &str) -> Result<LabelFormat, String> {
    match s.to_lowercase().as_str() {
        "percent" => Ok(LabelFormat::Percent),
        "indexed" => Ok(LabelFormat::Indexed),
        "none" => Ok(LabelFormat::None),
        _ => Err(format!(
            "Label must be one of: percent, indexed, none, got '{s}'"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn response() -> UploadResponse {
        UploadResponse {
            original_image: "data:image/png;base64,AAAA".into(),
            annotated_image: "data:image/png;base64,BBBB".into(),
            faces: Vec::new(),
            total_faces: 0,
            processing_time_ms: 3,
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_detect_record_elides_images_by_default() {
        let record = detect_record(Path::new("in/a.png"), &response(), false).unwrap();
        assert_eq!(record["input"], "in/a.png");
        assert_eq!(record["totalFaces"], 0);
        assert!(record.get("originalImage").is_none());
        assert!(record.get("annotatedImage").is_none());
    }

    #[test]
    fn test_detect_record_can_include_images() {
        let record = detect_record(Path::new("a.png"), &response(), true).unwrap();
        assert_eq!(record["annotatedImage"], "data:image/png;base64,BBBB");
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let cli = Cli::parse_from([
            "facemark",
            "detect",
            "a.png",
            "--threshold",
            "0.7",
            "--queue",
            "0",
            "--format",
            "jpg",
            "--label",
            "indexed",
        ]);
        let Command::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        let mut settings = PipelineSettings::default();
        apply_overrides(&mut settings, &args);
        assert_eq!(settings.confidence_threshold, 0.7);
        assert_eq!(settings.queue_capacity, 0);
        assert_eq!(settings.output_format, OutputFormat::Jpeg);
        assert_eq!(settings.label_format, LabelFormat::Indexed);
        assert_eq!(settings.max_concurrent, 2);
    }

    #[test]
    fn test_crop_regions_parse() {
        let cli = Cli::parse_from([
            "facemark", "crop", "a.png", "--region", "0,0,50,50", "--region", "1000,1000,5,5",
            "--out-dir", "out",
        ]);
        let Command::Crop(args) = cli.command else {
            panic!("expected crop");
        };
        assert_eq!(
            args.regions,
            vec![Rect::new(0, 0, 50, 50), Rect::new(1000, 1000, 5, 5)]
        );
    }

    #[test]
    fn test_annotated_path() {
        assert_eq!(
            annotated_path(Path::new("out"), Path::new("pics/team.jpeg"), TransportFormat::Png),
            PathBuf::from("out/team_annotated.png")
        );
    }

    #[test]
    fn test_bad_format_rejected() {
        assert!(parse_output_format("gif").is_err());
        assert!(parse_label_format("loud").is_err());
    }
}
