use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use faceroster_core::detection::domain::face_detector::FaceDetector;
use faceroster_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloDetector, DEFAULT_CONFIDENCE,
};
use faceroster_core::frontalization::domain::frontalization_stage::FrontalizationStage;
use faceroster_core::frontalization::domain::frontalizer_chain::FrontalizerChain;
use faceroster_core::frontalization::infrastructure::gallery_copy_stage::GalleryCopyStage;
use faceroster_core::frontalization::infrastructure::gemini_stage::GeminiStage;
use faceroster_core::frontalization::infrastructure::mirror_stage::MirrorStage;
use faceroster_core::frontalization::infrastructure::onnx_gan_stage::OnnxGanStage;
use faceroster_core::gallery::domain::gallery::Gallery;
use faceroster_core::gallery::infrastructure::embedding_cache;
use faceroster_core::gallery::infrastructure::gallery_loader::GalleryLoader;
use faceroster_core::pipeline::extract_faces_use_case::{
    ExtractFacesUseCase, ExtractionSettings, ProgressCallback,
};
use faceroster_core::pipeline::identify_faces_use_case::{IdentifiedFace, IdentifyFacesUseCase};
use faceroster_core::pipeline::process_video_use_case::ProcessVideoUseCase;
use faceroster_core::pipeline::report::{write_report, Summary, REPORT_FILE_NAME};
use faceroster_core::recognition::domain::face_encoder::FaceEncoder;
use faceroster_core::recognition::domain::identity_matcher::IdentityMatcher;
use faceroster_core::recognition::domain::rotating_encoder::RotatingEncoder;
use faceroster_core::recognition::infrastructure::onnx_arcface_encoder::OnnxArcFaceEncoder;
use faceroster_core::sampling::frame_sampler::FrameSampler;
use faceroster_core::shared::config::PipelineConfig;
use faceroster_core::shared::constants::{
    EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, REFERENCE_IMAGE_EXTENSIONS, YOLO_MODEL_NAME,
    YOLO_MODEL_URL,
};
use faceroster_core::shared::model_resolver;
use faceroster_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use faceroster_core::video::infrastructure::image_file_reader::ImageFileReader;
use faceroster_core::video::infrastructure::image_file_writer::ImageFileWriter;

const FACES_DIR: &str = "faces";
const FRONTAL_DIR: &str = "frontal";

/// Extract distinct faces from videos, match them against a gallery of
/// known people and produce a frontal image for each.
#[derive(Parser)]
#[command(name = "faceroster", version)]
struct Cli {
    /// JSON config file (defaults to the per-user config when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory searched for ONNX models before the download cache.
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save the distinct faces of a video as face_NNNN.jpg files.
    Extract {
        video: PathBuf,
        output_dir: PathBuf,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Match face images against a gallery and frontalize them.
    Identify {
        /// Face images, or directories of them.
        #[arg(required = true)]
        faces: Vec<PathBuf>,
        #[command(flatten)]
        gallery: GallerySource,
        /// Where frontal images and report.json are written.
        #[arg(long, short)]
        output: PathBuf,
        /// Skip frontalization.
        #[arg(long)]
        no_frontalize: bool,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Extract, identify and frontalize the faces of a video.
    Process {
        video: PathBuf,
        output_dir: PathBuf,
        #[command(flatten)]
        gallery: GallerySource,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Encode a gallery directory and store its embeddings as JSON files.
    CacheGallery {
        gallery: PathBuf,
        cache_dir: PathBuf,
        #[command(flatten)]
        tuning: Tuning,
    },
}

#[derive(Args)]
struct GallerySource {
    /// Gallery root: one folder of reference photos per person.
    #[arg(long)]
    gallery: PathBuf,

    /// Directory of <person>.json embedding caches merged into the gallery.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

/// Command-line overrides of config values.
#[derive(Args)]
struct Tuning {
    /// Sample every Nth frame.
    #[arg(long)]
    frame_skip: Option<usize>,

    /// Stop after this many distinct faces.
    #[arg(long)]
    max_faces: Option<usize>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Identity match distance threshold.
    #[arg(long)]
    threshold: Option<f64>,

    /// Minimum encoded reference photos per gallery person.
    #[arg(long)]
    min_references: Option<usize>,

    /// Keep portrait frames as they are.
    #[arg(long)]
    no_rotate: bool,

    /// ONNX frontalization model.
    #[arg(long)]
    frontal_model: Option<PathBuf>,

    /// Disable the remote generative frontalization stage.
    #[arg(long)]
    no_remote: bool,
}

impl Tuning {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(v) = self.frame_skip {
            config.frame_skip = v;
        }
        if let Some(v) = self.max_faces {
            config.max_unique_faces = v;
        }
        if let Some(v) = self.confidence {
            config.detection_confidence = v;
        }
        if let Some(v) = self.threshold {
            config.match_threshold = v;
        }
        if let Some(v) = self.min_references {
            config.min_references = v;
        }
        if self.no_rotate {
            config.auto_rotate_portrait = false;
        }
        if let Some(ref v) = self.frontal_model {
            config.frontal_model = Some(v.clone());
        }
        if self.no_remote {
            config.remote.enabled = false;
        }
    }
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
    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    let models = ModelSource {
        dir: cli.model_dir,
    };

    match cli.command {
        Command::Extract {
            video,
            output_dir,
            tuning,
        } => {
            tuning.apply(&mut config);
            config.validate()?;
            run_extract(&video, &output_dir, &config, &models)
        }
        Command::Identify {
            faces,
            gallery,
            output,
            no_frontalize,
            tuning,
        } => {
            tuning.apply(&mut config);
            config.validate()?;
            run_identify(&faces, &gallery, &output, no_frontalize, &config, &models)
        }
        Command::Process {
            video,
            output_dir,
            gallery,
            tuning,
        } => {
            tuning.apply(&mut config);
            config.validate()?;
            run_process(&video, &output_dir, &gallery, &config, &models)
        }
        Command::CacheGallery {
            gallery,
            cache_dir,
            tuning,
        } => {
            tuning.apply(&mut config);
            config.validate()?;
            run_cache_gallery(&gallery, &cache_dir, &config, &models)
        }
    }
}

fn run_extract(
    video: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
    models: &ModelSource,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut use_case = build_extractor(config, models)?;
    let faces = use_case.execute(video, output_dir)?;
    eprintln!();
    println!("Saved {} face(s) to {}", faces.len(), output_dir.display());
    Ok(())
}

fn run_identify(
    inputs: &[PathBuf],
    source: &GallerySource,
    output: &Path,
    no_frontalize: bool,
    config: &PipelineConfig,
    models: &ModelSource,
) -> Result<(), Box<dyn std::error::Error>> {
    let faces = collect_faces(inputs)?;
    fs::create_dir_all(output)?;
    let frontal_dir = (!no_frontalize).then(|| output.join(FRONTAL_DIR));
    let mut use_case = build_identifier(source, frontal_dir, config, models)?;
    let results = use_case.execute(&faces);
    report(&output.join(REPORT_FILE_NAME), None, &results)
}

fn run_process(
    video: &Path,
    output_dir: &Path,
    source: &GallerySource,
    config: &PipelineConfig,
    models: &ModelSource,
) -> Result<(), Box<dyn std::error::Error>> {
    let extract = build_extractor(config, models)?;
    let identify = build_identifier(
        source,
        Some(output_dir.join(FRONTAL_DIR)),
        config,
        models,
    )?;
    let results = ProcessVideoUseCase::new(extract, identify)
        .execute(video, &output_dir.join(FACES_DIR))?;
    eprintln!();
    report(&output_dir.join(REPORT_FILE_NAME), Some(video), &results)
}

fn run_cache_gallery(
    gallery_dir: &Path,
    cache_dir: &Path,
    config: &PipelineConfig,
    models: &ModelSource,
) -> Result<(), Box<dyn std::error::Error>> {
    if !gallery_dir.is_dir() {
        return Err(format!("Gallery directory not found: {}", gallery_dir.display()).into());
    }
    let mut encoder = build_encoder(models)?;
    let gallery = load_gallery(gallery_dir, None, encoder.as_mut(), config);
    let written = embedding_cache::save(&gallery, cache_dir)?;
    println!(
        "Cached {} embedding(s) for {} people in {}",
        gallery.embedding_count(),
        written.len(),
        cache_dir.display()
    );
    Ok(())
}

fn report(
    path: &Path,
    source: Option<&Path>,
    results: &[IdentifiedFace],
) -> Result<(), Box<dyn std::error::Error>> {
    let summary = write_report(path, source, results)?;
    print_summary(&summary);
    println!("Report written to {}", path.display());
    Ok(())
}

fn print_summary(summary: &Summary) {
    println!(
        "{} face(s): {} known, {} unknown, {} frontalized",
        summary.faces, summary.known, summary.unknown, summary.frontalized
    );
    for (name, count) in &summary.people {
        println!("  {name}: {count}");
    }
}

struct ModelSource {
    dir: Option<PathBuf>,
}

impl ModelSource {
    fn resolve(&self, name: &str, url: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
        log::info!("Resolving model: {name}");
        let label = name.to_string();
        let path = model_resolver::resolve(
            name,
            url,
            self.dir.as_deref(),
            Some(Box::new(move |downloaded, total| {
                download_progress(&label, downloaded, total)
            })),
        )?;
        Ok(path)
    }

    fn detector(&self, confidence: f64) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
        let path = self.resolve(YOLO_MODEL_NAME, YOLO_MODEL_URL)?;
        Ok(Box::new(OnnxYoloDetector::new(&path, confidence)?))
    }
}

fn build_extractor(
    config: &PipelineConfig,
    models: &ModelSource,
) -> Result<ExtractFacesUseCase, Box<dyn std::error::Error>> {
    // The use case applies the configured threshold itself.
    let detector = models.detector(DEFAULT_CONFIDENCE.min(config.detection_confidence))?;
    let sampler = FrameSampler::new(
        Box::new(FfmpegReader::new()),
        config.frame_skip,
        config.auto_rotate_portrait,
    );
    let progress: ProgressCallback = Box::new(|current, total| {
        if total > 0 {
            eprint!("\rScanning sample {current}/{total}");
        } else {
            eprint!("\rScanning sample {current}");
        }
        true
    });
    Ok(ExtractFacesUseCase::new(
        sampler,
        detector,
        Box::new(ImageFileWriter::new()),
        ExtractionSettings::from(config),
        Some(progress),
    ))
}

fn build_encoder(models: &ModelSource) -> Result<Box<dyn FaceEncoder>, Box<dyn std::error::Error>> {
    let detector = models.detector(DEFAULT_CONFIDENCE)?;
    let path = models.resolve(EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL)?;
    Ok(Box::new(OnnxArcFaceEncoder::new(&path, detector)?))
}

fn load_gallery(
    root: &Path,
    cache_dir: Option<&Path>,
    encoder: &mut dyn FaceEncoder,
    config: &PipelineConfig,
) -> Gallery {
    let reader = ImageFileReader::new();
    GalleryLoader::new(&reader, encoder, config.min_references).load(root, cache_dir)
}

fn build_identifier(
    source: &GallerySource,
    frontal_dir: Option<PathBuf>,
    config: &PipelineConfig,
    models: &ModelSource,
) -> Result<IdentifyFacesUseCase, Box<dyn std::error::Error>> {
    let mut encoder = build_encoder(models)?;
    let gallery = load_gallery(
        &source.gallery,
        source.cache_dir.as_deref(),
        encoder.as_mut(),
        config,
    );
    let frontalizer = frontal_dir.map(|dir| (build_frontalizer(config), dir));
    Ok(IdentifyFacesUseCase::new(
        Box::new(ImageFileReader::new()),
        RotatingEncoder::new(encoder),
        IdentityMatcher::new(config.match_threshold),
        Arc::new(gallery),
        frontalizer,
    ))
}

/// Gallery copy, then the optional generative stages, then mirroring.
fn build_frontalizer(config: &PipelineConfig) -> FrontalizerChain {
    let mut stages: Vec<Box<dyn FrontalizationStage>> = vec![Box::new(GalleryCopyStage::new())];

    if let Some(ref model) = config.frontal_model {
        match OnnxGanStage::new(model, Box::new(ImageFileWriter::new())) {
            Ok(stage) => stages.push(Box::new(stage)),
            Err(e) => log::warn!("Local frontalization model unavailable: {e}"),
        }
    }
    if config.remote.enabled {
        match GeminiStage::from_config(&config.remote, Box::new(ImageFileWriter::new())) {
            Ok(stage) => stages.push(Box::new(stage)),
            Err(e) => log::warn!("Remote frontalization disabled: {e}"),
        }
    }
    stages.push(Box::new(MirrorStage::new(Box::new(ImageFileWriter::new()))));

    let chain = FrontalizerChain::new(stages);
    log::info!("Frontalization stages: {}", chain.stage_names().join(" -> "));
    chain
}

/// Expands directories into their image files, sorted by name.
fn collect_faces(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut faces = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries = fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image(p))
                .collect::<Vec<_>>();
            entries.sort();
            faces.extend(entries);
        } else {
            faces.push(input.clone());
        }
    }
    if faces.is_empty() {
        return Err("No face images given".into());
    }
    Ok(faces)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            REFERENCE_IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}
