//! hsi-annotate CLI: enumerate measurements, record point annotations and
//! extract reflectance spectra.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use env_logger::{Builder, Env};

use hsi_annotate::catalog::enumerate;
use hsi_annotate::config::AppConfig;
use hsi_annotate::data::{LoaderRegistry, ProcessingMode};
use hsi_annotate::model::Coordinate;
use hsi_annotate::pipeline::{BatchOptions, calibrate_file, collect_annotations, run_batch};
use hsi_annotate::store::{AnnotationLog, TableFormat, save_json};
use hsi_annotate::viewer::{ScriptedDisplay, ViewerEvent, open_all, render_band};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "hsi-annotate")]
#[command(about = "Point annotation and spectrum extraction for hyperspectral skin measurements")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Measurement file extension to enumerate (overrides config)
    #[arg(long, global = true)]
    extension: Option<String>,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List measurement files grouped by patient and body part.
    Enumerate {
        /// Image root (`<root>/<patient>/<body_part>/<files>`)
        #[arg(long)]
        root: PathBuf,

        /// Write the catalog as JSON instead of printing a summary
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Resolve annotation records to measurement files.
    Map {
        #[arg(long)]
        root: PathBuf,

        /// Annotation CSV
        #[arg(long)]
        annotations: PathBuf,

        /// Directory of interactive annotation logs to include
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Mapping JSON to write
        #[arg(long)]
        out: PathBuf,
    },

    /// Extract averaged spectra for all annotations and export a table.
    Extract(ExtractArgs),

    /// Record one point annotation on each given measurement.
    Annotate(AnnotateArgs),

    /// Render one spectral band as a grayscale PNG.
    Render {
        #[arg(long)]
        file: PathBuf,

        #[arg(long, default_value = "0")]
        band: usize,

        #[arg(long)]
        out: PathBuf,
    },

    /// Convert a raw measurement to reflectance with dark/white references.
    Calibrate {
        #[arg(long)]
        raw: PathBuf,

        #[arg(long)]
        dark: PathBuf,

        #[arg(long)]
        white: PathBuf,

        /// Output `.npy` holding reflectance scaled by 10000
        #[arg(long)]
        out: PathBuf,
    },

    /// Write the effective configuration as JSON.
    Config {
        /// Target file (defaults to the user config directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
struct ExtractArgs {
    #[arg(long)]
    root: PathBuf,

    /// Annotation CSV
    #[arg(long)]
    annotations: Option<PathBuf>,

    /// Directory of interactive annotation logs to include
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Spectrum table (`.csv` or `.xlsx`)
    #[arg(long)]
    out: PathBuf,

    /// Also write the records as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Averaging window size (overrides config)
    #[arg(long)]
    kernel_size: Option<usize>,
}

#[derive(Debug, Clone, Args)]
struct AnnotateArgs {
    /// Measurement file (repeatable; files that fail to load are skipped)
    #[arg(long = "file", required = true)]
    files: Vec<PathBuf>,

    /// Column of the clicked pixel
    #[arg(long, allow_negative_numbers = true)]
    x: i64,

    /// Row of the clicked pixel
    #[arg(long, allow_negative_numbers = true)]
    y: i64,

    /// Annotation type, e.g. lesion, scar, skin
    #[arg(long = "type")]
    annotation_type: String,

    /// Band shown while annotating
    #[arg(long, default_value = "0")]
    band: usize,

    /// Root of the annotation logs (overrides config)
    #[arg(long)]
    annotation_dir: Option<PathBuf>,

    /// Save the shown band of each file as `<stem>_band<N>.png` in this directory
    #[arg(long)]
    png_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = config.preferences.log_level.raised(cli.verbose);
    Builder::from_env(Env::default().default_filter_or(level.to_level_filter().to_string()))
        .format_timestamp_secs()
        .init();

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<AppConfig> {
    match path {
        Some(path) => Ok(AppConfig::load_from_path(path)?),
        None => Ok(AppConfig::load_from_default_path().unwrap_or_default()),
    }
}

fn run(cli: Cli, config: AppConfig) -> CliResult<()> {
    let prefs = config.preferences.clone();
    let extension = cli
        .extension
        .unwrap_or_else(|| prefs.measurement_extension.clone());
    let registry = LoaderRegistry::new(prefs.processing_mode);
    log::debug!("Loaders for {:?}", registry.supported_extensions());

    match cli.command {
        Commands::Enumerate { root, out } => {
            let catalog = enumerate(&root, &extension);
            match out {
                Some(out) => save_json(&catalog, &out)?,
                None => {
                    for (patient, body_part, files) in catalog.iter() {
                        println!("{}/{}: {} files", patient, body_part, files.len());
                    }
                    println!(
                        "{} patients, {} files",
                        catalog.patients().count(),
                        catalog.total_files()
                    );
                }
            }
            Ok(())
        }

        Commands::Map {
            root,
            annotations,
            log_dir,
            out,
        } => {
            let catalog = enumerate(&root, &extension);
            let map = collect_annotations(&catalog, Some(&annotations), log_dir.as_deref())?;
            let unresolved = map.unresolved().count();
            if unresolved > 0 {
                log::warn!("{} annotations matched no measurement file", unresolved);
            }
            save_json(&map, &out)?;
            log::info!("Mapped {} annotations to {:?}", map.len(), out);
            Ok(())
        }

        Commands::Extract(args) => {
            let mut table_out = args.out;
            if TableFormat::from_path(&table_out).is_none() {
                table_out.set_extension(prefs.table_format.extension());
            }

            let options = BatchOptions {
                root: args.root,
                extension,
                annotations: args.annotations,
                log_dir: args.log_dir,
                kernel_size: args.kernel_size.unwrap_or(prefs.kernel_size),
                table_out,
                json_out: args.json,
            };
            let summary = run_batch(&options, &registry)?;
            println!(
                "{} files, {} annotations, {} spectra",
                summary.files, summary.annotations, summary.spectra
            );
            Ok(())
        }

        Commands::Annotate(args) => {
            let log = AnnotationLog::new(args.annotation_dir.unwrap_or(prefs.annotation_dir));
            let annotators = open_all(&registry, &args.files, &log);
            if annotators.is_empty() {
                return Err("No measurement could be opened".into());
            }
            if annotators.len() < args.files.len() {
                log::warn!(
                    "Annotating {} of {} files",
                    annotators.len(),
                    args.files.len()
                );
            }

            if let Some(dir) = &args.png_dir {
                std::fs::create_dir_all(dir)?;
            }

            let mut saved = 0;
            for annotator in &annotators {
                if let Some(dir) = &args.png_dir {
                    let stem = annotator
                        .path()
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let png = dir.join(format!("{}_band{}.png", stem, args.band));
                    annotator.save_band_png(args.band, &png)?;
                }

                let mut display = ScriptedDisplay::new([
                    ViewerEvent::SelectBand(args.band),
                    ViewerEvent::Click(Coordinate::new(args.x, args.y)),
                ]);
                let Some(click) = annotator.select_point(&mut display) else {
                    log::warn!("No point selected on {:?}, nothing saved", annotator.path());
                    continue;
                };

                match annotator.confirm(args.annotation_type.as_str().into(), click) {
                    Ok(written) => {
                        println!("{}", written.display());
                        saved += 1;
                    }
                    Err(e) => log::error!("Skipping {:?}: {}", annotator.path(), e),
                }
            }

            if saved == 0 {
                return Err("No annotation saved".into());
            }
            Ok(())
        }

        Commands::Render { file, band, out } => {
            let cube = registry.load_cube(&file)?;
            let img = render_band(&cube, band).ok_or_else(|| {
                format!(
                    "Band {} out of range ({} bands in {:?})",
                    band,
                    cube.band_count(),
                    file
                )
            })?;
            img.save(&out)?;
            log::info!("Wrote band {} of {:?} to {:?}", band, file, out);
            Ok(())
        }

        Commands::Calibrate {
            raw,
            dark,
            white,
            out,
        } => {
            let raw_registry = LoaderRegistry::new(ProcessingMode::Raw);
            calibrate_file(&raw_registry, &raw, &dark, &white, &out)?;
            Ok(())
        }

        Commands::Config { out } => {
            let path = out
                .or_else(AppConfig::default_path)
                .ok_or("Could not determine config directory")?;
            config.save_to_path(&path)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
