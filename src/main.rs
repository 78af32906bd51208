use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use eframe::egui;

use roof_annotate::app::{AnnotateApp, AppOptions};
use roof_annotate::config::Config;
use roof_annotate::image_layer::ImageSource;

#[derive(Parser, Debug)]
#[command(name = "roof-annotate")]
#[command(version, about = "Draw polygon annotations over an image and export them as PNG")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,

    /// Image shown at startup instead of the bundled example
    #[arg(long, short = 'i', value_name = "PATH")]
    image: Option<PathBuf>,

    /// Write exports to this file without asking
    #[arg(long, short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    let default_image = match cli.image.or_else(|| config.image.default_path.clone()) {
        Some(path) => ImageSource::File(path),
        None => ImageSource::Bundled,
    };
    log::info!(
        "surface {}x{}, starting with {}",
        config.surface.width,
        config.surface.height,
        default_image.label()
    );

    let title = "roof-annotate";
    let inner_size = [
        config.surface.width as f32 + 40.0,
        config.surface.height as f32 + 100.0,
    ];
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(inner_size)
            .with_title(title),
        ..Default::default()
    };

    let app_options = AppOptions {
        config,
        default_image,
        export_path: cli.output,
    };

    eframe::run_native(
        title,
        options,
        Box::new(move |cc| {
            let app = AnnotateApp::new(&cc.egui_ctx, app_options)?;
            Ok(Box::new(app))
        }),
    )
    .map_err(|err| anyhow::anyhow!("failed to run eframe: {err}"))
}
