use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vehicle_vision::cli::{Cli, Commands};
use vehicle_vision::client::HttpService;
use vehicle_vision::config::Config;
use vehicle_vision::download::DownloadCoordinator;
use vehicle_vision::input::load_subjects;
use vehicle_vision::notify::ConsoleNotifier;
use vehicle_vision::orchestrator::Orchestrator;
use vehicle_vision::progress::Spinner;
use vehicle_vision::render::{render, write_preview};
use vehicle_vision::session::run_interactive_session;
use vehicle_vision_common::{Operation, PreviewImage};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let Cli {
        command,
        verbose,
        server,
        mime,
        preview,
    } = Cli::parse();
    init_tracing(verbose);

    let mut config = Config::load().context("設定ファイルの読み込みに失敗しました")?;
    let server_url = config.resolve_server_url(server.as_deref());
    tracing::debug!(%server_url, "サーバーURL");

    let ctx = RunContext {
        server_url: server_url.clone(),
        mime: mime.clone(),
        preview: preview.or_else(|| {
            config
                .save_preview
                .then(|| config.download_dir().join("preview"))
        }),
    };

    match command {
        Commands::Image { files } => run_single(&ctx, Operation::ImageDetection, &files, None).await,
        Commands::DetectVideo { files } => {
            run_single(&ctx, Operation::VideoDetection, &files, None).await
        }
        Commands::Track {
            files,
            download,
            output,
        } => {
            let download_dir = download.then(|| output.unwrap_or_else(|| config.download_dir()));
            run_single(&ctx, Operation::VideoTracking, &files, download_dir).await
        }

        Commands::Session => {
            let service = HttpService::new(&server_url)?;
            let orchestrator = Orchestrator::new(
                service,
                ConsoleNotifier,
                DownloadCoordinator::new(config.download_dir()),
            );
            run_interactive_session(&orchestrator, mime.as_deref()).await?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Health => {
            let service = HttpService::new(&server_url)?;
            println!("🩺 {}", service.health_url());

            let status = {
                let _spinner = Spinner::start("接続確認中...");
                service.health_check().await
            };
            match status {
                Ok(status) => {
                    println!("✔ status: {}", status.status);
                    println!(
                        "  モデル: {}",
                        if status.model_loaded { "読み込み済み" } else { "未読み込み" }
                    );
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("✖ {}", e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::Config { set_server, set_download_dir, set_save_preview, show } => {
            let mut changed = false;

            if let Some(url) = set_server {
                config.set_server_url(url)?;
                println!("✔ サーバーURLを設定しました: {}", config.server_url);
                changed = true;
            }
            if let Some(dir) = set_download_dir {
                config.set_download_dir(dir);
                println!("✔ ダウンロード先を設定しました: {}", config.download_dir().display());
                changed = true;
            }
            if let Some(save) = set_save_preview {
                config.save_preview = save;
                println!("✔ プレビュー自動保存: {}", if save { "有効" } else { "無効" });
                changed = true;
            }
            if changed {
                config.save()?;
            }

            if show || !changed {
                println!("設定:");
                println!("  パス: {}", Config::config_path()?.display());
                println!("  サーバーURL: {}", config.server_url);
                println!("  使用中のURL: {}", server_url);
                println!("  ダウンロード先: {}", config.download_dir().display());
                println!(
                    "  プレビュー自動保存: {}",
                    if config.save_preview { "有効" } else { "無効" }
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "vehicle_vision=debug,vehicle_vision_common=debug,warn"
    } else {
        "vehicle_vision=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// 単発コマンドの実行設定
struct RunContext {
    server_url: String,
    mime: Option<String>,
    preview: Option<PathBuf>,
}

/// ファイル選択 → 解析 → 表示（→ ダウンロード）
async fn run_single(
    ctx: &RunContext,
    operation: Operation,
    files: &[PathBuf],
    download_dir: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    println!("🚗 vehicle-vision - {}\n", operation);

    let subjects = load_subjects(files, ctx.mime.as_deref())?;
    let service = HttpService::new(&ctx.server_url)?;
    let downloads = DownloadCoordinator::new(download_dir.clone().unwrap_or_else(|| PathBuf::from(".")));
    let orchestrator = Orchestrator::new(service, ConsoleNotifier, downloads);

    if orchestrator.select_files(subjects).is_err() {
        return Ok(ExitCode::FAILURE);
    }
    if let Some(subject) = orchestrator.subject() {
        println!("- {} ({}, {})", subject.name(), subject.kind(), subject.size_label());
    }

    let outcome = {
        let _spinner = Spinner::start(format!("{}中...", operation));
        match operation {
            Operation::ImageDetection => orchestrator.run_image_detection().await,
            Operation::VideoDetection => orchestrator.run_video_detection().await,
            Operation::VideoTracking => orchestrator.run_video_tracking().await,
        }
    };

    let projection = orchestrator.projection();
    println!();
    print!("{}", render(&projection));

    if outcome.is_err() {
        return Ok(ExitCode::FAILURE);
    }

    if let (Some(path), Some(preview)) = (ctx.preview.as_deref(), projection.preview()) {
        save_preview(preview, path)?;
    }

    if download_dir.is_some() {
        let downloaded = {
            let _spinner = Spinner::start("ダウンロード中...");
            orchestrator.download_current().await
        };
        if downloaded.is_err() {
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn save_preview(preview: &PreviewImage, path: &Path) -> anyhow::Result<()> {
    let saved = write_preview(preview, path)
        .with_context(|| format!("プレビューの保存に失敗しました: {}", path.display()))?;
    println!("✔ プレビューを保存: {}", saved.display());
    Ok(())
}
