use anyhow::{Context, Result};
use scenecast::generator::{self, JobKind, Platform};
use scenecast::init::{self, Services};
use scenecast::Config;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

fn parse_kind(value: &str) -> Result<JobKind> {
    let kind = match value {
        "scripted" => JobKind::Scripted,
        "avatar" => JobKind::Avatar,
        "slideshow" => JobKind::Slideshow,
        "explainer" => JobKind::Explainer,
        "montage" => JobKind::Montage,
        "instagram" => JobKind::Social(Platform::Instagram),
        "youtube" => JobKind::Social(Platform::Youtube),
        "tiktok" => JobKind::Social(Platform::Tiktok),
        "linkedin" => JobKind::Social(Platform::Linkedin),
        other => anyhow::bail!(
            "unknown kind '{other}' (expected scripted, avatar, slideshow, explainer, montage, \
             instagram, youtube, tiktok or linkedin)"
        ),
    };
    Ok(kind)
}

struct Args {
    script_path: String,
    kind: JobKind,
    workspace: PathBuf,
    config_path: Option<PathBuf>,
    offline: bool,
}

fn usage() -> String {
    "usage: scenecast <script-file|-> [--kind KIND] [--workspace DIR] [--config FILE] [--offline]"
        .to_string()
}

fn parse_args(mut argv: std::env::Args) -> Result<Args> {
    argv.next();

    let mut script_path = None;
    let mut kind = JobKind::Scripted;
    let mut workspace = PathBuf::from("workspace");
    let mut config_path = None;
    let mut offline = false;

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--kind" => {
                let value = argv.next().with_context(usage)?;
                kind = parse_kind(&value)?;
            }
            "--workspace" => {
                workspace = PathBuf::from(argv.next().with_context(usage)?);
            }
            "--config" => {
                config_path = Some(PathBuf::from(argv.next().with_context(usage)?));
            }
            "--offline" => offline = true,
            "--help" | "-h" => anyhow::bail!(usage()),
            other if script_path.is_none() => script_path = Some(other.to_string()),
            other => anyhow::bail!("unexpected argument '{other}'\n{}", usage()),
        }
    }

    Ok(Args {
        script_path: script_path.with_context(usage)?,
        kind,
        workspace,
        config_path,
        offline,
    })
}

async fn read_script(path: &str) -> Result<String> {
    if path == "-" {
        let mut script = String::new();
        tokio::io::stdin()
            .read_to_string(&mut script)
            .await
            .context("read script from stdin")?;
        Ok(script)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read script file: {path}"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = parse_args(std::env::args())?;
    let script = read_script(&args.script_path).await?;

    let svc = if args.offline {
        init::ensure_workspace(&args.workspace).await?;
        Services::offline(args.workspace.clone())
    } else {
        let config = match &args.config_path {
            Some(path) => Config::load(path).await?,
            None => Config::default(),
        };
        Services::init(config, args.workspace.clone()).await?
    };

    if !init::check_ffmpeg().await {
        eprintln!("[WARNING] ffmpeg not found in PATH; segment assembly will fail.");
    }

    let outcome = generator::run_kind(&svc, &script, args.kind).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
