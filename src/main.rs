//! # 恋爱日记站点 — 命令行入口
//!
//! 用法：`love-journal <image-path> [feed|cms]`
//!
//! 按指定档位编码一张图片，并以 JSON 输出编码摘要（尺寸、质量、体积、是否触发尺寸回退）。

use std::process::ExitCode;

use love_journal::error::AppError;
use love_journal::image_handler::{EncodeProfile, ImageInput, ImageServiceState};

const USAGE: &str = "用法: love-journal <image-path> [feed|cms]";

async fn run(args: Vec<String>) -> Result<String, AppError> {
    let path = args
        .first()
        .cloned()
        .ok_or_else(|| AppError::Validation(USAGE.to_string()))?;
    let profile = match args.get(1) {
        Some(name) => EncodeProfile::from_str(name)?,
        None => EncodeProfile::default(),
    };

    log::info!("开始编码 - 文件: {} 档位: {}", path, profile.as_str());

    let service = ImageServiceState::new()?;
    let artifact = service
        .encode_with_profile(ImageInput::FilePath(path), profile)
        .await?;

    Ok(serde_json::to_string_pretty(&artifact.summary())?)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args).await {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("编码失败: {err}");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
