//! 应用配置校验工具。
//!
//! 用法：`appng-check <application> [application-dir]`
//!
//! 目录默认取 `APPNG_APPLICATION_DIR/<application>`；目录下的
//! `types.json`（可选）描述绑定类型。校验出错时以非零状态退出。

mod types;

use appng_application::{ApplicationConfigProvider, DirectoryResources, LoadOptions};
use appng_config::PlatformConfig;
use appng_telemetry::{init_tracing, metrics};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!(target: "appng.check", error = %err, "check_failed");
            eprintln!("error: {}", err);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<bool, Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在）
    dotenvy::dotenv().ok();
    let config = PlatformConfig::from_env()?;
    init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(application) = args.next() else {
        return Err("usage: appng-check <application> [application-dir]".into());
    };
    let root = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.application_dir.join(&application));
    info!(
        target: "appng.check",
        application = %application,
        root = %root.display(),
        "check_started"
    );

    let registry = Arc::new(types::load_registry(&root.join("types.json"))?);
    let resources = Arc::new(DirectoryResources::new(application.clone(), root));
    // 始终完整收集问题，不在加载时提前失败
    let options = LoadOptions {
        fail_fast: false,
        detailed_errors: true,
        ..LoadOptions::from_platform(&config)
    };
    let provider = ApplicationConfigProvider::load(application.clone(), resources, registry, options)?;
    let report = provider.validate();

    for warning in &report.warnings {
        println!("WARN  {}", warning);
    }
    for message in &report.errors {
        println!("ERROR {}", message);
    }
    let snapshot = metrics().snapshot();
    println!(
        "{}: {} datasources, {} events, {} pages, {} errors, {} warnings",
        application,
        provider.datasources().len(),
        provider.events().len(),
        provider.pages().len(),
        report.errors.len(),
        report.warnings.len()
    );
    info!(
        target: "appng.check",
        application = %application,
        configs_loaded = snapshot.configs_loaded,
        resources_skipped = snapshot.resources_skipped,
        "check_finished"
    );
    Ok(report.is_valid())
}
