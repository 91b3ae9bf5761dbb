//! Проверка окружения OpenCL: описание найденных GPU устройств и прогон
//! зарегистрированных проверок

mod checks;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use opencl_kit::{
    discover_all,
    opencl::callbacks::reported_errors,
    opencl::info::{describe, platform_name, DeviceReport},
    utils::measure_time,
    DeviceId, PlatformDevices, PlatformId,
};
use prettytable::{row, Table};
use std::path::PathBuf;
use std::process::ExitCode;

use checks::{registry, HarnessConfig};

#[derive(Debug, Parser)]
#[command(about = "Runs OpenCL checks on the first GPU device found")]
struct Args {
    /// Каталог с исходным кодом ядер (.cl) и входными изображениями
    #[arg(long, default_value = "resources")]
    resources: PathBuf,

    /// Каталог для изображений, которые пишут проверки
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Запустить только одну проверку
    #[arg(long)]
    only: Option<String>,

    /// Вывести имена проверок и выйти
    #[arg(long)]
    list: bool,

    /// Описание устройств в JSON вместо таблиц
    #[arg(long)]
    json: bool,

    /// Без индикатора прогресса
    #[arg(long)]
    no_progress: bool,
}

fn print_reports(reports: &[(Option<String>, usize, DeviceReport)], json: bool) -> Result<()> {
    if json {
        let value: Vec<_> = reports
            .iter()
            .map(|(platform, index, report)| {
                serde_json::json!({
                    "platform": platform,
                    "device": index,
                    "info": report,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (platform, index, report) in reports {
        println!("----");
        println!("device {}:", index);
        println!("----");
        let mut table = Table::new();
        table.add_row(row!["CL_PLATFORM_NAME", platform.as_deref().unwrap_or("")]);
        for (label, value) in report.lines() {
            table.add_row(row![label, value]);
        }
        table.printstd();
    }
    Ok(())
}

/// Устройства всех платформ со сквозной нумерацией
fn numbered_devices(platform_devices: &PlatformDevices) -> Vec<(PlatformId, usize, DeviceId)> {
    platform_devices
        .iter()
        .flat_map(|(platform, devices)| devices.iter().map(move |device| (*platform, *device)))
        .enumerate()
        .map(|(index, (platform, device))| (platform, index, device))
        .collect()
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let checks = registry();
    if args.list {
        for check in &checks {
            println!("{}", check.name);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let platform_devices = discover_all();
    if platform_devices.is_empty() {
        eprintln!("no gpu platforms / devices found");
        return Ok(ExitCode::FAILURE);
    }

    let reports: Vec<_> = numbered_devices(&platform_devices)
        .into_iter()
        .map(|(platform, index, device)| (platform_name(platform), index, describe(device)))
        .collect();
    print_reports(&reports, args.json)?;

    let selected: Vec<_> = checks
        .into_iter()
        .filter(|check| args.only.as_deref().map_or(true, |only| only == check.name))
        .collect();
    if selected.is_empty() {
        eprintln!("no check named {}", args.only.as_deref().unwrap_or(""));
        return Ok(ExitCode::FAILURE);
    }

    let config = HarnessConfig {
        resources: args.resources,
        output_dir: args.output_dir,
    };

    let pb = if args.no_progress {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(selected.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut failed = 0;
    for check in &selected {
        pb.set_message(check.name);
        pb.suspend(|| {
            println!("----");
            println!("{} : begin", check.name);
            println!("----");
        });

        let (result, duration) = measure_time(|| (check.run)(&config));
        pb.suspend(|| match result {
            Ok(()) => println!("{} : pass ({:.2?})", check.name, duration),
            Err(e) => {
                failed += 1;
                log::error!("{}: {:#}", check.name, e);
                eprintln!("{} : fail", check.name);
            }
        });
        pb.suspend(|| println!("----"));
        pb.inc(1);
    }
    pb.finish_and_clear();

    let reported = reported_errors();
    if reported > 0 {
        log::warn!("driver reported {} asynchronous error(s) during the checks", reported);
    }

    if failed > 0 {
        eprintln!("{} of {} check(s) failed", failed, selected.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
