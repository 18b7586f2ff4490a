//! 体模端到端演示: 标注, 配准, 导出, 导入.
//!
//! 日志级别由环境变量 `ROI_LOG` 决定 (默认 `info`), 其余参数见 `roi_berry::config`.

use std::error::Error;
use std::io::{self, Write};

use log::LevelFilter;
use roi_berry::config::RoiConfig;
use simple_logger::SimpleLogger;

mod phantom;
mod report;
mod runner;

fn main() -> Result<(), Box<dyn Error>> {
    let level = std::env::var("ROI_LOG")
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    SimpleLogger::new().with_level(level).init()?;

    let config = RoiConfig::from_env()?;
    log::info!("导出目录 {}", config.export_dir.display());

    let result = runner::run(config)?;
    let mut out = io::stdout().lock();
    report::describe_into(&result, &mut out)?;
    writeln!(out)?;
    Ok(())
}
