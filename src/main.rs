//! finmark 命令行入口
//!
//! 读取本地HTML（文件或标准输入），经远端网关分类金融术语并写出
//! 已标注的文档。

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use finmark::core::{FinmarkOptions, annotate_document_from_data};

#[derive(Parser)]
#[command(name = "finmark", version, about = "为银行页面标注金融术语并注入悬浮提示")]
struct Cli {
    /// 输入HTML文件，使用 - 读取标准输入
    input: String,

    /// 输出文件路径，缺省写到标准输出
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 分类网关地址
    #[arg(long)]
    api_url: Option<String>,

    /// 配置文件路径（TOML）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 对文档执行的扫描轮数
    #[arg(long, default_value_t = 1)]
    passes: usize,

    /// 每批候选词上限
    #[arg(long)]
    batch_size: Option<usize>,

    /// 输入编码（缺省从文档声明嗅探）
    #[arg(short, long)]
    encoding: Option<String>,

    /// 网关请求超时（秒），0表示使用配置值
    #[arg(short, long, default_value_t = 0)]
    timeout: u64,

    /// 不注入悬浮层样式与脚本
    #[arg(long)]
    no_overlay: bool,

    /// 静默模式，不输出日志
    #[arg(short, long)]
    silent: bool,
}

fn read_input(path: &str) -> io::Result<Vec<u8>> {
    if path == "-" {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read(path)
    }
}

fn write_output(target: Option<&Path>, data: &[u8]) -> io::Result<()> {
    match target {
        Some(path) => fs::write(path, data),
        None => io::stdout().write_all(data),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.silent {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    let input_data = match read_input(&cli.input) {
        Ok(data) => data,
        Err(error) => {
            eprintln!("finmark: 读取 {} 失败: {}", cli.input, error);
            process::exit(1);
        }
    };

    let options = FinmarkOptions {
        api_url: cli.api_url.clone(),
        batch_size: cli.batch_size,
        config_file: cli.config.clone(),
        encoding: cli.encoding.clone(),
        no_overlay: cli.no_overlay,
        passes: cli.passes,
        silent: cli.silent,
        timeout: cli.timeout,
    };

    match annotate_document_from_data(&options, input_data, cli.encoding.clone()).await {
        Ok((output, title)) => {
            if let Err(error) = write_output(cli.output.as_deref(), &output) {
                eprintln!("finmark: 写出失败: {}", error);
                process::exit(1);
            }
            if !cli.silent {
                if let Some(title) = title {
                    tracing::info!(title = %title, "标注完成");
                }
            }
        }
        Err(error) => {
            eprintln!("finmark: {}", error);
            process::exit(1);
        }
    }
}
