mod batch;
mod config;
mod crawler;
mod parser;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use batch::{BatchDriver, PaperResult};
use config::AppConfig;
use crawler::{ArxivClient, ResolutionRequest};
use parser::ExtractionPipeline;
use utils::logger;

#[derive(Parser)]
#[command(name = "texharvest")]
#[command(about = "下载 arXiv 论文PDF与TeX源码，并提取其中的图表环境", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 生成默认配置
    Init,
    /// 批量处理索引文件中的全部论文
    Run {
        /// 索引文件，可重复；缺省使用配置中的列表
        #[arg(short, long)]
        index: Vec<PathBuf>,
        /// 输出根目录
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 处理单篇论文
    Fetch {
        /// arXiv ID
        #[arg(long, conflicts_with = "query", required_unless_present = "query")]
        id: Option<String>,
        /// 按标题或关键词检索，取相关度最高的结果
        #[arg(short, long)]
        query: Option<String>,
        #[arg(long, default_value_t = 1)]
        max_results: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 对已下载源码包的目录重新解压并提取图表
    Extract {
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init_logger();
    info!("texharvest 启动");

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_command().await?;
        }
        Commands::Run { index, output } => {
            run_command(index, output).await?;
        }
        Commands::Fetch { id, query, max_results, output } => {
            let request = match (id, query) {
                (Some(id), _) => ResolutionRequest::ByIdentifier(id),
                (None, Some(text)) => ResolutionRequest::ByQuery { text, max_results },
                (None, None) => anyhow::bail!("需要 --id 或 --query"),
            };
            fetch_command(request, output).await?;
        }
        Commands::Extract { dir } => {
            extract_command(dir)?;
        }
    }

    Ok(())
}

async fn init_command() -> Result<()> {
    info!("初始化配置...");

    let app_config = AppConfig::default();
    app_config.save(config::CONFIG_PATH)?;
    info!("已生成配置文件: {}", config::CONFIG_PATH);

    tokio::fs::create_dir_all(&app_config.batch.output_root).await?;
    info!("输出目录: {}", app_config.batch.output_root.display());

    info!("下一步:");
    info!("  1. 编辑 {} 中的 [batch] index_files", config::CONFIG_PATH);
    info!("  2. 运行 'texharvest run' 开始批处理");
    Ok(())
}

fn build_driver(app_config: &AppConfig) -> Result<BatchDriver<ArxivClient>> {
    let client = ArxivClient::new(&app_config.arxiv)?;
    let pipeline = ExtractionPipeline::new(&app_config.extractor)?;
    Ok(BatchDriver::new(
        client,
        pipeline,
        Duration::from_millis(app_config.arxiv.request_delay_ms),
    ))
}

async fn run_command(index: Vec<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let mut app_config = AppConfig::load()?;
    if !index.is_empty() {
        app_config.batch.index_files = index;
    }
    if let Some(output) = output {
        app_config.batch.output_root = output;
    }

    info!(
        "开始批处理: {} 个索引文件 -> {}",
        app_config.batch.index_files.len(),
        app_config.batch.output_root.display()
    );

    let driver = build_driver(&app_config)?;
    let report = driver.run(&app_config.batch).await;

    let report_path = app_config.batch.output_root.join(&app_config.batch.report_file);
    report.save(&report_path)?;
    info!("报告已写入: {}", report_path.display());

    info!("✅ 批处理结束: {} 成功, {} 失败", report.succeeded(), report.failed());
    Ok(())
}

async fn fetch_command(request: ResolutionRequest, output: Option<PathBuf>) -> Result<()> {
    let app_config = AppConfig::load()?;
    let output_root = output.unwrap_or_else(|| app_config.batch.output_root.clone());

    let driver = build_driver(&app_config)?;
    let outcome = driver.process_paper(&request, &output_root).await;

    match outcome.result {
        PaperResult::Succeeded(artifacts) => {
            info!("标题: {}", artifacts.title);
            info!("作者: {}", artifacts.authors.join(", "));
            info!("PDF: {}", artifacts.pdf_path.display());
            info!("TeX 文件: {}", artifacts.extraction.tex_dir.display());
            info!("图: {} ({} 个)", artifacts.extraction.figures_path.display(), artifacts.extraction.figure_count);
            info!("表: {} ({} 个)", artifacts.extraction.tables_path.display(), artifacts.extraction.table_count);
        }
        PaperResult::Failed { stage, reason } => {
            error!("❌ {} 在 {:?} 阶段失败: {}", outcome.identifier, stage, reason);
        }
    }
    Ok(())
}

fn extract_command(dir: PathBuf) -> Result<()> {
    let app_config = AppConfig::load()?;
    let pipeline = ExtractionPipeline::new(&app_config.extractor)?;

    let output = pipeline.process(&dir, &dir)?;
    info!("TeX 文件: {}", output.tex_dir.display());
    info!("图: {} ({} 个)", output.figures_path.display(), output.figure_count);
    info!("表: {} ({} 个)", output.tables_path.display(), output.table_count);
    Ok(())
}
