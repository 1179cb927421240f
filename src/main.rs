use dotenv::dotenv;
use env_logger::Env;

mod config;
mod models;
mod services;
mod utils;

use config::AppConfig;
use services::CardPipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载.env文件
    dotenv().ok();

    // 初始化日志
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env()?;
    log::info!(
        "输出模式: {:?}，牌堆清单: {}",
        config.output_mode,
        config.decks_file.display()
    );

    let pipeline = CardPipeline::new(&config)?;
    let report = pipeline.run().await?;
    if report.save_written {
        log::info!("存档已更新: {}", config.save_game_path.display());
    }

    if !report.is_success() {
        for (deck, err) in &report.failed {
            log::error!("牌堆 '{}': {}", deck, err);
        }
        let names: Vec<&str> = report.failed.iter().map(|(deck, _)| deck.as_str()).collect();
        anyhow::bail!("{} 个牌堆处理失败: {}", names.len(), names.join(", "));
    }

    for summary in &report.succeeded {
        log::info!(
            "牌堆 '{}': {} 张卡牌，{} 个图片文件",
            summary.deck,
            summary.card_count,
            summary.images.len()
        );
        if let Some(r) = &summary.reconcile {
            log::info!(
                "存档牌堆 '{}': {} -> {} 张，起始 ID {}，重新编号: {}",
                r.deck,
                r.before,
                r.after,
                r.base_id,
                r.renumbered
            );
        }
    }
    Ok(())
}
