use rand::Rng;
use std::path::PathBuf;

use crate::config::{AppConfig, OutputMode};
use crate::models::{CardRecord, DeckSpec, IconMap, SaveDocument};
use crate::services::deck_reconciler::{adjust_deck_size, sheet_rows, ReconcileReport};
use crate::services::drive_uploader::DriveUploader;
use crate::utils::data_loader::{load_card_records, load_deck_manifest, load_icon_map};
use crate::utils::error::{AppError, AppResult};
use crate::utils::image_renderer::{export_print_pages, export_sheet};
use crate::utils::save_parser::{load_save_document, write_save_document};

const SHEET_MIME_TYPE: &str = "image/png";

/// 单个牌堆的处理结果
#[derive(Debug)]
pub struct DeckSummary {
    pub deck: String,
    pub card_count: usize,
    pub images: Vec<PathBuf>,
    pub reconcile: Option<ReconcileReport>,
}

/// 整次运行的结果，失败的牌堆不会中断其他牌堆
#[derive(Debug, Default)]
pub struct RunReport {
    pub succeeded: Vec<DeckSummary>,
    pub failed: Vec<(String, AppError)>,
    pub save_written: bool,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 逐个同步牌堆，返回每个牌堆各自的结果
pub fn reconcile_decks<R: Rng + ?Sized>(
    document: &mut SaveDocument,
    decks: &[(String, Vec<String>)],
    rng: &mut R,
) -> Vec<(String, AppResult<ReconcileReport>)> {
    decks
        .iter()
        .map(|(nickname, labels)| {
            let result = adjust_deck_size(document, nickname, labels, rng);
            if let Err(e) = &result {
                log::error!("同步牌堆 '{}' 失败: {}", nickname, e);
            }
            (nickname.clone(), result)
        })
        .collect()
}

pub struct CardPipeline<'a> {
    config: &'a AppConfig,
    icons: IconMap,
    uploader: Option<DriveUploader>,
}

impl<'a> CardPipeline<'a> {
    pub fn new(config: &'a AppConfig) -> AppResult<Self> {
        config.validate()?;
        let icons = load_icon_map(&config.icons_file)?;
        let uploader = match (config.output_mode, &config.drive_access_token) {
            (OutputMode::Upload, Some(token)) => {
                Some(DriveUploader::new(config.drive_upload_url.clone(), token.clone()))
            }
            _ => None,
        };
        Ok(Self {
            config,
            icons,
            uploader,
        })
    }

    fn render(&self, deck: &DeckSpec, records: &[CardRecord]) -> AppResult<Vec<PathBuf>> {
        match self.config.output_mode {
            OutputMode::Printer => {
                export_print_pages(records, &self.icons, &self.config.output_dir, &deck.name)
            }
            OutputMode::Sheet | OutputMode::Upload => {
                let path = export_sheet(
                    records,
                    &self.icons,
                    sheet_rows(records.len()),
                    &self.config.output_dir,
                    &deck.sheet_file_name(),
                )?;
                Ok(vec![path])
            }
        }
    }

    /// 渲染并上传，返回摘要以及需要同步到存档的卡牌标题
    async fn process_deck(&self, deck: &DeckSpec) -> AppResult<(DeckSummary, Option<Vec<String>>)> {
        let csv_path = self.config.data_dir.join(deck.csv_file_name());
        let records = load_card_records(&csv_path)?;
        log::info!("牌堆 '{}' 共 {} 张卡牌", deck.name, records.len());

        let images = self.render(deck, &records)?;

        let mut titles = None;
        if let Some(uploader) = &self.uploader {
            let target = deck.upload_target.as_deref().ok_or_else(|| {
                AppError::ConfigError(format!("牌堆 '{}' 未配置 upload_target", deck.name))
            })?;
            uploader.upload_image(&images[0], target, SHEET_MIME_TYPE).await?;
            titles = Some(records.iter().map(|r| r.title.clone()).collect());
        }

        let summary = DeckSummary {
            deck: deck.name.clone(),
            card_count: records.len(),
            images,
            reconcile: None,
        };
        Ok((summary, titles))
    }

    /// 处理清单中的全部牌堆，有牌堆同步成功时写回一次存档
    pub async fn run(&self) -> AppResult<RunReport> {
        let manifest = load_deck_manifest(&self.config.decks_file)?;
        let mut document = match self.config.output_mode {
            OutputMode::Upload => Some(load_save_document(&self.config.save_game_path)?),
            _ => None,
        };

        let mut report = RunReport::default();
        let mut pending = Vec::new();
        for deck in &manifest.decks {
            match self.process_deck(deck).await {
                Ok((summary, titles)) => {
                    if let Some(titles) = titles {
                        pending.push((deck.save_nickname(), titles));
                    }
                    report.succeeded.push(summary);
                }
                Err(e) => {
                    log::error!("牌堆 '{}' 处理失败: {}", deck.name, e);
                    report.failed.push((deck.name.clone(), e));
                }
            }
        }

        if let Some(document) = document.as_mut() {
            let results = reconcile_decks(document, &pending, &mut rand::rng());
            let mut any_reconciled = false;
            for (nickname, result) in results {
                let Some(index) = report
                    .succeeded
                    .iter()
                    .position(|s| DeckSpec::nickname_for(&s.deck) == nickname)
                else {
                    continue;
                };
                match result {
                    Ok(reconciled) => {
                        report.succeeded[index].reconcile = Some(reconciled);
                        any_reconciled = true;
                    }
                    Err(e) => {
                        let summary = report.succeeded.remove(index);
                        report.failed.push((summary.deck, e));
                    }
                }
            }

            if any_reconciled {
                write_save_document(&self.config.save_game_path, document)?;
                report.save_written = true;
            }
        }

        log::info!(
            "处理完成: 成功 {} 个，失败 {} 个",
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::save::fixtures::{bag, deck, document};
    use crate::services::drive_uploader::mock;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::fs;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn workspace(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tts-cardgen-{}-{}", std::process::id(), name));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn one_missing_deck_does_not_stop_the_others() {
        let mut doc = document(vec![
            deck("warrior_deck", &[5201, 5200], &["a", "b"]),
            bag("box", vec![deck("mage_deck", &[300], &["x"])]),
        ]);
        let decks = vec![
            ("warrior_deck".to_string(), labels(&["Cleave", "Parry", "Bash"])),
            ("ghost_deck".to_string(), labels(&["Boo"])),
            ("mage_deck".to_string(), labels(&["Fireball"])),
        ];

        let results = reconcile_decks(&mut doc, &decks, &mut SmallRng::seed_from_u64(1));

        assert_eq!(results.len(), 3);
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(AppError::DeckNotFound(ref n)) if n == "ghost_deck"));
        assert_eq!(results[2].1.as_ref().unwrap().after, 1);
        assert_eq!(
            doc.object_states[0].deck_ids.as_deref(),
            Some(&[5200, 5201, 5202][..])
        );
    }

    #[tokio::test]
    async fn sheet_mode_renders_without_touching_save() {
        let dir = workspace("pipeline-sheet");
        fs::write(dir.join("decks.yaml"), "decks:\n  - name: warrior\n").unwrap();
        fs::write(dir.join("warrior_deck.csv"), "title,description\nCleave,Hit\nParry,Block\n").unwrap();

        let config = AppConfig {
            output_mode: OutputMode::Sheet,
            save_game_path: dir.join("missing_save.json"),
            decks_file: dir.join("decks.yaml"),
            icons_file: dir.join("icons.yaml"),
            data_dir: dir.clone(),
            output_dir: dir.join("_output"),
            ..AppConfig::default()
        };

        let report = CardPipeline::new(&config).unwrap().run().await.unwrap();

        assert!(report.is_success());
        assert!(!report.save_written);
        assert_eq!(report.succeeded[0].card_count, 2);
        assert!(dir.join("_output").join("warrior.png").exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn upload_mode_uploads_then_patches_save() {
        let dir = workspace("pipeline-upload");
        fs::write(
            dir.join("decks.yaml"),
            "decks:\n  - name: warrior\n    upload_target: sheet-file-id\n",
        )
        .unwrap();
        fs::write(dir.join("warrior_deck.csv"), "title\nCleave\nParry\nBash\n").unwrap();
        let save_path = dir.join("save.json");
        let doc = document(vec![bag(
            "Warrior box",
            vec![deck("warrior_deck", &[5203, 5201, 5202, 5204], &["a", "b", "c", "d"])],
        )]);
        fs::write(&save_path, serde_json::to_string(&doc).unwrap()).unwrap();

        let (base_url, server) = mock::serve_once("HTTP/1.1 200 OK").await;
        let config = AppConfig {
            output_mode: OutputMode::Upload,
            save_game_path: save_path.clone(),
            decks_file: dir.join("decks.yaml"),
            icons_file: dir.join("icons.yaml"),
            data_dir: dir.clone(),
            output_dir: dir.join("_output"),
            drive_access_token: Some("token".to_string()),
            drive_upload_url: base_url,
        };

        let report = CardPipeline::new(&config).unwrap().run().await.unwrap();
        let (head, _) = server.await.unwrap();

        assert!(report.is_success());
        assert!(report.save_written);
        assert!(head.contains("/sheet-file-id?"));

        let saved = load_save_document(&save_path).unwrap();
        let patched = &saved.object_states[0].contained_objects.as_ref().unwrap()[0];
        assert_eq!(patched.deck_ids.as_deref(), Some(&[5200, 5201, 5202][..]));
        let names: Vec<_> = patched
            .contained_objects
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.nickname.clone().unwrap())
            .collect();
        assert_eq!(names, ["Cleave", "Parry", "Bash"]);
        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn deck_missing_from_save_is_reported_and_save_untouched() {
        let dir = workspace("pipeline-missing");
        fs::write(
            dir.join("decks.yaml"),
            "decks:\n  - name: warrior\n    upload_target: sheet-file-id\n",
        )
        .unwrap();
        fs::write(dir.join("warrior_deck.csv"), "title\nCleave\n").unwrap();
        let save_path = dir.join("save.json");
        let doc = document(vec![deck("mage_deck", &[300], &["Fireball"])]);
        fs::write(&save_path, serde_json::to_string(&doc).unwrap()).unwrap();

        let (base_url, server) = mock::serve_once("HTTP/1.1 200 OK").await;
        let config = AppConfig {
            output_mode: OutputMode::Upload,
            save_game_path: save_path.clone(),
            decks_file: dir.join("decks.yaml"),
            icons_file: dir.join("icons.yaml"),
            data_dir: dir.clone(),
            output_dir: dir.join("_output"),
            drive_access_token: Some("token".to_string()),
            drive_upload_url: base_url,
        };

        let report = CardPipeline::new(&config).unwrap().run().await.unwrap();
        server.await.unwrap();

        assert!(report.succeeded.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "warrior");
        assert!(matches!(report.failed[0].1, AppError::DeckNotFound(ref n) if n == "warrior_deck"));
        assert!(!report.save_written);
        assert_eq!(load_save_document(&save_path).unwrap(), doc);
        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn deck_without_upload_target_fails_alone() {
        let dir = workspace("pipeline-no-target");
        fs::write(dir.join("decks.yaml"), "decks:\n  - name: rogue\n").unwrap();
        fs::write(dir.join("rogue_deck.csv"), "title\nStab\n").unwrap();
        let save_path = dir.join("save.json");
        let doc = document(vec![deck("rogue_deck", &[100], &["a"])]);
        fs::write(&save_path, serde_json::to_string(&doc).unwrap()).unwrap();

        let config = AppConfig {
            output_mode: OutputMode::Upload,
            save_game_path: save_path.clone(),
            decks_file: dir.join("decks.yaml"),
            icons_file: dir.join("icons.yaml"),
            data_dir: dir.clone(),
            output_dir: dir.join("_output"),
            drive_access_token: Some("token".to_string()),
            drive_upload_url: "http://127.0.0.1:9".to_string(),
        };

        let report = CardPipeline::new(&config).unwrap().run().await.unwrap();

        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0].1, AppError::ConfigError(_)));
        assert!(!report.save_written);
        assert_eq!(load_save_document(&save_path).unwrap(), doc);
        fs::remove_dir_all(&dir).ok();
    }
}
