use resvg::usvg::{self, fontdb, Options as UsvgOptions};
use resvg::{
    render,
    tiny_skia::{Pixmap, Transform},
};
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::config::SHEET_COLUMNS;
use crate::models::{CardRecord, IconMap};
use crate::utils::error::{AppError, AppResult};

// 常量定义
const FONTS_DIR: &str = "resources/fonts";
const MAIN_FONT_NAME: &str = "DejaVu Sans";
pub const CARD_WIDTH: u32 = 410;
pub const CARD_HEIGHT: u32 = 574;
const CARD_PADDING: f64 = 18.0;
const ICON_SIZE: f64 = 44.0;

// 打印页：每页 3x3 张，四周留白放裁切线
pub const PRINT_COLUMNS: usize = 3;
pub const PRINT_ROWS: usize = 3;
const PRINT_MARGIN: f64 = 60.0;
const CROP_MARK_LEN: f64 = 24.0;

// 全局字体数据库单例
static GLOBAL_FONT_DB: OnceLock<Arc<fontdb::Database>> = OnceLock::new();

/// 初始化全局字体数据库
fn init_global_font_db() -> Arc<fontdb::Database> {
    let mut font_db = fontdb::Database::new();
    font_db.load_system_fonts();

    // 加载自定义字体
    let fonts_dir = PathBuf::from(FONTS_DIR);
    if let Ok(entries) = fs::read_dir(&fonts_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file()
                && (path.extension() == Some("ttf".as_ref())
                    || path.extension() == Some("otf".as_ref()))
            {
                if let Err(e) = font_db.load_font_file(&path) {
                    log::error!("加载字体文件失败 '{}': {}", path.display(), e);
                }
            }
        }
    }

    log::debug!("字体数据库初始化完成，共 {} 个字体", font_db.len());
    Arc::new(font_db)
}

/// 获取全局字体数据库
pub fn get_global_font_db() -> Arc<fontdb::Database> {
    GLOBAL_FONT_DB.get_or_init(init_global_font_db).clone()
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// 中日韩字符按两个宽度计算
fn is_full_width(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115F | 0x2E80..=0xA4CF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF | 0xFF00..=0xFF60)
}

fn display_width(text: &str) -> usize {
    text.chars().map(|c| if is_full_width(c) { 2 } else { 1 }).sum()
}

/// 按显示宽度折行，单词超长时按字符硬切
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let sep = if line.is_empty() { 0 } else { 1 };
            if display_width(&line) + sep + display_width(word) <= max_width {
                if sep == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            for ch in word.chars() {
                let w = if is_full_width(ch) { 2 } else { 1 };
                if display_width(&line) + w > max_width && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                line.push(ch);
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

fn icon_href(icons: &IconMap, key: &str) -> Option<String> {
    let path = icons.get(key)?;
    let resolved = path.canonicalize().unwrap_or_else(|_| path.clone());
    Some(escape_xml(&resolved.to_string_lossy()))
}

fn write_text_block(
    svg: &mut String,
    lines: &[String],
    x: f64,
    y: f64,
    line_height: f64,
    class: &str,
) -> std::fmt::Result {
    if lines.is_empty() {
        return Ok(());
    }
    writeln!(svg, r#"<text x="{x}" y="{y}" class="{class}">"#)?;
    for (i, line) in lines.iter().enumerate() {
        let dy = if i == 0 { 0.0 } else { line_height };
        writeln!(svg, r#"<tspan x="{x}" dy="{dy}">{}</tspan>"#, escape_xml(line))?;
    }
    writeln!(svg, "</text>")
}

/// 在 (card_x, card_y) 处绘制一张卡牌
fn generate_card_svg(
    svg: &mut String,
    card: &CardRecord,
    icons: &IconMap,
    card_x: f64,
    card_y: f64,
) -> Result<(), AppError> {
    let fmt_err = |e| AppError::RenderError(format!("SVG formatting error: {e}"));
    let inner_width = CARD_WIDTH as f64 - CARD_PADDING * 2.0;

    writeln!(svg, r#"<g transform="translate({card_x}, {card_y})">"#).map_err(fmt_err)?;
    writeln!(
        svg,
        r#"<rect width="{CARD_WIDTH}" height="{CARD_HEIGHT}" class="card" />"#
    )
    .map_err(fmt_err)?;

    // 标题
    let title_lines = wrap_text(&card.title, 22);
    write_text_block(svg, &title_lines, CARD_PADDING, CARD_PADDING + 26.0, 28.0, "title")
        .map_err(fmt_err)?;

    // 插画区域
    let art_y = 90.0;
    let art_size = 200.0;
    let art_x = (CARD_WIDTH as f64 - art_size) / 2.0;
    match icon_href(icons, &card.art) {
        Some(href) => writeln!(
            svg,
            r#"<image href="{href}" x="{art_x}" y="{art_y}" width="{art_size}" height="{art_size}" />"#
        )
        .map_err(fmt_err)?,
        None => {
            if !card.art.is_empty() {
                log::warn!("卡牌 '{}' 的插画 '{}' 没有对应图标", card.title, card.art);
            }
        }
    }

    // 加成图标，每个加成一列
    let bonus_y = art_y + art_size + 16.0;
    let slot_width = inner_width / 3.0;
    for (slot, (key, value)) in card.bonuses().iter().enumerate() {
        if value.trim().is_empty() {
            continue;
        }
        let slot_x = CARD_PADDING + slot_width * slot as f64;
        if let Some(href) = icon_href(icons, key) {
            writeln!(
                svg,
                r#"<image href="{href}" x="{slot_x}" y="{bonus_y}" width="{ICON_SIZE}" height="{ICON_SIZE}" />"#
            )
            .map_err(fmt_err)?;
        }
        let text_x = slot_x + ICON_SIZE + 6.0;
        let text_y = bonus_y + ICON_SIZE * 0.7;
        writeln!(
            svg,
            r#"<text x="{text_x}" y="{text_y}" class="bonus">{}</text>"#,
            escape_xml(value.trim())
        )
        .map_err(fmt_err)?;
    }

    // 描述与吐槽
    let description_y = bonus_y + ICON_SIZE + 36.0;
    let description_lines = wrap_text(&card.description, 34);
    write_text_block(svg, &description_lines, CARD_PADDING, description_y, 20.0, "description")
        .map_err(fmt_err)?;

    let snark_lines = wrap_text(&card.snark, 48);
    let snark_y = CARD_HEIGHT as f64 - CARD_PADDING - 14.0 * (snark_lines.len().max(1) - 1) as f64;
    write_text_block(svg, &snark_lines, CARD_PADDING, snark_y, 14.0, "snark").map_err(fmt_err)?;

    writeln!(svg, "</g>").map_err(fmt_err)?;
    Ok(())
}

fn write_svg_header(svg: &mut String, width: f64, height: f64) -> std::fmt::Result {
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    )?;
    writeln!(svg, "<style>")?;
    writeln!(svg, ".card {{ fill: #FFFFFF; stroke: #000000; stroke-width: 2; }}")?;
    writeln!(svg, ".title {{ font-size: 24px; font-weight: bold; fill: #000000; }}")?;
    writeln!(svg, ".description {{ font-size: 16px; fill: #000000; }}")?;
    writeln!(svg, ".bonus {{ font-size: 22px; font-weight: bold; fill: #000000; }}")?;
    writeln!(svg, ".snark {{ font-size: 11px; font-style: italic; fill: #333333; }}")?;
    writeln!(svg, ".crop {{ stroke: #000000; stroke-width: 1; }}")?;
    writeln!(svg, "</style>")?;
    writeln!(svg, r##"<rect width="100%" height="100%" fill="#FFFFFF" />"##)
}

/// 生成 TTS 贴图：固定 10 列，行数由调用方给出
pub fn generate_sheet_svg_string(
    cards: &[CardRecord],
    icons: &IconMap,
    rows: u32,
) -> Result<String, AppError> {
    let fmt_err = |e| AppError::RenderError(format!("SVG formatting error: {e}"));
    let capacity = (SHEET_COLUMNS * rows) as usize;
    if cards.len() > capacity {
        return Err(AppError::RenderError(format!(
            "{} 张卡牌放不进 {}x{} 的贴图",
            cards.len(),
            SHEET_COLUMNS,
            rows
        )));
    }

    let width = (CARD_WIDTH * SHEET_COLUMNS) as f64;
    let height = (CARD_HEIGHT * rows) as f64;
    let mut svg = String::with_capacity(cards.len() * 2048);
    write_svg_header(&mut svg, width, height).map_err(fmt_err)?;

    for (index, card) in cards.iter().enumerate() {
        let column = index as u32 % SHEET_COLUMNS;
        let row = index as u32 / SHEET_COLUMNS;
        let x = (column * CARD_WIDTH) as f64;
        let y = (row * CARD_HEIGHT) as f64;
        generate_card_svg(&mut svg, card, icons, x, y)?;
    }

    writeln!(svg, "</svg>").map_err(fmt_err)?;
    Ok(svg)
}

fn write_crop_marks(svg: &mut String, x: f64, y: f64) -> std::fmt::Result {
    let w = CARD_WIDTH as f64;
    let h = CARD_HEIGHT as f64;
    for (cx, cy) in [(x, y), (x + w, y), (x, y + h), (x + w, y + h)] {
        let hx = if cx == x { cx - CROP_MARK_LEN } else { cx + CROP_MARK_LEN };
        let vy = if cy == y { cy - CROP_MARK_LEN } else { cy + CROP_MARK_LEN };
        writeln!(svg, r#"<line x1="{cx}" y1="{cy}" x2="{hx}" y2="{cy}" class="crop" />"#)?;
        writeln!(svg, r#"<line x1="{cx}" y1="{cy}" x2="{cx}" y2="{vy}" class="crop" />"#)?;
    }
    Ok(())
}

/// 生成一页打印稿，最多 3x3 张，卡牌之间留出裁切线空间
pub fn generate_print_page_svg_string(
    cards: &[CardRecord],
    icons: &IconMap,
) -> Result<String, AppError> {
    let fmt_err = |e| AppError::RenderError(format!("SVG formatting error: {e}"));
    let gap = CROP_MARK_LEN * 2.0;
    let width = PRINT_MARGIN * 2.0
        + CARD_WIDTH as f64 * PRINT_COLUMNS as f64
        + gap * (PRINT_COLUMNS - 1) as f64;
    let height = PRINT_MARGIN * 2.0
        + CARD_HEIGHT as f64 * PRINT_ROWS as f64
        + gap * (PRINT_ROWS - 1) as f64;

    let mut svg = String::new();
    write_svg_header(&mut svg, width, height).map_err(fmt_err)?;

    for (index, card) in cards.iter().take(PRINT_COLUMNS * PRINT_ROWS).enumerate() {
        let column = (index % PRINT_COLUMNS) as f64;
        let row = (index / PRINT_COLUMNS) as f64;
        let x = PRINT_MARGIN + column * (CARD_WIDTH as f64 + gap);
        let y = PRINT_MARGIN + row * (CARD_HEIGHT as f64 + gap);
        write_crop_marks(&mut svg, x, y).map_err(fmt_err)?;
        generate_card_svg(&mut svg, card, icons, x, y)?;
    }

    writeln!(svg, "</svg>").map_err(fmt_err)?;
    Ok(svg)
}

pub fn render_svg_to_png(svg_data: String) -> Result<Vec<u8>, AppError> {
    // 使用全局字体数据库
    let font_db = get_global_font_db();

    let opts = UsvgOptions {
        resources_dir: Some(
            std::env::current_dir()
                .map_err(|e| AppError::RenderError(format!("Failed to get current dir: {e}")))?,
        ),
        fontdb: font_db,
        font_family: MAIN_FONT_NAME.to_string(),
        font_size: 16.0,
        languages: vec!["en".to_string(), "zh-CN".to_string()],
        shape_rendering: usvg::ShapeRendering::GeometricPrecision,
        text_rendering: usvg::TextRendering::OptimizeLegibility,
        image_rendering: usvg::ImageRendering::OptimizeQuality,
        ..Default::default()
    };

    let tree = usvg::Tree::from_data(svg_data.as_bytes(), &opts)
        .map_err(|e| AppError::RenderError(format!("Failed to parse SVG: {e}")))?;

    let pixmap_size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(pixmap_size.width(), pixmap_size.height())
        .ok_or_else(|| AppError::RenderError("Failed to create pixmap".to_string()))?;

    render(&tree, Transform::default(), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| AppError::RenderError(format!("Failed to encode PNG: {e}")))
}

fn write_png(path: &Path, svg: String) -> AppResult<()> {
    let png = render_svg_to_png(svg)?;
    fs::write(path, png)?;
    log::debug!("已写入图片: {}", path.display());
    Ok(())
}

/// 导出整张贴图，返回 PNG 路径
pub fn export_sheet(
    cards: &[CardRecord],
    icons: &IconMap,
    rows: u32,
    output_dir: &Path,
    file_name: &str,
) -> AppResult<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(file_name);
    let svg = generate_sheet_svg_string(cards, icons, rows)?;
    write_png(&path, svg)?;
    log::info!("贴图已导出: {} ({} 张, {}x{})", path.display(), cards.len(), SHEET_COLUMNS, rows);
    Ok(path)
}

/// 导出打印页，文件名为 <prefix>_p<页码>.png
pub fn export_print_pages(
    cards: &[CardRecord],
    icons: &IconMap,
    output_dir: &Path,
    prefix: &str,
) -> AppResult<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let mut pages = Vec::new();
    for (page, chunk) in cards.chunks(PRINT_COLUMNS * PRINT_ROWS).enumerate() {
        let path = output_dir.join(format!("{prefix}_p{}.png", page + 1));
        let svg = generate_print_page_svg_string(chunk, icons)?;
        write_png(&path, svg)?;
        pages.push(path);
    }
    log::info!("打印稿已导出: {} 页", pages.len());
    Ok(pages)
}
