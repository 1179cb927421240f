use rand::seq::IndexedRandom;
use rand::Rng;

use crate::config::{DECK_ID_BLOCK, SHEET_COLUMNS};
use crate::models::{GameObject, SaveDocument};
use crate::services::deck_locator::locate_deck;
use crate::utils::error::{AppError, AppResult};

const GUID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const GUID_LEN: usize = 6;

/// 贴图行数，导出贴图和写回存档共用
pub fn sheet_rows(card_count: usize) -> u32 {
    1 + card_count as u32 / SHEET_COLUMNS
}

/// 生成 6 位小写字母数字 GUID，字符不重复，不保证全局唯一
pub fn random_guid<R: Rng + ?Sized>(rng: &mut R) -> String {
    GUID_ALPHABET
        .choose_multiple(rng, GUID_LEN)
        .map(|&b| char::from(b))
        .collect()
}

/// 一次同步的结果摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub deck: String,
    pub before: usize,
    pub after: usize,
    pub base_id: i64,
    pub renumbered: bool,
}

/// 让牌堆与目标卡牌列表一致
///
/// 依次更新贴图网格、按原顺序重新编号、从末尾复制或裁剪卡牌，最后写入昵称。
/// 前置条件不满足时返回 `MalformedDeck`，此时牌堆不会被修改。
pub fn reconcile_deck<S, R>(
    deck: &mut GameObject,
    labels: &[S],
    rng: &mut R,
) -> AppResult<ReconcileReport>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    let name = deck.display_name().to_string();

    let Some(deck_ids) = deck.deck_ids.as_mut().filter(|ids| !ids.is_empty()) else {
        return Err(AppError::malformed(&name, "DeckIDs 缺失或为空"));
    };
    let Some(cards) = deck
        .contained_objects
        .as_mut()
        .filter(|cards| !cards.is_empty())
    else {
        return Err(AppError::malformed(&name, "ContainedObjects 缺失或为空"));
    };
    if deck_ids.len() != cards.len() {
        return Err(AppError::malformed(
            &name,
            format!("DeckIDs 有 {} 项，ContainedObjects 有 {} 项", deck_ids.len(), cards.len()),
        ));
    }
    let Some(custom_deck) = deck.custom_deck.as_mut() else {
        return Err(AppError::malformed(&name, "缺少 CustomDeck"));
    };
    if custom_deck.len() != 1 {
        return Err(AppError::malformed(
            &name,
            format!("CustomDeck 应只有一张贴图，实际 {} 张", custom_deck.len()),
        ));
    }
    let Some(sheet) = custom_deck.values_mut().next() else {
        return Err(AppError::malformed(&name, "缺少 CustomDeck"));
    };

    let target = labels.len();
    let before = deck_ids.len();
    if target == 0 {
        log::warn!("牌堆 '{}' 的目标卡牌列表为空，将清空所有卡牌", name);
    }

    sheet.num_width = SHEET_COLUMNS;
    sheet.num_height = sheet_rows(target);

    // 上游偶尔会打乱 DeckIDs，必须从 XX00 开始连续编号才能对上贴图
    let base_id = deck_ids[0].div_euclid(DECK_ID_BLOCK) * DECK_ID_BLOCK;
    let renumbered = deck_ids
        .iter()
        .enumerate()
        .any(|(index, id)| *id != base_id + index as i64);
    if renumbered {
        log::debug!("牌堆 '{}' 的 DeckIDs 不连续，从 {} 重新编号: {:?}", name, base_id, deck_ids);
    }
    for (index, (id, card)) in deck_ids.iter_mut().zip(cards.iter_mut()).enumerate() {
        let new_id = base_id + index as i64;
        *id = new_id;
        card.card_id = Some(new_id);
    }

    while deck_ids.len() < target {
        let next_id = deck_ids[deck_ids.len() - 1] + 1;
        let mut next_card = cards[cards.len() - 1].clone();
        next_card.card_id = Some(next_id);
        next_card.guid = Some(random_guid(rng));
        log::trace!("牌堆 '{}' 新增卡牌 {} (GUID {:?})", name, next_id, next_card.guid);
        deck_ids.push(next_id);
        cards.push(next_card);
    }

    if deck_ids.len() > target {
        log::trace!("牌堆 '{}' 裁剪末尾 {} 张卡牌", name, deck_ids.len() - target);
        deck_ids.truncate(target);
        cards.truncate(target);
    }

    for (card, label) in cards.iter_mut().zip(labels) {
        card.nickname = Some(label.as_ref().to_string());
    }

    log::info!(
        "牌堆 '{}' 同步完成: {} -> {} 张，起始 ID {}，贴图 {}x{}",
        name,
        before,
        target,
        base_id,
        sheet.num_width,
        sheet.num_height
    );

    Ok(ReconcileReport {
        deck: name,
        before,
        after: target,
        base_id,
        renumbered,
    })
}

/// 定位并同步存档中的牌堆
pub fn adjust_deck_size<S, R>(
    document: &mut SaveDocument,
    deck_name: &str,
    labels: &[S],
    rng: &mut R,
) -> AppResult<ReconcileReport>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    let deck = locate_deck(document, deck_name)?;
    reconcile_deck(deck, labels, rng)
}
