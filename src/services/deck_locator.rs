use crate::models::{GameObject, Ordered, SaveDocument};
use crate::utils::error::{AppError, AppResult};

/// 在存档中按昵称查找牌堆，返回从 ObjectStates 开始的下标路径
///
/// 使用显式栈做深度优先遍历：后压入的对象先被访问，所以袋子里的对象
/// 会先于更早压入的同级对象被检查。遇到第一个匹配立即返回。
pub fn find_deck_path(document: &SaveDocument, deck_name: &str) -> Option<Vec<usize>> {
    let mut stack: Vec<(&Ordered<GameObject>, Vec<usize>)> = document
        .object_states
        .iter()
        .enumerate()
        .map(|(index, object)| (object, vec![index]))
        .collect();
    let mut visited = 0usize;

    while let Some((item, path)) = stack.pop() {
        visited += 1;
        if item.is_expandable_bag() {
            if let Some(children) = &item.contained_objects {
                log::trace!("展开袋子 '{}'，共 {} 个对象", item.display_name(), children.len());
                for (index, child) in children.iter().enumerate() {
                    let mut child_path = path.clone();
                    child_path.push(index);
                    stack.push((child, child_path));
                }
            }
        }
        if item.has_nickname(deck_name) {
            log::debug!("找到牌堆 '{}'，路径 {:?}，已访问 {} 个对象", deck_name, path, visited);
            return Some(path);
        }
    }

    log::debug!("未找到牌堆 '{}'，共访问 {} 个对象", deck_name, visited);
    None
}

fn object_at_path_mut<'a>(
    document: &'a mut SaveDocument,
    path: &[usize],
) -> Option<&'a mut GameObject> {
    let (first, rest) = path.split_first()?;
    let mut current = document.object_states.get_mut(*first)?;
    for &index in rest {
        current = current.contained_objects.as_mut()?.get_mut(index)?;
    }
    Some(&mut **current)
}

/// 查找牌堆并返回可变引用，找不到时返回 `DeckNotFound`
pub fn locate_deck<'a>(
    document: &'a mut SaveDocument,
    deck_name: &str,
) -> AppResult<&'a mut GameObject> {
    let path = find_deck_path(document, deck_name)
        .ok_or_else(|| AppError::DeckNotFound(deck_name.to_string()))?;
    object_at_path_mut(document, &path).ok_or_else(|| AppError::DeckNotFound(deck_name.to_string()))
}
