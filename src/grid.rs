// Grid presentation - pure filter, order and placement logic
use std::cmp::Ordering;
use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::card::CardState;

/// Horizontal card geometry; the defaults mirror the fixed 340 px card
/// footprint of the browser window.
#[derive(Debug, Clone, Copy)]
pub struct GridMetrics {
    pub card_width: f32,
    pub h_spacing: f32,
    pub left_margin: f32,
    pub right_margin: f32,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            card_width: 340.0,
            h_spacing: 10.0,
            left_margin: 10.0,
            right_margin: 10.0,
        }
    }
}

/// Placement of one card; `index` points into the input sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPlacement {
    pub index: usize,
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone)]
pub struct GridLayout {
    pub cells: Vec<CellPlacement>,
    pub content_width: f32,
}

/// Case-insensitive substring match on title or channel. An empty filter
/// matches everything.
pub fn matches_filter(title: &str, channel: &str, filter: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    let needle = filter.to_lowercase();
    title.to_lowercase().contains(&needle) || channel.to_lowercase().contains(&needle)
}

/// Lay out the filtered cards in row-major order, pinned cards first.
///
/// Deterministic and side-effect free: within the pinned and unpinned groups
/// the relative order is exactly the input order, so repeated calls with the
/// same input always produce the same grid.
pub fn layout(
    cards: &[Arc<CardState>],
    filter: &str,
    columns: usize,
    metrics: GridMetrics,
) -> GridLayout {
    let columns = columns.max(1);

    let mut pinned = Vec::new();
    let mut unpinned = Vec::new();
    for (index, card) in cards.iter().enumerate() {
        let entry = card.entry();
        if !matches_filter(&entry.title, &entry.channel, filter) {
            continue;
        }
        if card.pinned() {
            pinned.push(index);
        } else {
            unpinned.push(index);
        }
    }

    let cells = pinned
        .into_iter()
        .chain(unpinned)
        .enumerate()
        .map(|(slot, index)| CellPlacement {
            index,
            row: slot / columns,
            col: slot % columns,
        })
        .collect();

    let content_width = columns as f32 * metrics.card_width
        + (columns - 1) as f32 * metrics.h_spacing
        + metrics.left_margin
        + metrics.right_margin;

    GridLayout {
        cells,
        content_width,
    }
}

/// Ordering applied to the card sequence on demand. Pinned cards keep their
/// relative order and stay ahead of the rest; only the unpinned remainder is
/// sorted (or shuffled, once, for `Random`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Random,
    TitleAsc,
    TitleDesc,
    ChannelAsc,
    ChannelDesc,
}

pub fn apply_sort(cards: &mut Vec<Arc<CardState>>, mode: SortMode) {
    let (pinned, mut unpinned): (Vec<_>, Vec<_>) =
        cards.drain(..).partition(|card| card.pinned());

    match mode {
        SortMode::Random => unpinned.shuffle(&mut rand::thread_rng()),
        SortMode::TitleAsc => unpinned.sort_by(cmp_title),
        SortMode::TitleDesc => unpinned.sort_by(|a, b| cmp_title(b, a)),
        SortMode::ChannelAsc => unpinned.sort_by(cmp_channel),
        SortMode::ChannelDesc => unpinned.sort_by(|a, b| cmp_channel(b, a)),
    }

    cards.extend(pinned);
    cards.extend(unpinned);
}

fn cmp_title(a: &Arc<CardState>, b: &Arc<CardState>) -> Ordering {
    a.entry()
        .title
        .to_lowercase()
        .cmp(&b.entry().title.to_lowercase())
}

fn cmp_channel(a: &Arc<CardState>, b: &Arc<CardState>) -> Ordering {
    a.entry()
        .channel
        .to_lowercase()
        .cmp(&b.entry().channel.to_lowercase())
}

/// Direction of a keyboard step through the visible cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMove {
    Left,
    Right,
    Up,
    Down,
}

/// Keyboard selection over the laid-out cells. Left/Right step by one,
/// Up/Down by a full row; every step clamps to the visible range.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selection {
    index: Option<usize>,
}

impl Selection {
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn clear(&mut self) {
        self.index = None;
    }

    pub fn step(&mut self, mov: SelectionMove, visible: usize, columns: usize) {
        if visible == 0 {
            self.index = None;
            return;
        }
        let columns = columns.max(1) as isize;
        let next = match self.index {
            None => 0,
            Some(current) => {
                let current = current.min(visible - 1) as isize;
                let delta = match mov {
                    SelectionMove::Left => -1,
                    SelectionMove::Right => 1,
                    SelectionMove::Up => -columns,
                    SelectionMove::Down => columns,
                };
                (current + delta).clamp(0, visible as isize - 1) as usize
            }
        };
        self.index = Some(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::card::{CatalogEntry, VideoIdentity};

    fn card(title: &str, channel: &str, pinned: bool) -> Arc<CardState> {
        let path = PathBuf::from(format!("/videos/{channel}/{title}.mp4"));
        let entry = CatalogEntry {
            identity: VideoIdentity::for_path(&path),
            title: title.to_string(),
            channel: channel.to_string(),
            source_path: path,
        };
        let (card, _rx) = CardState::new(entry, pinned);
        card
    }

    fn titles(cards: &[Arc<CardState>], layout: &GridLayout) -> Vec<String> {
        layout
            .cells
            .iter()
            .map(|cell| cards[cell.index].entry().title.clone())
            .collect()
    }

    #[test]
    fn placement_is_row_major_for_any_column_count() {
        let cards: Vec<_> = (0..13).map(|i| card(&format!("v{i}"), "ch", false)).collect();
        for columns in 1..=5 {
            let layout = layout(&cards, "", columns, GridMetrics::default());
            assert_eq!(layout.cells.len(), cards.len());
            for (slot, cell) in layout.cells.iter().enumerate() {
                assert_eq!(cell.index, slot);
                assert_eq!(cell.row, slot / columns);
                assert_eq!(cell.col, slot % columns);
            }
        }
    }

    #[test]
    fn pinned_cards_come_first_and_both_groups_stay_stable() {
        let cards = vec![
            card("v0", "ch", false),
            card("v1", "ch", true),
            card("v2", "ch", false),
            card("v3", "ch", true),
            card("v4", "ch", true),
            card("v5", "ch", false),
        ];
        let grid = layout(&cards, "", 3, GridMetrics::default());
        assert_eq!(titles(&cards, &grid), ["v1", "v3", "v4", "v0", "v2", "v5"]);

        // Repeated layout calls never reshuffle anything.
        let again = layout(&cards, "", 3, GridMetrics::default());
        assert_eq!(grid.cells, again.cells);
    }

    #[test]
    fn filter_matches_title_or_channel_case_insensitively() {
        let cards = vec![
            card("Intro Jam", "SoundLab", false),
            card("outro", "Garage", false),
            card("untitled", "soundlab", false),
        ];
        let grid = layout(&cards, "SOUND", 4, GridMetrics::default());
        assert_eq!(titles(&cards, &grid), ["Intro Jam", "untitled"]);

        let none = layout(&cards, "zzz", 4, GridMetrics::default());
        assert!(none.cells.is_empty());

        let all = layout(&cards, "", 4, GridMetrics::default());
        assert_eq!(all.cells.len(), 3);
    }

    #[test]
    fn filtered_out_cards_are_excluded_from_placement_entirely() {
        let cards = vec![
            card("match one", "ch", false),
            card("other", "ch", false),
            card("match two", "ch", false),
        ];
        let grid = layout(&cards, "match", 2, GridMetrics::default());
        // The survivors pack the grid with no gap left by the excluded card.
        assert_eq!(grid.cells[0].index, 0);
        assert_eq!((grid.cells[0].row, grid.cells[0].col), (0, 0));
        assert_eq!(grid.cells[1].index, 2);
        assert_eq!((grid.cells[1].row, grid.cells[1].col), (0, 1));
    }

    #[test]
    fn content_width_follows_the_metrics_formula() {
        let grid = layout(&[], "", 4, GridMetrics::default());
        assert_eq!(grid.content_width, 4.0 * 340.0 + 3.0 * 10.0 + 10.0 + 10.0);
    }

    #[test]
    fn pinned_and_unpinned_scenario_lays_out_on_one_row() {
        let cards = vec![card("b", "ch", false), card("a", "ch", true)];
        let grid = layout(&cards, "", 2, GridMetrics::default());
        // `a` is pinned and takes (0,0); `b` follows at (0,1).
        assert_eq!(grid.cells[0].index, 1);
        assert_eq!((grid.cells[0].row, grid.cells[0].col), (0, 0));
        assert_eq!(grid.cells[1].index, 0);
        assert_eq!((grid.cells[1].row, grid.cells[1].col), (0, 1));
    }

    #[test]
    fn sort_orders_unpinned_cards_and_keeps_pinned_ahead() {
        let mut cards = vec![
            card("cherry", "ch", false),
            card("apple", "ch", false),
            card("pinned", "ch", true),
            card("banana", "ch", false),
        ];
        apply_sort(&mut cards, SortMode::TitleAsc);
        let order: Vec<_> = cards.iter().map(|c| c.entry().title.as_str()).collect();
        assert_eq!(order, ["pinned", "apple", "banana", "cherry"]);

        apply_sort(&mut cards, SortMode::TitleDesc);
        let order: Vec<_> = cards.iter().map(|c| c.entry().title.as_str()).collect();
        assert_eq!(order, ["pinned", "cherry", "banana", "apple"]);
    }

    #[test]
    fn random_sort_keeps_the_card_set_and_the_pinned_prefix() {
        let mut cards = vec![
            card("v0", "ch", true),
            card("v1", "ch", false),
            card("v2", "ch", false),
            card("v3", "ch", false),
        ];
        apply_sort(&mut cards, SortMode::Random);
        assert_eq!(cards.len(), 4);
        assert!(cards[0].pinned());
        let mut rest: Vec<_> = cards[1..].iter().map(|c| c.entry().title.clone()).collect();
        rest.sort_unstable();
        assert_eq!(rest, ["v1", "v2", "v3"]);
    }

    #[test]
    fn selection_steps_and_clamps() {
        let mut selection = Selection::default();
        assert_eq!(selection.index(), None);

        selection.step(SelectionMove::Right, 7, 4);
        assert_eq!(selection.index(), Some(0));
        selection.step(SelectionMove::Down, 7, 4);
        assert_eq!(selection.index(), Some(4));
        selection.step(SelectionMove::Right, 7, 4);
        assert_eq!(selection.index(), Some(5));
        selection.step(SelectionMove::Down, 7, 4);
        assert_eq!(selection.index(), Some(6));
        selection.step(SelectionMove::Up, 7, 4);
        assert_eq!(selection.index(), Some(2));
        selection.step(SelectionMove::Left, 7, 4);
        selection.step(SelectionMove::Left, 7, 4);
        selection.step(SelectionMove::Left, 7, 4);
        assert_eq!(selection.index(), Some(0));

        selection.step(SelectionMove::Right, 0, 4);
        assert_eq!(selection.index(), None);
    }
}
