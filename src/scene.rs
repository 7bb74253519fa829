use crate::{
    deck::{PageDeck, PageId},
    state::{Mode, TurnState},
};

/// Authoritative substitute for [`TurnState`] while exporting: the sweep is
/// driven by a frame counter, never by pointer or timer input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportFrameState {
    pub sweep_page_index: usize,
    /// 0 = resting flat, 1 = fully turned.
    pub sweep_progress: f64,
}

/// Draw-ready description of one page. Derived, never stored: a pure
/// function of the deck and the live (or export) state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageVisual {
    pub page_id: PageId,
    pub z_order: i32,
    /// Rotation about the spine, 0 (unflipped) to -180 (flipped).
    pub angle_deg: f64,
    /// Resting rotation about the page center.
    pub jitter_deg: f64,
    pub lift_px: f64,
    pub curl_x_deg: f64,
    pub skew_y_deg: f64,
    pub shadow_opacity: f64,
    pub highlight_opacity: f64,
    /// Horizontal center of the moving sheen, in percent of page width.
    pub highlight_center_pct: f64,
    pub visible: bool,
}

/// How many pages pile on each side of the spine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackCounts {
    pub left: usize,
    pub right: usize,
}

pub fn stack_counts(state: &TurnState, export: Option<&ExportFrameState>) -> StackCounts {
    let total = state.page_count();
    if total == 0 {
        return StackCounts { left: 0, right: 0 };
    }
    let pivot = match export {
        Some(e) => e.sweep_page_index,
        None => state.current_page(),
    };
    StackCounts {
        left: pivot,
        // One page is the visible/turning one, the rest wait on the right.
        right: total.saturating_sub(pivot + 1),
    }
}

/// Derive visuals for every page. Ordering matches the deck; consumers sort
/// by `z_order` for painting.
pub fn page_visuals(
    deck: &PageDeck,
    state: &TurnState,
    export: Option<&ExportFrameState>,
) -> Vec<PageVisual> {
    let total = deck.len();
    deck.pages
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let (z_order, angle_deg, curled, visible) = match export {
                Some(e) => export_placement(index, e, total),
                None => live_placement(index, state, total),
            };

            let curl = if curled {
                TurnCurl::at_angle(angle_deg)
            } else {
                TurnCurl::default()
            };

            PageVisual {
                page_id: page.id,
                z_order,
                angle_deg,
                jitter_deg: deck.jitter_deg(page.id),
                lift_px: curl.lift_px,
                curl_x_deg: curl.curl_x_deg,
                skew_y_deg: curl.skew_y_deg,
                shadow_opacity: curl.shadow_opacity,
                highlight_opacity: curl.highlight_opacity,
                highlight_center_pct: curl.highlight_center_pct,
                visible,
            }
        })
        .collect()
}

/// (z, angle, mid-turn curl applies, visible)
fn export_placement(index: usize, e: &ExportFrameState, total: usize) -> (i32, f64, bool, bool) {
    let total_i = total as i32;
    let index_i = index as i32;

    // Pages more than one past the sweep have never been on screen yet;
    // rendering them would pop into the capture.
    let visible = index <= e.sweep_page_index + 1;

    if index == e.sweep_page_index {
        let angle = -e.sweep_progress.clamp(0.0, 1.0) * 180.0;
        (total_i + 1, angle, true, visible)
    } else if index < e.sweep_page_index {
        (index_i + 1, -180.0, false, visible)
    } else {
        (total_i - index_i, 0.0, false, visible)
    }
}

fn live_placement(index: usize, state: &TurnState, total: usize) -> (i32, f64, bool, bool) {
    let total_i = total as i32;
    let index_i = index as i32;
    let current = state.current_page();

    let is_flipped = index < current;
    let is_flipping = state.mode() == Mode::Dragging && index == current;

    // A page that just committed keeps top z while it springs into place,
    // but only for manual turns; autoplay/rewind stack pages immediately.
    let is_animating = matches!(state.mode(), Mode::Autoplaying | Mode::Rewinding);
    let manually_turning = !is_animating
        && state.previous_page().is_some_and(|prev| {
            (current > prev && index == prev) || (current < prev && index == current)
        });

    let z_order = if is_flipping || manually_turning {
        total_i + 1
    } else if is_flipped {
        index_i + 1
    } else {
        total_i - index_i
    };

    let angle = if is_flipping {
        state.turn_angle_deg()
    } else if is_flipped {
        -180.0
    } else {
        0.0
    };

    (z_order, angle, is_flipping, true)
}

/// Mid-turn deformation of the sheet, all driven by sin(|angle|): the page
/// bows outward hardest at 90 degrees and lies flat at both ends.
#[derive(Clone, Copy, Debug, Default)]
struct TurnCurl {
    lift_px: f64,
    curl_x_deg: f64,
    skew_y_deg: f64,
    shadow_opacity: f64,
    highlight_opacity: f64,
    highlight_center_pct: f64,
}

impl TurnCurl {
    fn at_angle(angle_deg: f64) -> Self {
        let p = angle_deg.to_radians().abs().sin();
        Self {
            lift_px: p * 8.0,
            curl_x_deg: p * 20.0,
            skew_y_deg: -p * 10.0,
            shadow_opacity: p * 0.25,
            highlight_opacity: p * 0.1,
            highlight_center_pct: 50.0 - p * 40.0,
        }
    }
}
