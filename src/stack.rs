/// Which side of the spine a stack sits on: pages already turned pile up on
/// the left, pages not yet turned wait on the right.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackSide {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowLayer {
    pub offset_x: f64,
    pub offset_y: f64,
    pub blur: f64,
    pub alpha: f64,
}

/// Visual thickness of a page pile. Pure data; the compositor decides how to
/// paint it.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthVisual {
    pub edge_thickness_px: f64,
    pub shadow_layers: Vec<ShadowLayer>,
    pub base_shadow: Option<ShadowLayer>,
}

/// Shadow layers beyond this count contribute no visible difference and
/// would be wasted work.
const MAX_VISIBLE_EDGES: usize = 60;

/// Derive the stack visual for `turned` pages piled on `side` out of `total`.
/// Deterministic for identical arguments; the export pipeline depends on
/// that for bit-reproducible frames.
pub fn depth_visual(turned: usize, total: usize, side: StackSide) -> DepthVisual {
    if turned == 0 {
        return DepthVisual {
            edge_thickness_px: 0.0,
            shadow_layers: Vec::new(),
            base_shadow: None,
        };
    }

    let edge_thickness_px = (turned as f64 * 0.8).clamp(1.0, 40.0);

    // A single page casts no pile shadow.
    if turned <= 1 {
        return DepthVisual {
            edge_thickness_px,
            shadow_layers: Vec::new(),
            base_shadow: None,
        };
    }

    let thickness_factor = (total as f64 / 20.0).min(2.0);
    let visible = turned.min(MAX_VISIBLE_EDGES);
    let direction = match side {
        StackSide::Left => -1.0,
        StackSide::Right => 1.0,
    };

    let shadow_layers = (0..visible)
        .map(|i| ShadowLayer {
            offset_x: direction * i as f64 * 0.2 * thickness_factor,
            offset_y: (i as f64 + 1.0) * 0.4 * thickness_factor,
            blur: 1.5,
            alpha: 0.1,
        })
        .collect();

    let base_shadow = Some(ShadowLayer {
        offset_x: 0.0,
        offset_y: visible as f64 * 0.4 * thickness_factor + 3.0,
        blur: 6.0,
        alpha: 0.15,
    });

    DepthVisual {
        edge_thickness_px,
        shadow_layers,
        base_shadow,
    }
}
