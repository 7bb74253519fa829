use kurbo::{Affine, Point};

use crate::{
    composite,
    error::{FlipbookError, FlipbookResult},
    export::{CaptureSurface, SceneFrame},
    page_store::PageStore,
    scene::PageVisual,
    stack::{StackSide, depth_visual},
};

/// One rasterized frame: RGBA8, row-major, premultiplied.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

const PAPER: [u8; 4] = [253, 252, 245, 255];
const EDGE_LIGHT: [u8; 4] = [245, 242, 232, 255];
const EDGE_DARK: [u8; 4] = [199, 196, 187, 255];

/// Width of the dark binding shadow along the spine, in page pixels.
const BINDING_SHADOW_PX: f64 = 80.0;

#[derive(Clone, Copy, Debug)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
    /// Gutter around the page area; stack edges render inside it.
    pub margin_x: u32,
    pub margin_y: u32,
    pub clear_rgba: [u8; 4],
}

impl Default for CanvasSpec {
    fn default() -> Self {
        Self {
            width: 760,
            height: 560,
            margin_x: 30,
            margin_y: 30,
            clear_rgba: [18, 20, 28, 255],
        }
    }
}

impl CanvasSpec {
    pub fn validate(&self) -> FlipbookResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FlipbookError::validation("canvas width/height must be > 0"));
        }
        if self.width <= 2 * self.margin_x || self.height <= 2 * self.margin_y {
            return Err(FlipbookError::validation(
                "canvas margins leave no room for the page area",
            ));
        }
        Ok(())
    }

    fn page_rect(&self) -> (f64, f64, f64, f64) {
        let x = f64::from(self.margin_x);
        let y = f64::from(self.margin_y);
        let w = f64::from(self.width - 2 * self.margin_x);
        let h = f64::from(self.height - 2 * self.margin_y);
        (x, y, w, h)
    }
}

/// CPU rasterizer for a flipbook scene. Page sheets are projected with an
/// affine transform (horizontal foreshortening from the spine rotation plus
/// the mid-turn shear and lift) and sampled nearest-neighbour.
pub struct CpuCompositor<S: PageStore> {
    spec: CanvasSpec,
    store: S,
}

impl<S: PageStore> CpuCompositor<S> {
    pub fn new(spec: CanvasSpec, store: S) -> FlipbookResult<Self> {
        spec.validate()?;
        Ok(Self { spec, store })
    }

    pub fn spec(&self) -> &CanvasSpec {
        &self.spec
    }

    pub fn render(&self, scene: &SceneFrame<'_>) -> FlipbookResult<FrameRGBA> {
        let w = self.spec.width as usize;
        let h = self.spec.height as usize;
        let mut data = vec![0u8; w * h * 4];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&self.spec.clear_rgba);
        }

        let total = scene.deck.len();
        self.draw_stack_edge(&mut data, scene.stacks.left, total, StackSide::Left);
        self.draw_stack_edge(&mut data, scene.stacks.right, total, StackSide::Right);

        // Painter's algorithm: low z first, the turning page last.
        let mut order: Vec<&PageVisual> = scene.visuals.iter().filter(|v| v.visible).collect();
        order.sort_by_key(|v| (v.z_order, v.page_id));
        for visual in order {
            // A fully turned page lies flat on the left pile; the stack edge
            // already stands in for it.
            if visual.angle_deg <= -179.999 {
                continue;
            }
            self.draw_page(&mut data, scene, visual)?;
        }

        Ok(FrameRGBA {
            width: self.spec.width,
            height: self.spec.height,
            data,
            premultiplied: true,
        })
    }

    fn draw_page(
        &self,
        data: &mut [u8],
        scene: &SceneFrame<'_>,
        visual: &PageVisual,
    ) -> FlipbookResult<()> {
        let record = scene.deck.get(visual.page_id).ok_or_else(|| {
            FlipbookError::validation(format!(
                "visual references unknown page {}",
                visual.page_id.0
            ))
        })?;
        let pixels = self.store.get(&record.content)?;

        let (page_x, page_y, pw, ph) = self.spec.page_rect();
        let rad = visual.angle_deg.to_radians();
        let sx = rad.cos();
        if sx.abs() < 1e-4 {
            // Edge-on: the sheet projects to a zero-width sliver.
            return Ok(());
        }
        let back_face = sx < 0.0;
        let shear = visual.skew_y_deg.to_radians().tan();

        // Page-local (u,v) in [0,pw]x[0,ph] to canvas coordinates: fold the
        // sheet about the spine, shear it, lift it, then add the resting
        // jitter about the page center.
        let fold = Affine::new([sx, shear, 0.0, 1.0, page_x + visual.lift_px, page_y]);
        let center = Point::new(page_x + pw / 2.0, page_y + ph / 2.0);
        let fwd = Affine::translate(center.to_vec2())
            * Affine::rotate(visual.jitter_deg.to_radians())
            * Affine::translate(-center.to_vec2())
            * fold;
        let inv = fwd.inverse();

        let w = self.spec.width as i64;
        let h = self.spec.height as i64;
        let corners = [
            fwd * Point::new(0.0, 0.0),
            fwd * Point::new(pw, 0.0),
            fwd * Point::new(0.0, ph),
            fwd * Point::new(pw, ph),
        ];
        let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = corners
            .iter()
            .map(|p| p.x)
            .fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = corners
            .iter()
            .map(|p| p.y)
            .fold(f64::NEG_INFINITY, f64::max);
        let x0 = min_x.floor().max(0.0) as i64;
        let x1 = max_x.ceil().min(w as f64) as i64;
        let y0 = min_y.floor().max(0.0) as i64;
        let y1 = max_y.ceil().min(h as f64) as i64;

        let highlight_center = visual.highlight_center_pct / 100.0 * pw;
        let stride = self.spec.width as usize * 4;

        for y in y0..y1 {
            for x in x0..x1 {
                let local = inv * Point::new(x as f64 + 0.5, y as f64 + 0.5);
                let (u, v) = (local.x, local.y);
                if u < 0.0 || u >= pw || v < 0.0 || v >= ph {
                    continue;
                }

                let mut px = if back_face {
                    PAPER
                } else {
                    pixels.sample(u / pw, v / ph)
                };

                // Binding shadow hugging the spine, both faces.
                if u < BINDING_SHADOW_PX {
                    px = composite::shade(px, 0.6 * (1.0 - u / BINDING_SHADOW_PX));
                }

                // Curl shadow: strongest at the spine, gone by 40% of width.
                if visual.shadow_opacity > 0.0 {
                    let falloff = 1.0 - (u / pw) / 0.4;
                    if falloff > 0.0 {
                        px = composite::shade(px, visual.shadow_opacity * falloff);
                    }
                }

                // Moving sheen across the front of a turning page.
                if !back_face && visual.highlight_opacity > 0.0 {
                    let dist = ((u - highlight_center) / (pw * 0.5)).abs();
                    if dist < 1.0 {
                        px = composite::lighten(px, visual.highlight_opacity * 4.0 * (1.0 - dist));
                    }
                }

                let i = y as usize * stride + x as usize * 4;
                let dst = [data[i], data[i + 1], data[i + 2], data[i + 3]];
                let out = composite::over(dst, px, 1.0);
                data[i..i + 4].copy_from_slice(&out);
            }
        }

        Ok(())
    }

    fn draw_stack_edge(&self, data: &mut [u8], count: usize, total: usize, side: StackSide) {
        let visual = depth_visual(count, total, side);
        let thick = visual.edge_thickness_px.round() as i64;
        if thick <= 0 {
            return;
        }

        let (page_x, page_y, pw, ph) = self.spec.page_rect();
        let (x_start, x_end) = match side {
            StackSide::Left => ((page_x as i64 - thick).max(0), page_x as i64),
            StackSide::Right => (
                (page_x + pw) as i64,
                ((page_x + pw) as i64 + thick).min(self.spec.width as i64),
            ),
        };
        let y_start = page_y as i64 + 1;
        let y_end = (page_y + ph) as i64 - 1;
        let stride = self.spec.width as usize * 4;

        let base_shade = visual.base_shadow.map(|s| (s.alpha, s.blur));

        for y in y_start..y_end {
            // Alternating sheet edges give the pile its paper texture.
            let base = if y % 2 == 0 { EDGE_LIGHT } else { EDGE_DARK };
            for x in x_start..x_end {
                let outer_dist = match side {
                    StackSide::Left => (x - x_start) as f64,
                    StackSide::Right => (x_end - 1 - x) as f64,
                };
                let mut px = base;
                if outer_dist < 4.0 {
                    px = composite::shade(px, 0.2 * (1.0 - outer_dist / 4.0));
                }
                if let Some((alpha, blur)) = base_shade {
                    let from_bottom = (y_end - 1 - y) as f64;
                    if from_bottom < blur {
                        px = composite::shade(px, alpha * (1.0 - from_bottom / blur));
                    }
                }
                let i = y as usize * stride + x as usize * 4;
                data[i..i + 4].copy_from_slice(&px);
            }
        }
    }
}

impl<S: PageStore> CaptureSurface for CpuCompositor<S> {
    fn dimensions(&self) -> (u32, u32) {
        (self.spec.width, self.spec.height)
    }

    fn acquire(&mut self, deck: &crate::deck::PageDeck) -> FlipbookResult<()> {
        // Every page must resolve before the recorder starts; a missing
        // content key aborts the export up front.
        for page in &deck.pages {
            self.store.get(&page.content).map_err(|e| {
                FlipbookError::capture(format!(
                    "cannot acquire capture surface: page {}: {e}",
                    page.id.0
                ))
            })?;
        }
        Ok(())
    }

    fn rasterize(&mut self, scene: &SceneFrame<'_>) -> FlipbookResult<FrameRGBA> {
        self.render(scene)
    }
}
