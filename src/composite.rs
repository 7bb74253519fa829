//! Premultiplied RGBA8 pixel helpers for the CPU compositor.

pub type PremulRgba8 = [u8; 4];

/// Source-over blend of `src` onto `dst` at the given opacity.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f64) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Darken color channels toward black by `amount` (0 = untouched, 1 = black).
/// Alpha is preserved; used for spine and curl shadows.
pub fn shade(px: PremulRgba8, amount: f64) -> PremulRgba8 {
    let keep = ((1.0 - amount.clamp(0.0, 1.0)) * 255.0).round() as u16;
    [
        mul_div255(u16::from(px[0]), keep),
        mul_div255(u16::from(px[1]), keep),
        mul_div255(u16::from(px[2]), keep),
        px[3],
    ]
}

/// Push color channels toward white by `amount`; the moving turn sheen.
pub fn lighten(px: PremulRgba8, amount: f64) -> PremulRgba8 {
    let t = amount.clamp(0.0, 1.0);
    let mut out = px;
    for c in &mut out[..3] {
        let v = f64::from(*c);
        // Lighten within the premultiplied range so alpha stays consistent.
        let ceiling = f64::from(px[3]);
        *c = (v + (ceiling - v) * t).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_opacity_zero_is_noop() {
        let dst = [1, 2, 3, 4];
        assert_eq!(over(dst, [200, 200, 200, 200], 0.0), dst);
    }

    #[test]
    fn over_opaque_src_replaces_dst() {
        let src = [255, 0, 0, 255];
        assert_eq!(over([0, 0, 0, 255], src, 1.0), src);
    }

    #[test]
    fn shade_endpoints() {
        let px = [200, 100, 50, 255];
        assert_eq!(shade(px, 0.0), px);
        assert_eq!(shade(px, 1.0), [0, 0, 0, 255]);
    }

    #[test]
    fn lighten_moves_toward_alpha_ceiling() {
        let px = [100, 100, 100, 255];
        assert_eq!(lighten(px, 1.0), [255, 255, 255, 255]);
        let half = lighten(px, 0.5);
        assert!(half[0] > 100 && half[0] < 255);
    }
}
