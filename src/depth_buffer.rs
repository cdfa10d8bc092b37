//! The depth-buffer selection policy (§6). The depth-buffer tracker itself
//! is an external collaborator — only the pure selection function over its
//! per-frame `{texture -> stats}` map is implemented here.

use hashbrown::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepthBufferStats {
    pub drawcalls: u32,
    pub vertices: u32,
    pub width: u32,
    pub height: u32,
}

/// Picks the best depth-buffer candidate for a back buffer of
/// `target_width x target_height`: among candidates whose aspect ratio is
/// within ±10% of the target's and whose size factor (candidate area /
/// target area) falls in `[0.5, 1.85]`, returns the one with the most
/// drawcalls. Ties are broken by map iteration order (first one seen).
pub fn select_depth_buffer<T: Copy + Eq + std::hash::Hash>(
    candidates: &HashMap<T, DepthBufferStats>,
    target_width: u32,
    target_height: u32,
) -> Option<T> {
    let target_aspect = target_width as f64 / target_height as f64;
    let target_area = (target_width as f64) * (target_height as f64);

    let mut best: Option<(T, u32)> = None;
    for (&key, stats) in candidates {
        if stats.width == 0 || stats.height == 0 {
            continue;
        }
        let aspect = stats.width as f64 / stats.height as f64;
        if (aspect - target_aspect).abs() / target_aspect > 0.10 {
            continue;
        }
        let size_factor = (stats.width as f64 * stats.height as f64) / target_area;
        if !(0.5..=1.85).contains(&size_factor) {
            continue;
        }
        match best {
            Some((_, best_drawcalls)) if best_drawcalls >= stats.drawcalls => {}
            _ => best = Some((key, stats.drawcalls)),
        }
    }
    best.map(|(key, _)| key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_matching_aspect_with_most_drawcalls() {
        let mut candidates = HashMap::new();
        candidates.insert(1u32, DepthBufferStats { drawcalls: 10, vertices: 100, width: 1920, height: 1080 });
        candidates.insert(2u32, DepthBufferStats { drawcalls: 500, vertices: 9000, width: 1920, height: 1080 });
        candidates.insert(3u32, DepthBufferStats { drawcalls: 10_000, vertices: 1, width: 64, height: 64 });

        let picked = select_depth_buffer(&candidates, 1920, 1080);
        assert_eq!(picked, Some(2));
    }

    #[test]
    fn rejects_mismatched_aspect_ratio() {
        let mut candidates = HashMap::new();
        candidates.insert(1u32, DepthBufferStats { drawcalls: 1000, vertices: 1, width: 1080, height: 1920 });
        assert_eq!(select_depth_buffer(&candidates, 1920, 1080), None);
    }

    #[test]
    fn rejects_size_factor_outside_range() {
        let mut candidates = HashMap::new();
        // same aspect ratio as the target, but quarter the area: 0.25 < 0.5
        candidates.insert(1u32, DepthBufferStats { drawcalls: 1000, vertices: 1, width: 960, height: 540 });
        assert_eq!(select_depth_buffer(&candidates, 1920, 1080), None);
    }

    #[test]
    fn accepts_aspect_within_ten_percent() {
        let mut candidates = HashMap::new();
        // 1920x1050 aspect is within 10% of 1920x1080's.
        candidates.insert(1u32, DepthBufferStats { drawcalls: 5, vertices: 1, width: 1920, height: 1050 });
        assert_eq!(select_depth_buffer(&candidates, 1920, 1080), Some(1));
    }
}
