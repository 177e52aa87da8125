use std::collections::HashSet;

/// The "category20" scheme, which is what the charts fall back to when no
/// color is configured.
pub const CATEGORY20: [&str; 20] = [
    "#1f77b4", "#aec7e8", "#ff7f0e", "#ffbb78", "#2ca02c", "#98df8a", "#d62728", "#ff9896",
    "#9467bd", "#c5b0d5", "#8c564b", "#c49c94", "#e377c2", "#f7b6d2", "#7f7f7f", "#c7c7c7",
    "#bcbd22", "#dbdb8d", "#17becf", "#9edae5",
];

/// Hands out distinct colors, skipping the ones already claimed by the
/// configuration.
pub(crate) struct Palette {
    used: HashSet<String>,
    next_idx: usize,
}

impl Palette {
    pub(crate) fn new<'a, I: IntoIterator<Item = &'a String>>(reserved: I) -> Palette {
        Palette {
            used: reserved.into_iter().map(|c| c.to_lowercase()).collect(),
            next_idx: 0,
        }
    }

    pub(crate) fn next_color(&mut self) -> String {
        loop {
            let idx = self.next_idx;
            self.next_idx += 1;
            let c = match CATEGORY20.get(idx) {
                Some(c) => c.to_string(),
                None => generated_color(idx - CATEGORY20.len()),
            };
            if self.used.insert(c.clone()) {
                return c;
            }
        }
    }
}

// Golden angle hue rotation, alternating between two lightness levels.
fn generated_color(idx: usize) -> String {
    let hue = (idx as f64 * 137.508) % 360.0;
    let lightness = if idx % 2 == 0 { 0.45 } else { 0.65 };
    let (r, g, b) = hsl_to_rgb(hue, 0.6, lightness);
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r1), to_u8(g1), to_u8(b1))
}
