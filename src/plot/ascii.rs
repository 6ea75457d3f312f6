//! ASCII plotting for terminal output.
//!
//! Fixed-size character grids, deterministic so they can be snapshot-tested.
//!
//! Variance trace elements:
//! - samples at or below the threshold: `o`
//! - samples above the threshold: `X`
//! - trace between samples: `-`
//! - threshold line: `.`
//!
//! Regressor maps use `#` for flagged and `.` for clean time indices.

use ndarray::{ArrayView1, ArrayView2};

/// Plot a variance trace (one value per volume) against the threshold.
pub fn render_variance_trace(
    title: &str,
    values: ArrayView1<'_, f64>,
    threshold: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let n = values.len();

    let peak = values.iter().copied().filter(|v| v.is_finite()).fold(threshold, f64::max);
    let top = if peak > 0.0 { peak * 1.05 } else { 1.0 };

    let mut grid = vec![vec![' '; width]; height];

    let points: Vec<(usize, usize)> = values
        .iter()
        .enumerate()
        .map(|(t, &v)| (map_x(t, n, width), map_y(v, top, height)))
        .collect();

    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        draw_line(&mut grid, x0, y0, x1, y1, '-');
    }

    let threshold_row = map_y(threshold, top, height);
    for cell in grid[threshold_row].iter_mut() {
        if *cell == ' ' {
            *cell = '.';
        }
    }

    for (&(x, y), &v) in points.iter().zip(values.iter()) {
        grid[y][x] = if v > threshold { 'X' } else { 'o' };
    }

    let above: Vec<String> = values
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v > threshold)
        .map(|(t, _)| t.to_string())
        .collect();

    let mut out = String::new();
    out.push_str(&format!(
        "{title}: volumes=[0, {}] | variance=[0.00, {top:.2}] | threshold={threshold:.2}\n",
        n.saturating_sub(1)
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    if above.is_empty() {
        out.push_str("above threshold: none\n");
    } else {
        out.push_str(&format!("above threshold: {}\n", above.join(", ")));
    }
    out
}

/// One row per slice, one column per volume (or per bucket of volumes when
/// there are more volumes than columns).
pub fn render_slice_regressor(regressor: ArrayView2<'_, bool>, width: usize) -> String {
    let (n_vol, n_slice) = regressor.dim();
    let flagged = regressor.iter().filter(|&&b| b).count();
    let label_width = n_slice.saturating_sub(1).to_string().len();

    let mut out = format!("Slice regressor: volumes={n_vol} slices={n_slice} flagged={flagged}\n");
    for (s, column) in regressor.columns().into_iter().enumerate() {
        let flags: Vec<bool> = column.to_vec();
        out.push_str(&format!("{s:>label_width$} |{}|\n", bucket_cells(&flags, width)));
    }
    out
}

pub fn render_volume_regressor(regressor: ArrayView1<'_, bool>, width: usize) -> String {
    let flags = regressor.to_vec();
    let flagged = flags.iter().filter(|&&b| b).count();
    format!(
        "Volume regressor: volumes={} flagged={flagged}\n|{}|\n",
        flags.len(),
        bucket_cells(&flags, width)
    )
}

fn bucket_cells(flags: &[bool], width: usize) -> String {
    let n = flags.len();
    let cols = n.min(width.max(1));
    (0..cols)
        .map(|c| {
            let lo = c * n / cols;
            let hi = ((c + 1) * n / cols).max(lo + 1);
            if flags[lo..hi].iter().any(|&b| b) { '#' } else { '.' }
        })
        .collect()
}

fn map_x(t: usize, n: usize, width: usize) -> usize {
    if n < 2 {
        return 0;
    }
    let u = t as f64 / (n as f64 - 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(v: f64, top: f64, height: usize) -> usize {
    let u = if v.is_finite() { (v / top).clamp(0.0, 1.0) } else { 1.0 };
    // Larger values sit nearer row 0.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham). Only blank cells are written.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid
            .get_mut(y0 as usize)
            .and_then(|row| row.get_mut(x0 as usize))
        {
            if *cell == ' ' {
                *cell = ch;
            }
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
