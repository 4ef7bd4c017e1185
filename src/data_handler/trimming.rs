//! Bounded-grid trimming.
//!
//! Grids with more than `max_nbins` rows are downsampled by stride sampling: with
//! `tf = ceil(sqrt(n / trim_target))²`, rows `0, tf, 2·tf, …` are kept, in their original order.
//! Histograms are trimmed axis by axis with stride `sqrt(tf)`: the z axis first (only if it has
//! more than `z_axis_trim_threshold` bins), then y, then x, stopping as soon as the running bin
//! count fits.
use crate::{
    constants::RawRow,
    data_handler::context::{Histogram, IngestionContext},
};

/// Keep every `stride`-th element, starting with the first.
pub fn stride_sample<T>(items: Vec<T>, stride: usize) -> Vec<T> {
    if stride <= 1 {
        return items;
    }
    items.into_iter().step_by(stride).collect()
}

/// Trim a list of rows read from `source`.
///
/// Arguments
/// -----------------
/// * `rows`: the rows in file order
/// * `source`: name used in the log lines
/// * `ctx`: carries the limits and the trim factor
///
/// Return
/// ----------
/// * The strided subsequence, or `rows` untouched when they fit or trimming is disabled.
pub fn trim_rows(rows: Vec<RawRow>, source: &str, ctx: &mut IngestionContext) -> Vec<RawRow> {
    let n = rows.len();
    if n <= ctx.params().max_nbins {
        return rows;
    }
    if !ctx.params().allow_trimming {
        ctx.warn_once(format!(
            "{source} has {n} points, more than {}, but trimming is disabled",
            ctx.params().max_nbins
        ));
        return rows;
    }
    let factor = ctx.trim_factor_for(n);
    let trimmed = stride_sample(rows, factor);
    log::info!(
        "{source}: trimmed {n} points to {} (trim factor {factor})",
        trimmed.len()
    );
    trimmed
}

/// Flatten a histogram into rows `[centre_x, (centre_y, (centre_z,)) content]`, trimming its
/// axes first when it holds too many bins.
///
/// Rows are emitted with the x index outermost.
pub fn histogram_rows(hist: &Histogram, source: &str, ctx: &mut IngestionContext) -> Vec<RawRow> {
    let mut kept: Vec<Vec<usize>> = hist.axes.iter().map(|a| (0..a.len()).collect()).collect();
    let mut nbins = hist.nbins();
    let max_nbins = ctx.params().max_nbins;

    if nbins > max_nbins {
        if ctx.params().allow_trimming {
            let factor = ctx.trim_factor_for(nbins);
            let stride = ((factor as f64).sqrt().round() as usize).max(1);
            let threshold = ctx.params().z_axis_trim_threshold;

            // z, then y, then x
            for axis in (0..hist.dimension()).rev() {
                if nbins <= max_nbins {
                    break;
                }
                if axis == 2 && kept[axis].len() <= threshold {
                    continue;
                }
                kept[axis] = stride_sample(std::mem::take(&mut kept[axis]), stride);
                nbins = kept.iter().map(|k| k.len()).product();
            }
            log::info!(
                "{source}: trimmed histogram from {} to {nbins} bins (stride {stride})",
                hist.nbins()
            );
        } else {
            ctx.warn_once(format!(
                "{source} has {nbins} bins, more than {max_nbins}, but trimming is disabled"
            ));
        }
    }

    let mut rows = Vec::with_capacity(nbins);
    let mut index = vec![0; hist.dimension()];
    collect_bins(hist, &kept, 0, &mut index, &mut rows);
    rows
}

fn collect_bins(
    hist: &Histogram,
    kept: &[Vec<usize>],
    axis: usize,
    index: &mut Vec<usize>,
    rows: &mut Vec<RawRow>,
) {
    if axis == kept.len() {
        let mut row: RawRow = index
            .iter()
            .zip(&hist.axes)
            .map(|(i, centres)| centres[*i])
            .collect();
        row.push(hist.content(index));
        rows.push(row);
        return;
    }
    for i in &kept[axis] {
        index[axis] = *i;
        collect_bins(hist, kept, axis + 1, index, rows);
    }
}
