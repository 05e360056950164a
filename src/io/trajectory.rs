//! Trajectory output in the TUM/Freiburg text format.
//!
//! One line per pose: `timestamp tx ty tz qx qy qz qw`. The timestamp is
//! printed in seconds with six decimals; the remaining fields are the
//! single-precision pose printed with six significant digits (`%g`), the way
//! existing evaluation tooling and reference trajectories expect.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nalgebra::{Rotation3, UnitQuaternion};

use crate::tracking::result::TrajectoryRecord;

/// Significant digits for pose fields.
const POSE_PRECISION: usize = 6;

/// Destination for accumulated poses.
pub trait TrajectorySink {
    fn append(&mut self, record: &TrajectoryRecord) -> Result<()>;
}

/// Writes Freiburg lines to a file that is truncated once on creation.
#[derive(Debug)]
pub struct FreiburgWriter {
    path: PathBuf,
    lines: usize,
}

impl FreiburgWriter {
    /// Truncate (or create) `path`. Subsequent appends add one line each.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        File::create(&path)
            .with_context(|| format!("Failed to truncate trajectory file {}", path.display()))?;
        Ok(Self { path, lines: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> usize {
        self.lines
    }
}

impl TrajectorySink for FreiburgWriter {
    fn append(&mut self, record: &TrajectoryRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {} for append", self.path.display()))?;
        file.write_all(format_record(record).as_bytes())
            .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        self.lines += 1;
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<TrajectoryRecord>,
}

impl TrajectorySink for MemorySink {
    fn append(&mut self, record: &TrajectoryRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Format one record as a newline-terminated Freiburg line.
pub fn format_record(record: &TrajectoryRecord) -> String {
    let mat = record.pose.to_matrix().cast::<f32>();
    let rot = mat.fixed_view::<3, 3>(0, 0).into_owned();
    let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rot));
    let seconds = record.timestamp as f64 / 1_000_000.0;

    format!(
        "{:.6} {} {} {} {} {} {} {}\n",
        seconds,
        format_general(mat[(0, 3)]),
        format_general(mat[(1, 3)]),
        format_general(mat[(2, 3)]),
        format_general(q.i),
        format_general(q.j),
        format_general(q.k),
        format_general(q.w),
    )
}

/// `%g`-style formatting with six significant digits.
///
/// Fixed notation unless the decimal exponent is below -4 or at least the
/// precision; trailing zeros (and a bare decimal point) are dropped.
pub fn format_general(x: f32) -> String {
    if x == 0.0 {
        return if x.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let x = x as f64;
    let sci = format!("{:.*e}", POSE_PRECISION - 1, x);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= POSE_PRECISION as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", strip_trailing_zeros(mantissa), sign, exp.abs())
    } else {
        let decimals = (POSE_PRECISION as i32 - 1 - exp) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, x)).to_string()
    }
}

fn strip_trailing_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
