//! Rolling traces of normalized IMU channels and their magnitudes

use std::collections::VecDeque;

use imu_telemetry::Sample;

/// Which sensor a trace is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Accel,
    Gyro,
}

/// One tracked quantity
#[derive(Debug, Clone, Copy)]
pub struct TraceDef {
    pub key: &'static str,
    pub title: &'static str,
    pub source: Source,
    /// Axis indices (0 = X, 1 = Y, 2 = Z) combined into the trace
    pub axes: &'static [usize],
}

impl TraceDef {
    /// Value range for a normalized input
    ///
    /// Single axes span [-1, 1]; an n-axis magnitude spans [0, sqrt(n)].
    pub fn range(&self) -> (f32, f32) {
        if self.axes.len() == 1 {
            (-1.0, 1.0)
        } else {
            (0.0, (self.axes.len() as f32).sqrt())
        }
    }

    fn evaluate(&self, accel: &[f32; 3], gyro: &[f32; 3]) -> f32 {
        let v = match self.source {
            Source::Accel => accel,
            Source::Gyro => gyro,
        };
        match self.axes {
            [axis] => v[*axis],
            axes => axes.iter().map(|&a| v[a] * v[a]).sum::<f32>().sqrt(),
        }
    }
}

const fn accel(key: &'static str, title: &'static str, axes: &'static [usize]) -> TraceDef {
    TraceDef {
        key,
        title,
        source: Source::Accel,
        axes,
    }
}

const fn gyro(key: &'static str, title: &'static str, axes: &'static [usize]) -> TraceDef {
    TraceDef {
        key,
        title,
        source: Source::Gyro,
        axes,
    }
}

pub const TRACES: [TraceDef; 14] = [
    accel("ax", "Accel X--", &[0]),
    accel("ay", "Accel -Y-", &[1]),
    accel("az", "Accel --Z", &[2]),
    accel("axy", "Accel XY-", &[0, 1]),
    accel("axz", "Accel X-Z", &[0, 2]),
    accel("ayz", "Accel -YZ", &[1, 2]),
    accel("axyz", "Accel XYZ", &[0, 1, 2]),
    gyro("gx", "Gyro X--", &[0]),
    gyro("gy", "Gyro -Y-", &[1]),
    gyro("gz", "Gyro --Z", &[2]),
    gyro("gxy", "Gyro XY-", &[0, 1]),
    gyro("gxz", "Gyro X-Z", &[0, 2]),
    gyro("gyz", "Gyro -YZ", &[1, 2]),
    gyro("gxyz", "Gyro XYZ", &[0, 1, 2]),
];

/// Window statistics for one trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceSummary {
    pub key: &'static str,
    pub min: f32,
    pub last: f32,
    pub max: f32,
}

/// Fixed-length history per trace, oldest first
pub struct Traces {
    window: usize,
    data: Vec<VecDeque<f32>>,
}

impl Traces {
    /// Every trace starts zero-filled to `window` points
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            data: TRACES
                .iter()
                .map(|_| std::iter::repeat(0.0).take(window).collect())
                .collect(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Append one sample, dropping the oldest point of every trace
    pub fn push(&mut self, sample: &Sample) {
        let accel = sample.accel_normalized();
        let gyro = sample.gyro_normalized();

        for (def, points) in TRACES.iter().zip(self.data.iter_mut()) {
            points.pop_front();
            points.push_back(def.evaluate(&accel, &gyro));
        }
    }

    pub fn summaries(&self) -> Vec<TraceSummary> {
        TRACES
            .iter()
            .zip(self.data.iter())
            .map(|(def, points)| TraceSummary {
                key: def.key,
                min: points.iter().copied().fold(f32::INFINITY, f32::min),
                last: points.back().copied().unwrap_or_default(),
                max: points.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            })
            .collect()
    }
}
