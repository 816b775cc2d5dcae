//! 光变曲线
//!
//! 时序库按时间升序返回 (时间戳, 星等, 星等误差)；这里过滤非有限值，
//! 把时间换算为相对第一个采样点的天数

/// 特征提取所需的最少有效采样点
pub const MIN_SAMPLES: usize = 5;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// 时序库返回的一行原始采样
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// 毫秒时间戳
    pub timestamp_ms: i64,
    pub magnitude: f64,
    pub error: f64,
}

impl RawSample {
    pub fn new(timestamp_ms: i64, magnitude: f64, error: f64) -> Self {
        Self {
            timestamp_ms,
            magnitude,
            error,
        }
    }
}

/// 过滤后的光变曲线，三个序列等长且不少于 `MIN_SAMPLES`
#[derive(Debug, Clone, PartialEq)]
pub struct LightCurve {
    pub times: Vec<f64>,
    pub magnitudes: Vec<f64>,
    pub errors: Vec<f64>,
}

impl LightCurve {
    /// 由原始采样构造光变曲线
    ///
    /// 有效点不足 `MIN_SAMPLES` 时返回 `None`，调用方据此静默跳过该候选
    pub fn from_samples(samples: &[RawSample]) -> Option<Self> {
        let t0 = samples.first()?.timestamp_ms;

        let mut times = Vec::with_capacity(samples.len());
        let mut magnitudes = Vec::with_capacity(samples.len());
        let mut errors = Vec::with_capacity(samples.len());

        for sample in samples {
            // 时间差溢出的行视为坏数据
            let Some(elapsed_ms) = sample.timestamp_ms.checked_sub(t0) else {
                continue;
            };
            let t = elapsed_ms as f64 / MILLIS_PER_DAY;
            if t.is_finite() && sample.magnitude.is_finite() && sample.error.is_finite() {
                times.push(t);
                magnitudes.push(sample.magnitude);
                errors.push(sample.error);
            }
        }

        if times.len() < MIN_SAMPLES {
            return None;
        }

        Some(Self {
            times,
            magnitudes,
            errors,
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: usize) -> Vec<RawSample> {
        (0..n)
            .map(|i| {
                RawSample::new(
                    1_600_000_000_000 + i as i64 * 43_200_000,
                    15.0 + i as f64 * 0.01,
                    0.02,
                )
            })
            .collect()
    }

    #[test]
    fn test_times_are_days_since_first_sample() {
        let lc = LightCurve::from_samples(&samples(6)).unwrap();
        assert_eq!(lc.len(), 6);
        assert_eq!(lc.times[0], 0.0);
        assert!((lc.times[1] - 0.5).abs() < 1e-12);
        assert!((lc.times[5] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_overflowing_timestamps_are_filtered() {
        let mut raw = vec![RawSample::new(-5, 15.0, 0.02)];
        raw.extend(samples(5));
        raw.push(RawSample::new(i64::MAX, 15.0, 0.02));
        raw.push(RawSample::new(i64::MIN, 15.0, 0.02));

        let lc = LightCurve::from_samples(&raw).unwrap();
        // i64::MAX - (-5) 溢出被丢弃；i64::MIN - (-5) 不溢出，保留
        assert_eq!(lc.len(), 7);
        assert!(lc.times.iter().all(|t| t.is_finite()));
    }

    #[test]
    fn test_too_few_samples_is_none() {
        assert!(LightCurve::from_samples(&samples(4)).is_none());
        assert!(LightCurve::from_samples(&[]).is_none());
    }

    #[test]
    fn test_non_finite_rows_are_dropped_before_counting() {
        let mut raw = samples(6);
        raw[2].magnitude = f64::NAN;
        raw[4].error = f64::INFINITY;

        assert!(LightCurve::from_samples(&raw).is_none());

        raw.extend(samples(8).into_iter().skip(6));
        let lc = LightCurve::from_samples(&raw).unwrap();
        assert_eq!(lc.len(), 6);
        assert!(lc.magnitudes.iter().all(|m| m.is_finite()));
        assert_eq!(lc.times.len(), lc.errors.len());
    }
}
