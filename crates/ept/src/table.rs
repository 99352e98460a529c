//! Point records and the merged point table.

/// One decoded LIDAR return in real-world dataset coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub intensity: u16,
    pub classification: u8,
    pub return_number: u8,
    pub number_of_returns: u8,
}

/// Row order carries no meaning. Merging appends; rows are never deduplicated
/// because distinct octree nodes never share points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointTable {
    rows: Vec<PointRecord>,
}

impl PointTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn push(&mut self, record: PointRecord) {
        self.rows.push(record);
    }

    #[inline]
    pub fn rows(&self) -> &[PointRecord] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PointRecord> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<PointRecord> {
        self.rows
    }

    /// Append all rows of `other`.
    pub fn merge(&mut self, other: PointTable) {
        if self.rows.is_empty() {
            self.rows = other.rows;
        } else {
            self.rows.extend(other.rows);
        }
    }

    /// Mean and sample standard deviation (n - 1) of Z.
    ///
    /// `None` for fewer than two rows, where the deviation is undefined.
    pub fn z_stats(&self) -> Option<(f64, f64)> {
        let n = self.rows.len();
        if n < 2 {
            return None;
        }

        let mean = self.rows.iter().map(|p| p.z).sum::<f64>() / n as f64;
        let var = self
            .rows
            .iter()
            .map(|p| {
                let d = p.z - mean;
                d * d
            })
            .sum::<f64>()
            / (n - 1) as f64;

        Some((mean, var.sqrt()))
    }

    /// Keep rows with `low <= z <= high`.
    pub fn retain_elevation(&mut self, low: f64, high: f64) {
        self.rows.retain(|p| p.z >= low && p.z <= high);
    }

    /// Keep rows inside the axis-aligned square of side `box_size` centred on
    /// `(cx, cy)`. Both edges are inclusive.
    pub fn crop(&mut self, cx: f64, cy: f64, box_size: f64) {
        let half = box_size / 2.0;
        let (x_lo, x_hi) = (cx - half, cx + half);
        let (y_lo, y_hi) = (cy - half, cy + half);

        self.rows
            .retain(|p| p.x >= x_lo && p.x <= x_hi && p.y >= y_lo && p.y <= y_hi);
    }

    pub fn max_intensity(&self) -> Option<u16> {
        self.rows.iter().map(|p| p.intensity).max()
    }
}

impl FromIterator<PointRecord> for PointTable {
    fn from_iter<I: IntoIterator<Item = PointRecord>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl Extend<PointRecord> for PointTable {
    fn extend<I: IntoIterator<Item = PointRecord>>(&mut self, iter: I) {
        self.rows.extend(iter);
    }
}

impl IntoIterator for PointTable {
    type Item = PointRecord;
    type IntoIter = std::vec::IntoIter<PointRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a PointTable {
    type Item = &'a PointRecord;
    type IntoIter = std::slice::Iter<'a, PointRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64, z: f64) -> PointRecord {
        PointRecord {
            x,
            y,
            z,
            intensity: 0,
            classification: 1,
            return_number: 1,
            number_of_returns: 1,
        }
    }

    #[test]
    fn merge_appends_without_dedup() {
        let mut a: PointTable = [at(1.0, 1.0, 1.0)].into_iter().collect();
        let b: PointTable = [at(1.0, 1.0, 1.0), at(2.0, 2.0, 2.0)].into_iter().collect();
        a.merge(b);
        assert_eq!(a.len(), 3);

        let mut empty = PointTable::new();
        empty.merge(a.clone());
        assert_eq!(empty, a);
    }

    #[test]
    fn z_stats_use_sample_deviation() {
        // mean 10, sample std 2: values 8, 10, 12 -> var = (4 + 0 + 4) / 2 = 4
        let t: PointTable = [8.0, 10.0, 12.0].iter().map(|&z| at(0.0, 0.0, z)).collect();
        let (mean, std) = t.z_stats().unwrap();
        assert!((mean - 10.0).abs() < 1e-12);
        assert!((std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn z_stats_need_two_rows() {
        assert_eq!(PointTable::new().z_stats(), None);
        let single: PointTable = [at(0.0, 0.0, 5.0)].into_iter().collect();
        assert_eq!(single.z_stats(), None);
    }

    #[test]
    fn elevation_filter_is_inclusive() {
        let mut t: PointTable = [-1.0, 0.0, 500.0, 1000.0, 1000.5]
            .iter()
            .map(|&z| at(0.0, 0.0, z))
            .collect();
        t.retain_elevation(0.0, 1000.0);
        let zs: Vec<f64> = t.iter().map(|p| p.z).collect();
        assert_eq!(zs, vec![0.0, 500.0, 1000.0]);
    }

    #[test]
    fn crop_keeps_edges() {
        let mut t: PointTable = [
            at(450.0, 500.0, 1.0),
            at(550.0, 550.0, 1.0),
            at(449.999, 500.0, 1.0),
            at(500.0, 550.001, 1.0),
            at(500.0, 500.0, 1.0),
        ]
        .into_iter()
        .collect();

        t.crop(500.0, 500.0, 100.0);
        assert_eq!(t.len(), 3);
        for p in &t {
            assert!((450.0..=550.0).contains(&p.x));
            assert!((450.0..=550.0).contains(&p.y));
        }
    }

    #[test]
    fn max_intensity_of_empty_table() {
        assert_eq!(PointTable::new().max_intensity(), None);
    }
}
