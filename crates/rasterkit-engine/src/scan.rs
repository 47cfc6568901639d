//! Scan-order generation
//!
//! Produces the lines of pixels walked by the beam. Both generators cover
//! every pixel of the image exactly once:
//! - [`RowScan`]: one line per row, ascending x (direction alternation is
//!   applied later by the parser)
//! - [`DiagonalScan`]: anti-diagonal zigzag, each line one diagonal run

use rasterkit_core::{ImageSize, Line, PixelCoord};

/// A generated line together with the run progress at the time it is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanLine {
    pub pixels: Line,
    pub percent: u8,
}

/// Scan order selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrder {
    Rows,
    Diagonal,
}

impl ScanOrder {
    pub fn from_diagonal(diagonal: bool) -> Self {
        if diagonal {
            ScanOrder::Diagonal
        } else {
            ScanOrder::Rows
        }
    }

    /// Iterator over the lines of an image of `size`.
    pub fn lines(self, size: ImageSize) -> ScanLines {
        match self {
            ScanOrder::Rows => ScanLines::Rows(RowScan::new(size)),
            ScanOrder::Diagonal => ScanLines::Diagonal(DiagonalScan::new(size)),
        }
    }
}

impl std::fmt::Display for ScanOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanOrder::Rows => write!(f, "rows"),
            ScanOrder::Diagonal => write!(f, "diagonal"),
        }
    }
}

/// Either scan generator behind one iterator type.
#[derive(Debug, Clone)]
pub enum ScanLines {
    Rows(RowScan),
    Diagonal(DiagonalScan),
}

impl Iterator for ScanLines {
    type Item = ScanLine;

    fn next(&mut self) -> Option<ScanLine> {
        match self {
            ScanLines::Rows(scan) => scan.next(),
            ScanLines::Diagonal(scan) => scan.next(),
        }
    }
}

/// Row-major scan, bottom row first.
#[derive(Debug, Clone)]
pub struct RowScan {
    size: ImageSize,
    y: u32,
}

impl RowScan {
    pub fn new(size: ImageSize) -> Self {
        Self { size, y: 0 }
    }
}

impl Iterator for RowScan {
    type Item = ScanLine;

    fn next(&mut self) -> Option<ScanLine> {
        if self.y >= self.size.height || self.size.width == 0 {
            return None;
        }

        let y = self.y;
        self.y += 1;

        Some(ScanLine {
            pixels: (0..self.size.width).map(|x| PixelCoord::new(x, y)).collect(),
            percent: percent_of(y as u64, self.size.height as u64),
        })
    }
}

/// Anti-diagonal zigzag scan.
///
/// Pixels with an odd `x + y` step south-west, even ones north-east. Hitting
/// an edge clamps the walker onto the next diagonal and ends the current line.
#[derive(Debug, Clone)]
pub struct DiagonalScan {
    width: i64,
    height: i64,
    x: i64,
    y: i64,
    end_of_line: bool,
    /// Steps left, seeded with one extra step that flushes the final line.
    remaining: u64,
    total: u64,
    line: Line,
}

impl DiagonalScan {
    pub fn new(size: ImageSize) -> Self {
        let total = size.pixel_count() + 1;
        Self {
            width: size.width as i64,
            height: size.height as i64,
            x: 0,
            y: 0,
            end_of_line: false,
            remaining: total,
            total,
            line: Vec::new(),
        }
    }

    /// Remaining step count; zero once the terminal state is reached.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    fn visit(&mut self) {
        self.line.push(PixelCoord::new(self.x as u32, self.y as u32));

        if (self.x + self.y) % 2 == 1 {
            // south-west
            self.x -= 1;
            self.y += 1;
            if self.y == self.height {
                self.y -= 1;
                self.x += 2;
                self.end_of_line = true;
            }
            if self.x < 0 {
                self.x = 0;
                self.end_of_line = true;
            }
        } else {
            // north-east
            self.x += 1;
            self.y -= 1;
            if self.x == self.width {
                self.x -= 1;
                self.y += 2;
                self.end_of_line = true;
            }
            if self.y < 0 {
                self.y = 0;
                self.end_of_line = true;
            }
        }
    }
}

impl Iterator for DiagonalScan {
    type Item = ScanLine;

    fn next(&mut self) -> Option<ScanLine> {
        while self.remaining > 0 {
            self.remaining -= 1;

            let flushed = if (self.end_of_line || self.remaining == 0) && !self.line.is_empty() {
                self.end_of_line = false;
                Some(std::mem::take(&mut self.line))
            } else {
                None
            };

            if self.remaining > 0 {
                self.visit();
            }

            if let Some(pixels) = flushed {
                return Some(ScanLine {
                    pixels,
                    percent: 100 - percent_of(self.remaining, self.total),
                });
            }
        }
        None
    }
}

fn percent_of(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn coords(lines: &[ScanLine]) -> Vec<(u32, u32)> {
        lines
            .iter()
            .flat_map(|line| line.pixels.iter().map(|c| (c.x, c.y)))
            .collect()
    }

    fn assert_covers_once(size: ImageSize, lines: &[ScanLine]) {
        let visited = coords(lines);
        let unique: HashSet<_> = visited.iter().copied().collect();
        assert_eq!(visited.len() as u64, size.pixel_count(), "{size}");
        assert_eq!(unique.len(), visited.len(), "{size}");
        assert!(visited.iter().all(|&(x, y)| x < size.width && y < size.height));
    }

    #[test]
    fn test_rows_ascending() {
        let lines: Vec<_> = RowScan::new(ImageSize::new(3, 2)).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(coords(&lines[..1]), vec![(0, 0), (1, 0), (2, 0)]);
        assert_eq!(coords(&lines[1..]), vec![(0, 1), (1, 1), (2, 1)]);
        assert_eq!(lines[0].percent, 0);
        assert_eq!(lines[1].percent, 50);
    }

    #[test]
    fn test_diagonal_3x3() {
        let mut scan = DiagonalScan::new(ImageSize::new(3, 3));
        let lines: Vec<_> = scan.by_ref().collect();

        let runs: Vec<_> = lines.iter().map(|l| coords(std::slice::from_ref(l))).collect();
        assert_eq!(
            runs,
            vec![
                vec![(0, 0)],
                vec![(1, 0), (0, 1)],
                vec![(0, 2), (1, 1), (2, 0)],
                vec![(2, 1), (1, 2)],
                vec![(2, 2)],
            ]
        );
        assert_covers_once(ImageSize::new(3, 3), &lines);
        assert_eq!(scan.remaining(), 0);
        assert_eq!(lines.last().unwrap().percent, 100);
    }

    #[test]
    fn test_diagonal_progress_is_monotonic() {
        let lines: Vec<_> = DiagonalScan::new(ImageSize::new(7, 4)).collect();
        assert!(lines.windows(2).all(|w| w[0].percent <= w[1].percent));
    }

    #[test]
    fn test_diagonal_single_row_and_column() {
        let size = ImageSize::new(4, 1);
        let lines: Vec<_> = DiagonalScan::new(size).collect();
        assert_covers_once(size, &lines);
        assert_eq!(lines.len(), 4);

        let size = ImageSize::new(1, 3);
        let lines: Vec<_> = DiagonalScan::new(size).collect();
        assert_covers_once(size, &lines);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_images() {
        assert_eq!(DiagonalScan::new(ImageSize::new(0, 0)).count(), 0);
        assert_eq!(DiagonalScan::new(ImageSize::new(0, 5)).count(), 0);
        assert_eq!(RowScan::new(ImageSize::new(0, 5)).count(), 0);
        assert_eq!(RowScan::new(ImageSize::new(5, 0)).count(), 0);
    }

    #[test]
    fn test_scan_order_dispatch() {
        let size = ImageSize::new(2, 2);
        assert_eq!(ScanOrder::from_diagonal(false).lines(size).count(), 2);
        assert_eq!(ScanOrder::from_diagonal(true).lines(size).count(), 3);
    }

    proptest! {
        #[test]
        fn prop_rows_cover_every_pixel_once(width in 1u32..40, height in 1u32..40) {
            let size = ImageSize::new(width, height);
            let lines: Vec<_> = RowScan::new(size).collect();
            assert_covers_once(size, &lines);
        }

        #[test]
        fn prop_diagonal_covers_every_pixel_once(width in 1u32..40, height in 1u32..40) {
            let size = ImageSize::new(width, height);
            let mut scan = DiagonalScan::new(size);
            let lines: Vec<_> = scan.by_ref().collect();
            assert_covers_once(size, &lines);
            prop_assert_eq!(scan.remaining(), 0);
        }
    }
}
