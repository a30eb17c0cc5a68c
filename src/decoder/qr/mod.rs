//! QR code decoding
//!
//! The candidate's finder centres anchor a perspective grid. For version 2
//! and up the bottom-right alignment pattern is searched near its predicted
//! position and used as the fourth anchor. The sampled grid yields format
//! and version information, then the unmasked codewords in placement order.

/// Format and version information (BCH-protected metadata)
pub mod format;
/// Function module mask and data placement order
pub mod function_mask;
/// Segment stream interpretation
pub mod payload;
/// Capacity and block tables
pub mod tables;

use log::trace;

use self::format::{FormatInfo, read_version};
use self::function_mask::FunctionMask;
use self::tables::{block_layout, dimension, total_codewords, version_for_dimension};
use super::SymbolDecoder;
use crate::correction::{CorrectedPayload, QR_FIELD, RawData, RawPayload};
use crate::models::{BitMatrix, Candidate, Point, Quad, Symbology, SymbologyFamily};
use crate::utils::geometry::{PerspectiveTransform, sample_grid};

/// Minimum template agreement (of 25 modules) for an alignment pattern
const ALIGNMENT_MIN_SCORE: usize = 22;

/// Decoder for QR Model 2 symbols
#[derive(Debug, Default)]
pub struct QrDecoder;

/// Finder centres of a candidate in image space
#[derive(Debug, Clone, Copy)]
struct Anchors {
    top_left: Point,
    top_right: Point,
    bottom_left: Point,
}

impl QrDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a sampled and still masked module grid
    pub fn read_grid(grid: &BitMatrix) -> Option<(u8, FormatInfo, Vec<u8>)> {
        let version = version_for_dimension(grid.width())?;
        if grid.height() != grid.width() {
            return None;
        }
        if version >= 7 && read_version(grid) != Some(version) {
            trace!("qr: version block disagrees with {version}");
            return None;
        }
        let format = FormatInfo::read(grid)?;
        let mask = FunctionMask::new(version);
        let total_bits = total_codewords(version) * 8;

        let mut codewords = vec![0u8; total_bits / 8];
        for (i, &(x, y)) in mask.data_positions().iter().take(total_bits).enumerate() {
            let bit = grid.get(x, y) ^ format.mask_pattern.is_masked(y, x);
            if bit {
                codewords[i / 8] |= 0x80 >> (i % 8);
            }
        }
        Some((version, format, codewords))
    }

    fn anchors(candidate: &Candidate, hint: usize) -> Option<Anchors> {
        let transform =
            PerspectiveTransform::grid_to_quad(hint as f32, hint as f32, &candidate.quad)?;
        let d = hint as f32;
        Some(Anchors {
            top_left: transform.transform(&Point::new(3.5, 3.5)),
            top_right: transform.transform(&Point::new(d - 3.5, 3.5)),
            bottom_left: transform.transform(&Point::new(3.5, d - 3.5)),
        })
    }

    fn decode_at(
        &self,
        image: &BitMatrix,
        anchors: &Anchors,
        version: u8,
        module_size: f32,
    ) -> Option<RawPayload> {
        let dim = dimension(version);
        let d = dim as f32;
        let Anchors {
            top_left: tl,
            top_right: tr,
            bottom_left: bl,
        } = *anchors;
        let src_finders = [
            Point::new(3.5, 3.5),
            Point::new(d - 3.5, 3.5),
            Point::new(3.5, d - 3.5),
        ];

        let mut transforms = Vec::with_capacity(2);
        if version >= 2 {
            if let Some(center) = find_alignment(image, anchors, dim) {
                transforms.push(PerspectiveTransform::from_points(
                    &[src_finders[0], src_finders[1], Point::new(d - 6.5, d - 6.5), src_finders[2]],
                    &[tl, tr, center, bl],
                ));
            }
        }
        let corner = Point::new(tr.x + bl.x - tl.x, tr.y + bl.y - tl.y);
        transforms.push(PerspectiveTransform::from_points(
            &[src_finders[0], src_finders[1], Point::new(d - 3.5, d - 3.5), src_finders[2]],
            &[tl, tr, corner, bl],
        ));

        for transform in transforms.into_iter().flatten() {
            let Some(grid) = sample_grid(image, &transform, dim, dim, module_size) else {
                continue;
            };
            let Some((version, format, codewords)) = Self::read_grid(&grid) else {
                continue;
            };
            let layout = block_layout(version, format.ec_level)?;
            let quad = Quad::new(
                transform.transform(&Point::new(0.0, 0.0)),
                transform.transform(&Point::new(d, 0.0)),
                transform.transform(&Point::new(d, d)),
                transform.transform(&Point::new(0.0, d)),
            );
            trace!("qr: sampled version {version} {:?} {:?}", format.ec_level, format.mask_pattern);
            return Some(RawPayload {
                symbology: Symbology::QrCode,
                quad,
                quality: timing_quality(&grid),
                version: version as usize,
                data: RawData::Codewords {
                    codewords,
                    layout,
                    field: &QR_FIELD,
                },
            });
        }
        None
    }
}

impl SymbolDecoder for QrDecoder {
    fn handles(&self, family: SymbologyFamily) -> bool {
        family == SymbologyFamily::Qr
    }

    fn try_decode(&self, candidate: &Candidate, image: &BitMatrix) -> Option<RawPayload> {
        let hint = candidate.grid.map_or(21, |(rows, _)| rows);
        let anchors = Self::anchors(candidate, hint)?;

        // The finder spacing can misjudge the size by a version or two
        [0i32, 4, -4, 8, -8]
            .into_iter()
            .filter_map(|delta| usize::try_from(hint as i32 + delta).ok())
            .filter_map(version_for_dimension)
            .find_map(|version| {
                let span = (dimension(version) - 7) as f32;
                let module_size = anchors.top_left.distance(&anchors.top_right) / span;
                self.decode_at(image, &anchors, version, module_size)
            })
    }

    fn interpret(&self, payload: &CorrectedPayload) -> Option<String> {
        payload::decode_segments(&payload.data, payload.version as u8)
    }
}

/// Fraction of timing pattern modules that alternate as expected
fn timing_quality(grid: &BitMatrix) -> f32 {
    let size = grid.width();
    if size < 17 {
        return 0.0;
    }
    let mut matches = 0usize;
    let mut total = 0usize;
    for i in 8..size - 8 {
        let expected = i % 2 == 0;
        matches += (grid.get(i, 6) == expected) as usize;
        matches += (grid.get(6, i) == expected) as usize;
        total += 2;
    }
    matches as f32 / total as f32
}

/// Locate the bottom-right alignment pattern centre near its affine prediction
fn find_alignment(image: &BitMatrix, anchors: &Anchors, dim: usize) -> Option<Point> {
    let span = (dim - 7) as f32;
    let tl = anchors.top_left;
    let u = Point::new(
        (anchors.top_right.x - tl.x) / span,
        (anchors.top_right.y - tl.y) / span,
    );
    let v = Point::new(
        (anchors.bottom_left.x - tl.x) / span,
        (anchors.bottom_left.y - tl.y) / span,
    );
    let module = (u.x.hypot(u.y) + v.x.hypot(v.y)) / 2.0;
    if module < 1.0 {
        return None;
    }
    let offset = dim as f32 - 10.0;
    let predicted = Point::new(tl.x + offset * (u.x + v.x), tl.y + offset * (u.y + v.y));

    let score_at = |cx: f32, cy: f32| -> usize {
        let mut score = 0;
        for j in -2i32..=2 {
            for i in -2i32..=2 {
                let x = cx + i as f32 * u.x + j as f32 * v.x;
                let y = cy + i as f32 * u.y + j as f32 * v.y;
                let expected = i.abs().max(j.abs()) != 1;
                let dark = image.get_signed(x.floor() as i32, y.floor() as i32);
                score += (dark == expected) as usize;
            }
        }
        score
    };

    let radius = (module * 4.0).ceil() as i32;
    let step = ((module / 4.0).floor() as i32).max(1);
    let mut best = 0usize;
    let (mut sum_x, mut sum_y, mut hits) = (0.0f32, 0.0f32, 0usize);
    for dy in (-radius..=radius).step_by(step as usize) {
        for dx in (-radius..=radius).step_by(step as usize) {
            let (cx, cy) = (predicted.x + dx as f32, predicted.y + dy as f32);
            let score = score_at(cx, cy);
            if score > best {
                best = score;
                (sum_x, sum_y, hits) = (cx, cy, 1);
            } else if score == best {
                sum_x += cx;
                sum_y += cy;
                hits += 1;
            }
        }
    }
    (best >= ALIGNMENT_MIN_SCORE && hits > 0)
        .then(|| Point::new(sum_x / hits as f32, sum_y / hits as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecodeOptions;
    use crate::correction::correct;
    use crate::models::{ECLevel, MaskPattern};

    /// Version 1-M, mask 7, "4376471154038"
    const GOLDEN: [&str; 21] = [
        "#######.....#.#######",
        "#.....#..#....#.....#",
        "#.###.#...##..#.###.#",
        "#.###.#...#...#.###.#",
        "#.###.#..####.#.###.#",
        "#.....#.#.#...#.....#",
        "#######.#.#.#.#######",
        ".........#...........",
        "#..#.##.######.#.....",
        "###.#..##..#.#.#.##..",
        "#..#.####.##..###...#",
        "..#.#..#....#####....",
        "..#...##.#.#.###.##..",
        "........#.#..####.##.",
        "#######...###.#.####.",
        "#.....#.#.....##....#",
        "#.###.#..##.###..#.##",
        "#.###.#.#.#..####..##",
        "#.###.#..###.###.#..#",
        "#.....#..####..##..#.",
        "#######.###..#.###...",
    ];

    /// Scale a module grid into an image with a quiet zone
    fn render(grid: &BitMatrix, unit: usize, quiet: usize) -> BitMatrix {
        let size = (grid.width() + 2 * quiet) * unit;
        let mut image = BitMatrix::new(size, size);
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                if grid.get(x, y) {
                    for py in 0..unit {
                        for px in 0..unit {
                            image.set((x + quiet) * unit + px, (y + quiet) * unit + py, true);
                        }
                    }
                }
            }
        }
        image
    }

    fn candidate_for(dim: usize, unit: usize, quiet: usize) -> Candidate {
        let start = (quiet * unit) as f32;
        let end = ((quiet + dim) * unit) as f32;
        Candidate {
            family: SymbologyFamily::Qr,
            quad: Quad::from_rect(start, start, end, end),
            module_size: unit as f32,
            confidence: 1.0,
            grid: Some((dim, dim)),
        }
    }

    #[test]
    fn test_golden_grid_format_and_text() {
        let grid = BitMatrix::from_rows(&GOLDEN);
        let (version, format, codewords) = QrDecoder::read_grid(&grid).unwrap();
        assert_eq!(version, 1);
        assert_eq!(format.ec_level, ECLevel::M);
        assert_eq!(format.mask_pattern, MaskPattern::from_bits(7));
        assert_eq!(codewords.len(), 26);

        let raw = RawPayload {
            symbology: Symbology::QrCode,
            quad: Quad::from_rect(0.0, 0.0, 21.0, 21.0),
            quality: 1.0,
            version: version as usize,
            data: RawData::Codewords {
                codewords,
                layout: block_layout(version, format.ec_level).unwrap(),
                field: &QR_FIELD,
            },
        };
        let corrected = correct(raw, &DecodeOptions::default()).unwrap();
        assert_eq!(corrected.errors_corrected, 0);
        let text = QrDecoder::new().interpret(&corrected);
        assert_eq!(text.as_deref(), Some("4376471154038"));
    }

    #[test]
    fn test_sampled_image_decodes() {
        let grid = BitMatrix::from_rows(&GOLDEN);
        let image = render(&grid, 5, 4);
        let decoder = QrDecoder::new();
        let raw = decoder.try_decode(&candidate_for(21, 5, 4), &image).unwrap();
        assert!((raw.quality - 1.0).abs() < f32::EPSILON);
        let corrected = correct(raw, &DecodeOptions::default()).unwrap();
        assert_eq!(decoder.interpret(&corrected).as_deref(), Some("4376471154038"));
    }

    #[test]
    fn test_damaged_codewords_are_repaired() {
        let mut grid = BitMatrix::from_rows(&GOLDEN);
        // Two data modules in the lower-right codeword area
        grid.toggle(20, 20);
        grid.toggle(19, 18);
        let (version, format, codewords) = QrDecoder::read_grid(&grid).unwrap();
        let raw = RawPayload {
            symbology: Symbology::QrCode,
            quad: Quad::from_rect(0.0, 0.0, 21.0, 21.0),
            quality: 1.0,
            version: version as usize,
            data: RawData::Codewords {
                codewords,
                layout: block_layout(version, format.ec_level).unwrap(),
                field: &QR_FIELD,
            },
        };
        let corrected = correct(raw, &DecodeOptions::default()).unwrap();
        assert!(corrected.errors_corrected >= 1);
        assert!(corrected.confidence() < 1.0);
        assert_eq!(
            QrDecoder::new().interpret(&corrected).as_deref(),
            Some("4376471154038")
        );
    }

    #[test]
    fn test_blank_candidate_is_rejected() {
        let image = BitMatrix::new(145, 145);
        assert!(QrDecoder::new().try_decode(&candidate_for(21, 5, 4), &image).is_none());
    }
}
