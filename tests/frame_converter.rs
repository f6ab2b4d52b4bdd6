//! Shape and mapping properties of the frame to ASCII conversion.

use image::{GrayImage, Luma};
use termreel::{frame_to_ascii, output_dimensions, FrameConverter, GlyphRamp, Resample};

fn solid(w: u32, h: u32, v: u8) -> GrayImage {
    GrayImage::from_pixel(w, h, Luma([v]))
}

// Deterministic pseudo-random frame so failures are reproducible.
fn noise(w: u32, h: u32, seed: u32) -> GrayImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    GrayImage::from_fn(w, h, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        Luma([(state >> 24) as u8])
    })
}

const SIZES: &[(u32, u32)] = &[(1, 1), (3, 7), (16, 9), (20, 10), (64, 48), (320, 240), (7, 300)];
const WIDTHS: &[u32] = &[1, 2, 10, 33, 80];

#[test]
fn every_line_is_exactly_width_chars() {
    let ramp = GlyphRamp::default();
    for (seed, &(w, h)) in SIZES.iter().enumerate() {
        let frame = noise(w, h, seed as u32);
        for &width in WIDTHS {
            let text = frame_to_ascii(&frame, width, &ramp).unwrap();
            let (_, rows) = output_dimensions(w, h, width);
            let expected_rows = (f64::from(h) * f64::from(width) / f64::from(w) / 2.0).round() as usize;
            assert_eq!(rows as usize, expected_rows);
            assert_eq!(text.lines().count(), expected_rows, "{w}x{h} at {width}");
            for line in text.lines() {
                assert_eq!(line.chars().count(), width as usize, "{w}x{h} at {width}");
            }
        }
    }
}

#[test]
fn output_only_uses_ramp_glyphs() {
    let ramp = GlyphRamp::new(" .oO@").unwrap();
    for (seed, &(w, h)) in SIZES.iter().enumerate() {
        let text = frame_to_ascii(&noise(w, h, seed as u32 + 100), 40, &ramp).unwrap();
        assert!(text.chars().filter(|c| *c != '\n').all(|c| ramp.contains(c)));
    }
}

#[test]
fn non_decreasing_samples_give_non_decreasing_glyphs() {
    let ramp = GlyphRamp::default();
    let frame = GrayImage::from_fn(256, 64, |x, _| Luma([x as u8]));
    for filter in [Resample::Nearest, Resample::Triangle] {
        let conv = FrameConverter::new(ramp.clone(), 64).with_filter(filter);
        let text = conv.convert(&frame).unwrap();
        let ramp_str = ramp.as_str();
        for line in text.lines() {
            let indices: Vec<usize> = line.chars().map(|c| ramp_str.find(c).unwrap()).collect();
            assert!(indices.windows(2).all(|w| w[0] <= w[1]), "{filter:?}: {line:?}");
        }
    }
}

#[test]
fn conversion_is_repeatable() {
    let ramp = GlyphRamp::default();
    let frame = noise(123, 77, 9);
    let conv = FrameConverter::new(ramp.clone(), 50);
    assert_eq!(conv.convert(&frame).unwrap(), conv.convert(&frame).unwrap());
    assert_eq!(
        frame_to_ascii(&frame, 50, &ramp).unwrap(),
        frame_to_ascii(&frame, 50, &ramp).unwrap()
    );
}

#[test]
fn black_frame_is_a_block_of_the_first_glyph() {
    let ramp = GlyphRamp::default();
    let text = frame_to_ascii(&solid(20, 20, 0), 10, &ramp).unwrap();
    assert_eq!(text, vec![ramp.first().to_string().repeat(10); 5].join("\n"));
}

#[test]
fn white_frame_is_a_block_of_the_last_glyph() {
    let ramp = GlyphRamp::default();
    let text = frame_to_ascii(&solid(20, 20, 255), 10, &ramp).unwrap();
    assert_eq!(text, vec![ramp.last().to_string().repeat(10); 5].join("\n"));
}

#[test]
fn twenty_by_ten_frame_at_width_ten() {
    // 10 * 10 / 20 / 2 = 2.5 rows, rounded half away from zero
    let ramp = GlyphRamp::default();
    let black = frame_to_ascii(&solid(20, 10, 0), 10, &ramp).unwrap();
    assert_eq!(black, vec![" ".repeat(10); 3].join("\n"));
    let white = frame_to_ascii(&solid(20, 10, 255), 10, &ramp).unwrap();
    assert_eq!(white, vec!["@".repeat(10); 3].join("\n"));
}

#[test]
fn upscaling_small_frames_works() {
    let text = frame_to_ascii(&solid(2, 2, 255), 40, &GlyphRamp::default()).unwrap();
    assert_eq!(text.lines().count(), 20);
    assert!(text.lines().all(|l| l == "@".repeat(40)));
}
