use image::RgbImage;
use nadeshiko::{
    decode::{decode_to_canvases, FrameReader},
    delta::Delta,
    Cell, CellImage, Command, EncodeOptions, Encoder,
};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;

/// A gradient with a bright ball bouncing across it.
fn scene(t: u32) -> RgbImage {
    let (cx, cy) = ((t * 7) % WIDTH, 10 + (t * 3) % (HEIGHT - 20));
    RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let (dx, dy) = (x.abs_diff(cx), y.abs_diff(cy));
        if dx * dx + dy * dy < 64 {
            image::Rgb([250, 220, 40])
        } else {
            image::Rgb([(x * 4) as u8, (y * 5) as u8, 90])
        }
    })
}

fn pixels(image: &RgbImage) -> Vec<[u8; 3]> {
    image.pixels().map(|p| p.0).collect()
}

fn roundtrip(options: EncodeOptions, frames: usize) {
    let budget = options.budget;
    let mut encoder = Encoder::new(options);
    let mut canvases = Vec::new();

    for t in 0..frames {
        let frame = scene(t as u32);
        let stats = encoder
            .encode_frame(WIDTH as usize, HEIGHT as usize, &pixels(&frame))
            .unwrap();
        if t > 0 {
            assert!(stats.cost <= budget, "frame {t} over budget: {stats:?}");
        }
        canvases.push(encoder.canvas().unwrap().clone());
    }

    let mut encoded = Vec::new();
    encoder.serialize_to_vec(&mut encoded);
    assert_eq!(encoded[..3], [1, WIDTH as u8 / 2, HEIGHT as u8 / 4]);

    let (header, decoded) = decode_to_canvases(&encoded).unwrap();
    assert_eq!((header.width, header.height), (32, 12));
    assert_eq!(decoded.len(), frames);
    for (t, (decoded, expected)) in decoded.iter().zip(&canvases).enumerate() {
        assert_eq!(decoded, expected, "canvas mismatch in frame {t}");
    }

    let reader = FrameReader::new(&encoded).unwrap();
    for (t, frame) in reader.enumerate() {
        assert_eq!(
            frame.unwrap(),
            encoder.frame_commands(t).unwrap(),
            "command mismatch in frame {t}"
        );
    }
}

#[test]
fn bouncing_ball() {
    roundtrip(EncodeOptions::default(), 6);
}

#[test]
fn bouncing_ball_tight_budget() {
    roundtrip(
        EncodeOptions {
            budget: 40,
            dither: nadeshiko::DitherMatrix::none(),
        },
        6,
    );
}

#[test]
fn static_single_cell() {
    let image = CellImage::from_cells(1, 1, &[Cell::new(200, 17, 0b1010_0101)]).unwrap();
    let mut encoder = Encoder::new(EncodeOptions::default());
    encoder.encode_cells(image.clone()).unwrap();
    encoder.encode_cells(image.clone()).unwrap();

    let mut encoded = Vec::new();
    encoder.serialize_to_vec(&mut encoded);
    assert_eq!(encoded[..3], [1, 1, 1]);
    assert!(encoded.ends_with(&[0x01, 0x01]));

    let frames = FrameReader::new(&encoded)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1], [Command::EndFrame]);

    let (_, canvases) = decode_to_canvases(&encoded).unwrap();
    assert!(canvases[1].get(0, 0).matches(image.get(0, 0)));
}

#[test]
fn converges_on_a_still_image() {
    let mut encoder = Encoder::new(EncodeOptions::default());
    let target = encoder
        .quantize(WIDTH as usize, HEIGHT as usize, &pixels(&scene(3)))
        .unwrap();

    let blank = CellImage::new(32, 12);
    let initial = Delta::new(&blank, &target, encoder.metric()).total();
    encoder.encode_cells(blank).unwrap();

    let mut residual = initial;
    for _ in 0..8 {
        residual = encoder.encode_cells(target.clone()).unwrap().residual;
    }
    assert!(residual < initial, "{residual} >= {initial}");
}
