use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, Rgba, RgbaImage};
use vantage_render::convert::{to_frame_buffer, Bitmap, RawBitmap, SourceFormat};
use vantage_render::{ImagePyramid, RenderTarget};

fn raw_hd(format: SourceFormat) -> RawBitmap {
    let (width, height) = (1920u32, 1080u32);
    let bpp = format.bytes_per_pixel();
    // Pad rows to a 64-byte boundary, like most platform surfaces do.
    let stride = (width as usize * bpp + 63) / 64 * 64;
    RawBitmap {
        width,
        height,
        stride,
        format,
        data: vec![0x7f; stride * height as usize],
    }
}

fn bench_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_1080p");
    for format in [
        SourceFormat::Rgba8,
        SourceFormat::Bgra8,
        SourceFormat::PremultipliedBgra8,
        SourceFormat::Rgb8,
    ] {
        let raw = raw_hd(format);
        group.bench_function(format!("{:?}", format), |b| {
            b.iter(|| to_frame_buffer(black_box(Bitmap::Raw(raw.clone()))).unwrap())
        });
    }
    group.finish();
}

fn bench_pyramid_production(c: &mut Criterion) {
    let base = DynamicImage::ImageRgba8(RgbaImage::from_fn(1920, 1080, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
    }));
    let mut target = RenderTarget::multi_resolution(ImagePyramid::from_image("bench", base, 6));

    c.bench_function("pyramid_produce_level_2", |b| {
        b.iter(|| target.produce(black_box(2)).unwrap())
    });
}

criterion_group!(benches, bench_conversion, bench_pyramid_production);
criterion_main!(benches);
