//! 视觉管线性能基准测试
//!
//! 控制循环在 100ms 周期内需要持续消费摄像头帧，这里测量单帧处理耗时：
//! - 各个基础运算
//! - 轮廓提取
//! - 完整管线（含/不含叠加图）

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use lanekeep_vision::{
    Frame, Rgb, RgbImage, VisionConfig, VisionPipeline, encode_jpeg, find_external_contours, ops,
};
use rand::Rng;

/// 深色赛道 + 白色标线 + 少量随机噪点
fn synthetic_frame(width: u32, height: u32) -> Frame {
    let mut rng = rand::thread_rng();
    let lane_x0 = width / 2 - width / 20;
    let lane_x1 = width / 2 + width / 20;
    let img = RgbImage::from_fn(width, height, |x, _| {
        let base: u8 = if x >= lane_x0 && x < lane_x1 { 230 } else { 30 };
        let noise: u8 = if rng.gen_ratio(1, 50) { 200 } else { 0 };
        image_pixel(base.saturating_add(noise))
    });
    Frame::new(img, 0)
}

fn image_pixel(v: u8) -> Rgb<u8> {
    Rgb([v, v, v])
}

fn bench_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("Ops");
    let frame = synthetic_frame(640, 480);
    let gray = ops::to_gray(frame.image());
    let kernel = ops::gaussian_kernel(5, 5.0);
    let blurred = ops::gaussian_blur(&gray, &kernel);
    let mask = ops::threshold(&blurred, 100);
    let morph = ops::rect_kernel(6);

    group.bench_function("to_gray", |b| b.iter(|| black_box(ops::to_gray(frame.image()))));
    group.bench_function("gaussian_blur_5x5", |b| {
        b.iter(|| black_box(ops::gaussian_blur(&gray, &kernel)))
    });
    group.bench_function("threshold", |b| {
        b.iter(|| black_box(ops::threshold(&blurred, 100)))
    });
    group.bench_function("open_6x6", |b| b.iter(|| black_box(ops::open(&mask, &morph))));
    group.bench_function("find_external_contours", |b| {
        b.iter(|| black_box(find_external_contours(&mask)))
    });

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pipeline");

    for (w, h) in [(320, 240), (640, 480)] {
        let frame = synthetic_frame(w, h);
        let pipeline = VisionPipeline::new(VisionConfig::default())
            .unwrap()
            .with_overlay(false);
        group.bench_with_input(
            BenchmarkId::new("process", format!("{w}x{h}")),
            &frame,
            |b, frame| b.iter(|| black_box(pipeline.process(frame))),
        );
    }

    // 含叠加图 + JPEG 编码（调试流路径）
    let frame = synthetic_frame(640, 480);
    let pipeline = VisionPipeline::new(VisionConfig::default()).unwrap();
    group.bench_function("process_with_overlay_jpeg", |b| {
        b.iter(|| {
            let out = pipeline.process(&frame);
            if let Some(overlay) = out.overlay {
                black_box(encode_jpeg(&overlay, 75).unwrap());
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_ops, bench_pipeline);
criterion_main!(benches);
