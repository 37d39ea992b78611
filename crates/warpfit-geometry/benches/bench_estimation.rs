use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use warpfit_geometry::{homography_ndlt, pransac_homography, PransacParams};
use warpfit_tensor::Matrix;

const H_TRUE: [[f32; 3]; 3] = [[1.1, 0.05, 3.0], [-0.08, 0.95, -2.0], [0.0005, -0.0002, 1.0]];

/// Generate `n` correspondences on a grid, one in five replaced by an outlier.
fn generate_homography_data(n: usize) -> (Matrix, Matrix) {
    let side = (n as f32).sqrt().ceil() as usize;
    let mut src = Vec::with_capacity(n);
    let mut dest = Vec::with_capacity(n);
    for i in 0..n {
        let u = (i % side) as f32 * 640.0 / side as f32;
        let v = (i / side) as f32 * 480.0 / side as f32;
        let z = H_TRUE[2][0] * u + H_TRUE[2][1] * v + H_TRUE[2][2];
        let x = (H_TRUE[0][0] * u + H_TRUE[0][1] * v + H_TRUE[0][2]) / z;
        let y = (H_TRUE[1][0] * u + H_TRUE[1][1] * v + H_TRUE[1][2]) / z;
        src.push([u, v]);
        if i % 5 == 4 {
            dest.push([x + 60.0 + (i % 7) as f32 * 10.0, y - 55.0]);
        } else {
            dest.push([x, y]);
        }
    }
    (Matrix::from_points(&src), Matrix::from_points(&dest))
}

fn bench_homography_ndlt(c: &mut Criterion) {
    let mut group = c.benchmark_group("homography_ndlt");
    for &n in &[8, 64, 256] {
        let (src, dest) = generate_homography_data(n);
        let mut h = Matrix::zeros(3, 3);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let _ = std::hint::black_box(homography_ndlt(&mut h, &src, &dest));
            });
        });
    }
    group.finish();
}

fn bench_pransac_homography(c: &mut Criterion) {
    let mut group = c.benchmark_group("pransac_homography");
    let params = PransacParams {
        random_seed: Some(0),
        ..Default::default()
    };
    for &n in &[64, 256, 1024] {
        let (src, dest) = generate_homography_data(n);
        let mut h = Matrix::zeros(3, 3);
        let mut mask = Matrix::zeros(1, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let _ = std::hint::black_box(pransac_homography(
                    &mut h,
                    Some(mask.view_mut()),
                    &src,
                    &dest,
                    &params,
                ));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_homography_ndlt, bench_pransac_homography);
criterion_main!(benches);
