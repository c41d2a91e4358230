#[cfg(feature = "bench_lots")]
use quadra::model::{RoadStyle, Vec2};
#[cfg(feature = "bench_lots")]
use quadra::{LotOptions, Topology};
#[cfg(feature = "bench_lots")]
use std::time::Instant;

#[cfg(not(feature = "bench_lots"))]
fn main() {
    panic!("lots_bench requires --features bench_lots");
}

#[cfg(feature = "bench_lots")]
fn build_grid(t: &mut Topology, w: usize, h: usize, cell: f64) {
    let mut nodes = Vec::with_capacity((w + 1) * (h + 1));
    for j in 0..=h {
        for i in 0..=w {
            let id = t.add_node(Vec2::new(i as f64 * cell, j as f64 * cell)).expect("node");
            nodes.push(id);
        }
    }
    let ix = |i: usize, j: usize| nodes[j * (w + 1) + i];
    for j in 0..=h {
        for i in 0..w {
            t.add_edge(ix(i, j), ix(i + 1, j), RoadStyle::Asphalt, 12.0).expect("edge");
        }
    }
    for i in 0..=w {
        for j in 0..h {
            t.add_edge(ix(i, j), ix(i, j + 1), RoadStyle::Asphalt, 12.0).expect("edge");
        }
    }
}

#[cfg(feature = "bench_lots")]
fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut w = 8usize;
    let mut h = 8usize;
    let mut repeats = 10usize;
    for a in &args[1..] {
        if let Some(val) = a.strip_prefix("--w=") {
            if let Ok(v) = val.parse() {
                w = v;
            }
        } else if let Some(val) = a.strip_prefix("--h=") {
            if let Ok(v) = val.parse() {
                h = v;
            }
        } else if let Some(val) = a.strip_prefix("--repeats=") {
            if let Ok(v) = val.parse() {
                repeats = v;
            }
        }
    }

    let mut t = Topology::new();
    let t0 = Instant::now();
    build_grid(&mut t, w, h, 200.0);
    let build_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let blocks: Vec<u32> = t.blocks().map(|b| b.id).collect();
    let opts = LotOptions::dimensions(12.0, 30.0, 2, 2.0);
    let t1 = Instant::now();
    let mut lots = 0usize;
    for _ in 0..repeats {
        for b in &blocks {
            lots += t.generate_lots(*b, &opts).expect("generate").len();
        }
    }
    let gen_ms = t1.elapsed().as_secs_f64() * 1000.0;
    println!(
        "grid {}x{}: {} blocks, build {:.2} ms, generate x{} {:.2} ms ({} lots)",
        w,
        h,
        blocks.len(),
        build_ms,
        repeats,
        gen_ms,
        lots
    );
}
