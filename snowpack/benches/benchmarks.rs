use chrono::{Duration, NaiveDate};
use criterion::{criterion_group, criterion_main, Criterion};
use geo::geometry::Coord;
use snowpack::{
    daily::assemble,
    modis::{Footprint, GranuleName, Raster, SnowBands, SnowGranule},
    persistence::{snow_persistence, Basis},
    GranuleMap,
};

const SIDE: usize = 240;

fn synthetic_source(start: NaiveDate, days: i64) -> GranuleMap<SnowGranule> {
    let tile = Coord { x: -72, y: 44 };
    let footprint = Footprint::tile(tile, SIDE);
    let mut source = GranuleMap::new(footprint);
    // Every third day is a gap.
    for n in (0..days).filter(|n| n % 3 != 0) {
        let date = start + Duration::days(n);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bands = SnowBands {
            snow_cover: Raster::from_fn((SIDE, SIDE), |i| Some(((i as i64 + n) % 101) as u8)),
            quality: Raster::from_fn((SIDE, SIDE), |i| Some(((i as i64 * n) % 3) as u8)),
            class: Raster::constant((SIDE, SIDE), 0),
        };
        source
            .insert(SnowGranule {
                name: GranuleName {
                    date,
                    tile,
                    pass: 0,
                },
                footprint,
                bands,
            })
            .unwrap();
    }
    source
}

fn daily_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("Daily Snow");
    group.sample_size(10);

    let start = NaiveDate::from_ymd_opt(2018, 10, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2019, 10, 1).unwrap();
    let source = synthetic_source(start, (end - start).num_days());

    group.bench_function("assemble year", |b| {
        b.iter(|| assemble(&source, start, end).unwrap())
    });

    let days = assemble(&source, start, end).unwrap();
    group.bench_function("persistence year", |b| {
        b.iter(|| snow_persistence(&days, Basis::ValidDays).unwrap())
    });
}

criterion_group!(benches, daily_assembly);
criterion_main!(benches);
